//! Chat History Handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::{ChatMessageResponse, HistoryQuery};
use crate::application::services::ChatError;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Get a page of chat history, most recent first
///
/// Missing, non-positive or non-numeric `limit` uses the default page size.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessageResponse>>, AppError> {
    let messages = state
        .chat
        .get_messages(query.into())
        .await
        .map_err(|e| match e {
            ChatError::Internal(msg) => AppError::Internal(msg),
        })?;

    Ok(Json(messages.into_iter().map(ChatMessageResponse::from).collect()))
}
