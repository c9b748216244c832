//! Authentication Middleware
//!
//! Access token validation for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::application::services::AuthError;
use crate::presentation::http::extractors::AccessToken;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Authentication middleware that validates access tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    AccessToken(token): AccessToken,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?;

    let user_id = state.auth.validate_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        match e {
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            _ => AppError::Unauthorized("Invalid token".into()),
        }
    })?;

    // Insert authenticated user into request extensions
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}
