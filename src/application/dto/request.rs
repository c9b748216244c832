//! Request DTOs
//!
//! Query strings accepted by the chat endpoints.

use serde::{Deserialize, Deserializer};

use crate::application::services::HistoryQueryDto;

/// `GET /api/v1/chat/messages` query
///
/// Values that are not integers are treated as absent, so `?limit=abc`
/// falls back to the default page instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub offset: Option<i64>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl From<HistoryQuery> for HistoryQueryDto {
    fn from(query: HistoryQuery) -> Self {
        Self {
            limit: query.limit,
            offset: query.offset,
        }
    }
}

/// `GET /api/v1/chat/ws` query
///
/// Browsers cannot set headers on a WebSocket handshake, so the access
/// token may travel in the query string instead.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}
