//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{ConnectQuery, HistoryQuery};
pub use response::ChatMessageResponse;
