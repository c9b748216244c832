//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: JWT verification and issuance
//! - **ChatService**: Chat history queries and retention

pub mod auth_service;
pub mod chat_service;

// Re-export auth service types
pub use auth_service::{AuthError, AuthService, AuthTokens, Claims, JwtAuthService};

// Re-export chat service types
pub use chat_service::{
    run_retention_sweep, ChatError, ChatService, ChatServiceImpl, HistoryQueryDto,
};
