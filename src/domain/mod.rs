//! # Domain Layer
//!
//! The domain layer contains the chat entities and the persistence contract.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts

pub mod entities;

// Re-export commonly used types
pub use entities::*;
