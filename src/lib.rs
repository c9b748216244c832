//! # Forum Chat Library
//!
//! Real-time global chat room for the forum:
//! - WebSocket endpoint that fans each message out to every connected client
//! - HTTP endpoint for paging through chat history
//! - SQLite persistence with periodic retention trimming
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Chat message entity and the message store trait
//! - **Application Layer**: Auth and history services, DTOs
//! - **Infrastructure Layer**: SQLite repository and Prometheus metrics
//! - **Presentation Layer**: HTTP handlers, middleware, and the chat hub
//!
//! ## Module Structure
//!
//! ```text
//! forum_chat/
//! +-- config/         Configuration management
//! +-- domain/         Entities and repository traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, repositories, metrics
//! +-- presentation/   HTTP routes and WebSocket chat
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
