//! API endpoint tests

mod chat_tests;
mod health_tests;
