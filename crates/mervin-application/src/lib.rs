//! Application layer for Mervin.
//!
//! This crate provides the chat session use case that coordinates the
//! domain types with the backend, the conversation repository and the
//! entitlement service.

pub mod bootstrap;
pub mod chat_usecase;
pub mod logging;
pub mod session;

pub use chat_usecase::{ChatSessionUseCase, SendOutcome, SessionView, TurnOutcome};
pub use logging::init_tracing;
