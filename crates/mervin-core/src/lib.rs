//! Domain layer of the Mervin session core.
//!
//! This crate holds the types the rest of the workspace agrees on: turns and
//! conversations, backend stream updates and their classification, chat
//! modes, actions, configuration and the error taxonomy. It also declares the
//! collaborator traits (conversation storage, streaming backend,
//! entitlements) that the infrastructure and application crates implement
//! and consume.

pub mod action;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mode;
pub mod stream;

pub use config::SessionConfig;
pub use error::{ErrorKind, MervinError, Result};
pub use mode::ChatMode;
