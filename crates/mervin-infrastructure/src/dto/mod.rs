//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned schema for persisting data.
//! They are private to the infrastructure layer and handle the evolution
//! of the storage format over time.
//!
//! ## Schema Versioning (Semantic Versioning)
//!
//! - **MAJOR (X.0.0)**: Breaking changes (field removal, type changes)
//! - **MINOR (1.X.0)**: Backward-compatible additions (new optional fields)
//!
//! ### Conversation Version History
//! - **1.0.0**: Initial schema (title, category, pin flag, turns with error ids)

#![allow(non_camel_case_types)]

mod conversation;

pub use conversation::{CONVERSATION_SCHEMA_VERSION, ConversationV1_0_0, TurnV1_0_0};
