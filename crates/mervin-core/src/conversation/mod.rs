//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `turn`: Session message types (`Turn`, `TurnRole`, `TurnStatus`)
//! - `model`: Persisted conversation record and list rows
//! - `repository`: Repository trait for conversation persistence

mod model;
mod repository;
mod turn;

pub use model::{
    Conversation, ConversationListItem, DEFAULT_CATEGORY, ListFilter, UNTITLED_CONVERSATION,
    ai_model_label, derive_title,
};
pub use repository::ConversationRepository;
pub use turn::{Turn, TurnRole, TurnStatus};
