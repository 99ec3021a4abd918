//! Conversation repository trait.
//!
//! Defines the interface for conversation persistence operations.

use super::model::{Conversation, ConversationListItem, ListFilter};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for conversation persistence.
///
/// Records are keyed by `(user_id, conversation_id)`. Implementations decide
/// the storage mechanism (TOML files, database, remote API); the history
/// bridge is the only caller that writes through this trait.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Finds a conversation by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Conversation))`: Conversation found
    /// - `Ok(None)`: Conversation not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, user_id: &str, conversation_id: &str)
    -> Result<Option<Conversation>>;

    /// Inserts or replaces a conversation.
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Deletes a conversation (succeeds if it didn't exist).
    async fn delete(&self, user_id: &str, conversation_id: &str) -> Result<()>;

    /// Lists the user's conversations matching `filter`.
    ///
    /// Ordering is left to the caller.
    async fn list(&self, user_id: &str, filter: &ListFilter) -> Result<Vec<ConversationListItem>>;
}
