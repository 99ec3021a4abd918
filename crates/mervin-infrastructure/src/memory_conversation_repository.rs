//! In-memory ConversationRepository for tests and ephemeral sessions.

use async_trait::async_trait;
use mervin_core::Result;
use mervin_core::conversation::{
    Conversation, ConversationListItem, ConversationRepository, ListFilter,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryConversationRepository {
    conversations: RwLock<HashMap<(String, String), Conversation>>,
}

impl MemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository, replacing any record with the same key.
    pub async fn insert(&self, conversation: Conversation) {
        let key = (
            conversation.user_id.clone(),
            conversation.conversation_id.clone(),
        );
        self.conversations.write().await.insert(key, conversation);
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepository {
    async fn find_by_id(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(&(user_id.to_string(), conversation_id.to_string()))
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.insert(conversation.clone()).await;
        Ok(())
    }

    async fn delete(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        self.conversations
            .write()
            .await
            .remove(&(user_id.to_string(), conversation_id.to_string()));
        Ok(())
    }

    async fn list(&self, user_id: &str, filter: &ListFilter) -> Result<Vec<ConversationListItem>> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .map(Conversation::to_list_item)
            .filter(|item| filter.matches(item))
            .collect())
    }
}
