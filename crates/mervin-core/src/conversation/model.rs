//! Conversation domain model.
//!
//! A conversation is the persisted record a live session is saved to and
//! hydrated from.

use super::turn::{Turn, TurnRole};
use crate::mode::ChatMode;
use serde::{Deserialize, Serialize};

/// Category assigned to conversations that were not started by an action.
pub const DEFAULT_CATEGORY: &str = "general";

/// Title used until the conversation has a user turn.
pub const UNTITLED_CONVERSATION: &str = "New conversation";

const TITLE_MAX_CHARS: usize = 60;

/// Represents a persisted conversation.
///
/// This is the "pure" domain model; the storage format lives in the
/// infrastructure crate's DTOs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub conversation_id: String,
    /// Owner of the conversation
    pub user_id: String,
    /// Human-readable title
    pub title: String,
    /// Category used for list filtering ("general", "estimate", ...)
    pub category: String,
    /// Persisted turns, oldest first
    pub messages: Vec<Turn>,
    #[serde(default)]
    pub is_pinned: bool,
    /// Mode label the conversation was last saved under
    pub ai_model: String,
    /// Timestamp when the conversation was created (RFC 3339)
    pub created_at: String,
    /// Timestamp of the last saved turn (RFC 3339)
    pub last_activity_at: String,
}

impl Conversation {
    /// Summary row for conversation lists.
    pub fn to_list_item(&self) -> ConversationListItem {
        ConversationListItem {
            conversation_id: self.conversation_id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            is_pinned: self.is_pinned,
            ai_model: self.ai_model.clone(),
            last_activity_at: self.last_activity_at.clone(),
            message_count: self.messages.len(),
        }
    }
}

/// Row shown in the conversation history panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationListItem {
    pub conversation_id: String,
    pub title: String,
    pub category: String,
    pub is_pinned: bool,
    pub ai_model: String,
    pub last_activity_at: String,
    pub message_count: usize,
}

/// Filter applied when listing conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub category: Option<String>,
    #[serde(default)]
    pub pinned_only: bool,
}

impl ListFilter {
    pub fn matches(&self, item: &ConversationListItem) -> bool {
        if self.pinned_only && !item.is_pinned {
            return false;
        }
        match &self.category {
            Some(category) => item.category == *category,
            None => true,
        }
    }
}

/// Derives a conversation title from the first user turn.
pub fn derive_title(turns: &[Turn]) -> String {
    let Some(first) = turns.iter().find(|t| t.role == TurnRole::User) else {
        return UNTITLED_CONVERSATION.to_string();
    };

    let trimmed = first.content.trim();
    if trimmed.is_empty() {
        return UNTITLED_CONVERSATION.to_string();
    }

    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", head.trim_end())
    }
}

/// Mode label stored in `Conversation::ai_model`.
pub fn ai_model_label(mode: ChatMode) -> String {
    format!("mervin-{}", mode)
}
