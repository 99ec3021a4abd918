//! Conversation DTOs (anti-corruption layer between storage and domain).

use mervin_core::conversation::{Conversation, Turn, TurnRole, TurnStatus};
use mervin_core::stream::TaskState;
use mervin_core::{MervinError, Result};
use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const CONVERSATION_SCHEMA_VERSION: &str = "1.0.0";

/// V1.0.0 turn record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnV1_0_0 {
    pub id: String,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
}

/// V1.0.0 conversation file.
///
/// `messages` is last so the TOML output keeps the scalar header fields at
/// the top of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationV1_0_0 {
    pub schema_version: String,
    pub conversation_id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub ai_model: String,
    pub created_at: String,
    pub last_activity_at: String,
    #[serde(default)]
    pub messages: Vec<TurnV1_0_0>,
}

impl From<Turn> for TurnV1_0_0 {
    fn from(turn: Turn) -> Self {
        Self {
            id: turn.id,
            role: turn.role,
            content: turn.content,
            timestamp: turn.timestamp,
            state: turn.state,
            is_error: turn.is_error,
            error_id: turn.error_id,
            can_retry: turn.can_retry,
        }
    }
}

impl From<TurnV1_0_0> for Turn {
    fn from(dto: TurnV1_0_0) -> Self {
        Turn {
            id: dto.id,
            role: dto.role,
            content: dto.content,
            timestamp: dto.timestamp,
            state: dto.state,
            is_error: dto.is_error,
            error_id: dto.error_id,
            can_retry: dto.can_retry,
            status: TurnStatus::Closed,
        }
    }
}

impl From<Conversation> for ConversationV1_0_0 {
    fn from(conversation: Conversation) -> Self {
        let Conversation {
            conversation_id,
            user_id,
            title,
            category,
            messages,
            is_pinned,
            ai_model,
            created_at,
            last_activity_at,
        } = conversation;

        Self {
            schema_version: CONVERSATION_SCHEMA_VERSION.to_string(),
            conversation_id,
            user_id,
            title,
            category,
            is_pinned,
            ai_model,
            created_at,
            last_activity_at,
            messages: messages.into_iter().map(TurnV1_0_0::from).collect(),
        }
    }
}

impl ConversationV1_0_0 {
    /// Converts to the domain model, rejecting files from a newer major schema.
    pub fn into_domain(self) -> Result<Conversation> {
        let major = self.schema_version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(MervinError::Serialization {
                format: "TOML".to_string(),
                message: format!(
                    "unsupported conversation schema {} in {}",
                    self.schema_version, self.conversation_id
                ),
            });
        }

        Ok(Conversation {
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            title: self.title,
            category: self.category,
            messages: self.messages.into_iter().map(Turn::from).collect(),
            is_pinned: self.is_pinned,
            ai_model: self.ai_model,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        })
    }
}
