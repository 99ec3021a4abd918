//! Turn types.
//!
//! A turn is one user or assistant message in a session.

use crate::stream::TaskState;
use serde::{Deserialize, Serialize};

/// Represents the role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Message from the user.
    User,
    /// Message from Mervin.
    Assistant,
}

/// Whether the producing stream of a turn is still attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// The backend stream may still rewrite this turn.
    Open,
    #[default]
    Closed,
}

/// A single message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier (UUID format)
    pub id: String,
    /// The role of the message sender.
    pub role: TurnRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp when the turn was created (RFC 3339).
    pub timestamp: String,
    /// Last classified task state, assistant turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default)]
    pub is_error: bool,
    /// Short reference id shown to the user on error turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
    /// Live-session only; persisted turns are always closed.
    #[serde(skip)]
    pub status: TurnStatus,
}

impl Turn {
    /// Creates a closed user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content.into(), None, TurnStatus::Closed)
    }

    /// Creates an open assistant placeholder in the `analyzing` state.
    pub fn assistant_placeholder() -> Self {
        Self::new(
            TurnRole::Assistant,
            String::new(),
            Some(TaskState::Analyzing),
            TurnStatus::Open,
        )
    }

    fn new(role: TurnRole, content: String, state: Option<TaskState>, status: TurnStatus) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: chrono::Utc::now().to_rfc3339(),
            state,
            is_error: false,
            error_id: None,
            can_retry: false,
            status,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TurnStatus::Open
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }
}
