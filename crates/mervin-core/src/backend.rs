//! Collaborator interfaces: the streaming agent backend and entitlements.

use crate::error::Result;
use crate::mode::ChatMode;
use crate::stream::StreamUpdate;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A file the user attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Location the backend can fetch the file from
    pub url: String,
}

/// Input of one backend chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub mode: ChatMode,
    pub language: String,
    pub conversation_id: Option<String>,
    /// Screen the user was on when sending, e.g. "materials"
    pub page_context: Option<String>,
}

/// The agent backend, treated as a black-box streaming service.
///
/// The returned stream yields updates in order and ends with exactly one
/// `complete` or `error` update. `Err` from this method means the call
/// could not be started at all.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_chat(&self, request: ChatRequest)
    -> Result<BoxStream<'static, StreamUpdate>>;
}

/// Decides whether a user may use agent mode.
#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn has_agent_access(&self, user_id: &str) -> Result<bool>;
}

/// Entitlement service that grants agent mode to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllEntitlements;

#[async_trait]
impl EntitlementService for AllowAllEntitlements {
    async fn has_agent_access(&self, _user_id: &str) -> Result<bool> {
        Ok(true)
    }
}
