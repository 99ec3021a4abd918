//! Stream update and task state types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of incremental event emitted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamUpdateType {
    /// Human-readable progress text ("Buscando materiales...").
    Progress,
    /// Cumulative assistant text so far.
    Message,
    /// Terminal success event carrying the final text.
    Complete,
    /// Terminal failure event carrying the backend message.
    Error,
}

/// One incremental event from the backend during an assistant response.
///
/// Transient: only the terminal assistant turn derived from a completed
/// stream is ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamUpdate {
    #[serde(rename = "type")]
    pub update_type: StreamUpdateType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StreamUpdate {
    pub fn progress(content: impl Into<String>) -> Self {
        Self::new(StreamUpdateType::Progress, content)
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::new(StreamUpdateType::Message, content)
    }

    pub fn complete(content: impl Into<String>) -> Self {
        Self::new(StreamUpdateType::Complete, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(StreamUpdateType::Error, content)
    }

    fn new(update_type: StreamUpdateType, content: impl Into<String>) -> Self {
        Self {
            update_type,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.update_type,
            StreamUpdateType::Complete | StreamUpdateType::Error
        )
    }

    /// Looks up a string field in the metadata object.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// Coarse UI-facing classification of what the backend is doing.
///
/// Purely presentational; never drives control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Searching,
    Analyzing,
    Generating,
    Verifying,
    Complete,
    Error,
}

impl TaskState {
    pub const ALL: [TaskState; 6] = [
        TaskState::Searching,
        TaskState::Analyzing,
        TaskState::Generating,
        TaskState::Verifying,
        TaskState::Complete,
        TaskState::Error,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Complete | TaskState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Searching => "searching",
            TaskState::Analyzing => "analyzing",
            TaskState::Generating => "generating",
            TaskState::Verifying => "verifying",
            TaskState::Complete => "complete",
            TaskState::Error => "error",
        }
    }

    /// Parses a metadata tag, tolerating case and surrounding whitespace.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == tag)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let update: StreamUpdate = serde_json::from_value(json!({
            "type": "progress",
            "content": "Buscando precios",
            "metadata": {"phase": "searching"}
        }))
        .unwrap();

        assert_eq!(update.update_type, StreamUpdateType::Progress);
        assert_eq!(update.metadata_str("phase"), Some("searching"));
        assert!(!update.is_terminal());
    }

    #[test]
    fn test_task_state_from_tag() {
        assert_eq!(TaskState::from_tag(" Verifying "), Some(TaskState::Verifying));
        assert_eq!(TaskState::from_tag("thinking"), None);
    }
}
