//! Chat mode types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode of a chat session.
///
/// The mode is sent with every backend request and decides how the backend
/// routes the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Capability-gated mode with canned/simple responses.
    #[default]
    Legacy,
    /// Full backend capability (task prompts, attachments).
    Agent,
}

/// What a mode is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCapabilities {
    pub attachments: bool,
    pub agent_actions: bool,
}

impl ChatMode {
    pub fn capabilities(self) -> ModeCapabilities {
        match self {
            ChatMode::Legacy => ModeCapabilities {
                attachments: false,
                agent_actions: false,
            },
            ChatMode::Agent => ModeCapabilities {
                attachments: true,
                agent_actions: true,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Legacy => "legacy",
            ChatMode::Agent => "agent",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "chat" => Ok(ChatMode::Legacy),
            "agent" => Ok(ChatMode::Agent),
            other => Err(format!("unknown chat mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_chat_alias() {
        assert_eq!("chat".parse::<ChatMode>().unwrap(), ChatMode::Legacy);
        assert_eq!(" Agent ".parse::<ChatMode>().unwrap(), ChatMode::Agent);
        assert!("turbo".parse::<ChatMode>().is_err());
    }

    #[test]
    fn test_legacy_is_gated() {
        let caps = ChatMode::Legacy.capabilities();
        assert!(!caps.attachments);
        assert!(!caps.agent_actions);
        assert!(ChatMode::Agent.capabilities().agent_actions);
    }
}
