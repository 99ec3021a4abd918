//! Action domain models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A backend task Mervin can be asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MervinAction {
    Estimate,
    Contract,
    Permit,
    Property,
    Materials,
    Projects,
    Help,
}

/// Where a dispatch request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchSource {
    /// Typed slash command.
    Slash,
    /// Accepted smart suggestion.
    Smart,
    /// Floating action button.
    Fab,
}

impl MervinAction {
    pub const ALL: [MervinAction; 7] = [
        MervinAction::Estimate,
        MervinAction::Contract,
        MervinAction::Permit,
        MervinAction::Property,
        MervinAction::Materials,
        MervinAction::Projects,
        MervinAction::Help,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MervinAction::Estimate => "estimate",
            MervinAction::Contract => "contract",
            MervinAction::Permit => "permit",
            MervinAction::Property => "property",
            MervinAction::Materials => "materials",
            MervinAction::Projects => "projects",
            MervinAction::Help => "help",
        }
    }

    /// Canned task prompt sent to the backend instead of the raw command.
    pub fn task_prompt(self) -> &'static str {
        match self {
            MervinAction::Estimate => {
                "I want to create a new estimate. Guide me step by step: client details, \
                 project type, dimensions, materials and labor."
            }
            MervinAction::Contract => {
                "I need to generate a contract for a project. Ask me for the client, scope \
                 of work, payment schedule and timeline."
            }
            MervinAction::Permit => {
                "Help me find out which permits I need for a job. Ask me for the property \
                 address and the type of work."
            }
            MervinAction::Property => {
                "I want to verify the ownership of a property. Ask me for the address."
            }
            MervinAction::Materials => {
                "Show me a summary of my materials inventory and anything running low."
            }
            MervinAction::Projects => "Summarize my active projects and their current status.",
            MervinAction::Help => "What can you help me with? List the tasks you can do for me.",
        }
    }

    /// Task prompt with whatever the user typed after the command appended.
    pub fn task_prompt_with(self, details: Option<&str>) -> String {
        match details.map(str::trim).filter(|d| !d.is_empty()) {
            Some(details) => format!("{}\n\nDetails: {}", self.task_prompt(), details),
            None => self.task_prompt().to_string(),
        }
    }

    /// Whether the action needs the agent backend.
    pub fn requires_agent(self) -> bool {
        !matches!(self, MervinAction::Help)
    }

    /// Category recorded on conversations this action starts.
    pub fn category(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for MervinAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MervinAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| format!("unknown action '{}'", s))
    }
}
