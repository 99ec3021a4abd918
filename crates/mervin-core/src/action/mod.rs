//! Actions, slash commands and intent detection.
//!
//! Actions are the canned backend tasks (estimates, contracts, permits, ...)
//! that the chat can start either from a typed slash command, an accepted
//! smart suggestion, or the floating action button.

pub mod builtin;
pub mod intent;
pub mod model;

pub use builtin::{
    BuiltinSlashCommand, builtin_commands, find_builtin_command, parse_builtin_command,
};
pub use intent::{
    DEFAULT_INTENT_THRESHOLD, IntentDetector, IntentRule, IntentSuggestion, default_intent_rules,
};
pub use model::{DispatchSource, MervinAction};
