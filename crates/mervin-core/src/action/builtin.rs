//! Builtin slash commands.
//!
//! These commands are always available and cannot be modified by users.
//! They are built once on first access and cached for the lifetime of the
//! process.

use super::model::MervinAction;
use serde::Serialize;
use std::sync::OnceLock;

/// A builtin slash command provided by the system.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinSlashCommand {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Usage format (e.g., "/estimate")
    pub usage: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Action the command dispatches
    pub action: MervinAction,
}

impl BuiltinSlashCommand {
    pub const fn new(
        name: &'static str,
        usage: &'static str,
        description: &'static str,
        action: MervinAction,
    ) -> Self {
        Self {
            name,
            usage,
            description,
            action,
        }
    }
}

static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinSlashCommand>> = OnceLock::new();

/// Returns all builtin slash commands.
pub fn builtin_commands() -> &'static [BuiltinSlashCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinSlashCommand::new(
                "estimate",
                "/estimate",
                "Start a new project estimate",
                MervinAction::Estimate,
            ),
            BuiltinSlashCommand::new(
                "contract",
                "/contract",
                "Draft a contract for a client project",
                MervinAction::Contract,
            ),
            BuiltinSlashCommand::new(
                "permit",
                "/permit",
                "Check permit requirements for a job site",
                MervinAction::Permit,
            ),
            BuiltinSlashCommand::new(
                "property",
                "/property",
                "Verify property ownership details",
                MervinAction::Property,
            ),
            BuiltinSlashCommand::new(
                "materials",
                "/materials",
                "Review the materials inventory",
                MervinAction::Materials,
            ),
            BuiltinSlashCommand::new(
                "projects",
                "/projects",
                "Summarize active projects",
                MervinAction::Projects,
            ),
            BuiltinSlashCommand::new(
                "help",
                "/help",
                "Show what Mervin can do",
                MervinAction::Help,
            ),
        ]
    })
}

/// Looks up a builtin command by its name (with or without the leading `/`).
///
/// Only the first whitespace-separated token names the command and matching
/// is case-insensitive, so `/Estimate please` resolves to `/estimate`.
pub fn find_builtin_command(raw: &str) -> Option<&'static BuiltinSlashCommand> {
    parse_builtin_command(raw).map(|(command, _)| command)
}

/// Splits `raw` into a builtin command and its trailing arguments.
///
/// The arguments are trimmed; an empty string means none were given.
pub fn parse_builtin_command(raw: &str) -> Option<(&'static BuiltinSlashCommand, &str)> {
    let raw = raw.trim();
    let (token, args) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
    let name = token.strip_prefix('/').unwrap_or(token).to_lowercase();
    let command = builtin_commands().iter().find(|cmd| cmd.name == name)?;
    Some((command, args.trim()))
}
