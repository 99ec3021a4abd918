//! Path management for Mervin configuration and conversation files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/mervin/              # Config directory
//! ├── config.toml                # Session configuration
//! └── conversations/             # One directory per user
//!     └── <user_id>/
//!         └── <conversation_id>.toml
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "mervin";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find the platform configuration directory")]
    ConfigDirNotFound,
}

pub struct MervinPaths;

impl MervinPaths {
    /// Returns the Mervin configuration directory (e.g. `~/.config/mervin/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the base directory conversation repositories write under.
    pub fn conversations_base() -> Result<PathBuf, PathError> {
        Self::config_dir()
    }
}

/// Whether `id` can be used verbatim as a single path component.
///
/// Ids come from the UI, so anything outside `[A-Za-z0-9_-]` is refused
/// rather than escaped.
pub fn is_safe_component(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
