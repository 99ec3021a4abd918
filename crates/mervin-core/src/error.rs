//! Error types for the Mervin session core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire session core.
///
/// The first group of variants is the user-facing taxonomy: what the UI shows,
/// whether a retry is offered, and what is silently dropped. The remaining
/// variants are ambient plumbing errors with `From` conversions.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MervinError {
    /// Network or stream delivery failure (includes idle timeouts).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The agent emitted an `error` event.
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Stale-generation update or an update addressed to a closed turn.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Another dispatch is still in flight.
    #[error("Busy: {0}")]
    Busy(String),

    /// Conversation save or load failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The caller is not entitled to the requested capability.
    #[error("Entitlement error: {0}")]
    Entitlement(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by the error/retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Backend,
    Conflict,
    Busy,
    Persistence,
    Entitlement,
    Other,
}

impl MervinError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Classification
    // ============================================================================

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Persistence(_) | Self::Io { .. } | Self::Serialization { .. } => {
                ErrorKind::Persistence
            }
            Self::Entitlement(_) => ErrorKind::Entitlement,
            Self::NotFound { .. } | Self::Config(_) | Self::Internal(_) => ErrorKind::Other,
        }
    }

    /// Whether the UI should offer a retry for this error.
    ///
    /// Only delivery failures are retryable. Entitlement errors prompt a mode
    /// change instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Backend)
    }

    /// Whether the error is internal bookkeeping that never reaches the user.
    pub fn is_silent(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Human-readable context line for error turns.
    pub fn user_context(&self) -> String {
        match self {
            Self::Transport(message) => format!("Connection problem: {}", message),
            Self::Backend { message } => format!("Mervin could not finish: {}", message),
            Self::Entitlement(message) => format!("Not available in this mode: {}", message),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MervinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MervinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MervinError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MervinError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (infrastructure constructors use anyhow)
impl From<anyhow::Error> for MervinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, MervinError>`.
pub type Result<T> = std::result::Result<T, MervinError>;
