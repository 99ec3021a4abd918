//! Wiring of a chat session from the on-disk configuration.

use crate::chat_usecase::ChatSessionUseCase;
use anyhow::{Result, anyhow};
use mervin_core::backend::{ChatBackend, EntitlementService};
use mervin_infrastructure::{ConfigService, TomlConversationRepository};
use std::path::Path;
use std::sync::Arc;

/// Builds a session from `~/.config/mervin/config.toml`, storing
/// conversations under the same directory.
pub fn build_default_session(
    backend: Arc<dyn ChatBackend>,
    entitlements: Arc<dyn EntitlementService>,
) -> Result<ChatSessionUseCase> {
    let config = ConfigService::default_location()
        .and_then(|service| service.get_config())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    let repository = TomlConversationRepository::default_location()?;

    tracing::info!(
        "[Bootstrap] Session for user {} in {} mode",
        config.user_id,
        config.default_mode
    );
    Ok(ChatSessionUseCase::new(
        &config,
        backend,
        Arc::new(repository),
        entitlements,
    ))
}

/// Builds a session rooted at `base_dir` (`config.toml` plus
/// `conversations/`).
pub fn build_session_at(
    base_dir: &Path,
    backend: Arc<dyn ChatBackend>,
    entitlements: Arc<dyn EntitlementService>,
) -> Result<ChatSessionUseCase> {
    let config = ConfigService::with_path(base_dir.join("config.toml"))
        .get_config()
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    let repository = TomlConversationRepository::new(base_dir)?;

    tracing::info!(
        "[Bootstrap] Session for user {} at {}",
        config.user_id,
        base_dir.display()
    );
    Ok(ChatSessionUseCase::new(
        &config,
        backend,
        Arc::new(repository),
        entitlements,
    ))
}
