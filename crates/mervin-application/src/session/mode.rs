//! Mode controller: legacy vs agent, and the capability gate tied to it.

use super::retry::PendingRequest;
use mervin_core::action::MervinAction;
use mervin_core::backend::{Attachment, EntitlementService};
use mervin_core::{ChatMode, MervinError, Result};
use serde::Serialize;
use std::sync::Arc;

/// A mode transition that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeChange {
    pub from: ChatMode,
    pub to: ChatMode,
    /// `true` for background downgrades the user is not told about.
    pub silent: bool,
}

pub struct ModeController {
    entitlements: Arc<dyn EntitlementService>,
    user_id: String,
}

impl ModeController {
    pub fn new(entitlements: Arc<dyn EntitlementService>, user_id: impl Into<String>) -> Self {
        Self {
            entitlements,
            user_id: user_id.into(),
        }
    }

    /// Explicit switch requested by the user.
    ///
    /// Switching to agent without entitlement fails with a non-retryable
    /// `Entitlement` error and leaves the mode unchanged.
    pub async fn request_mode(&self, current: ChatMode, requested: ChatMode) -> Result<ModeChange> {
        if requested == ChatMode::Agent
            && current != ChatMode::Agent
            && !self.entitlements.has_agent_access(&self.user_id).await?
        {
            tracing::info!(target: "mode", user_id = %self.user_id, "Agent mode refused");
            return Err(MervinError::Entitlement(
                "agent mode is not included in your plan".to_string(),
            ));
        }

        tracing::debug!(target: "mode", "Mode {} -> {}", current, requested);
        Ok(ModeChange {
            from: current,
            to: requested,
            silent: false,
        })
    }

    /// Background entitlement check.
    ///
    /// An agent session that is no longer entitled (or whose check fails) is
    /// downgraded to legacy without a user-visible notice.
    pub async fn sync_entitlement(&self, current: ChatMode) -> Option<ModeChange> {
        if current != ChatMode::Agent {
            return None;
        }

        let entitled = match self.entitlements.has_agent_access(&self.user_id).await {
            Ok(entitled) => entitled,
            Err(e) => {
                tracing::warn!(target: "mode", "Entitlement check failed: {}", e);
                false
            }
        };
        if entitled {
            return None;
        }

        tracing::debug!(target: "mode", user_id = %self.user_id, "Silently downgrading to legacy");
        Some(ModeChange {
            from: current,
            to: ChatMode::Legacy,
            silent: true,
        })
    }

    pub fn check_attachments(mode: ChatMode, attachments: &[Attachment]) -> Result<()> {
        if !attachments.is_empty() && !mode.capabilities().attachments {
            return Err(MervinError::Entitlement(format!(
                "attachments are not available in {} mode",
                mode
            )));
        }
        Ok(())
    }

    pub fn check_action(mode: ChatMode, action: MervinAction) -> Result<()> {
        if action.requires_agent() && !mode.capabilities().agent_actions {
            return Err(MervinError::Entitlement(format!(
                "/{} needs agent mode",
                action
            )));
        }
        Ok(())
    }

    /// Gates a whole request: its action, if any, then its attachments.
    pub fn check_request(mode: ChatMode, request: &PendingRequest) -> Result<()> {
        if let Some(action) = request.action {
            Self::check_action(mode, action)?;
        }
        Self::check_attachments(mode, &request.attachments)
    }
}
