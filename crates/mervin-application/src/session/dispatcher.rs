//! Action dispatcher: slash commands, smart suggestions and the FAB.

use mervin_core::action::{
    DispatchSource, IntentDetector, IntentSuggestion, MervinAction, parse_builtin_command,
};
use mervin_core::{MervinError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Owner value of a free dispatch slot. Generations start at 1.
const FREE: u64 = 0;

/// How a piece of user input should be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Run the action's canned task prompt. The raw input is not echoed;
    /// text typed after a slash command travels as `details`.
    Action {
        action: MervinAction,
        details: Option<String>,
    },
    /// Send the text as an ordinary message. A suggestion, if any, is only
    /// surfaced to the user and never fired automatically.
    Message { suggestion: Option<IntentSuggestion> },
}

/// Routes input to actions and owns the single dispatch slot.
///
/// The slot records the generation of the action holding it. Once that
/// generation is superseded the action has been cancelled, so the slot is
/// free again even before the abandoned task notices.
pub struct ActionDispatcher {
    detector: IntentDetector,
    owner: AtomicU64,
}

/// Held while a dispatch is running; dropping it frees the dispatcher.
#[must_use]
pub struct DispatchGuard<'a> {
    owner: &'a AtomicU64,
    generation: u64,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        // A newer action may have taken the slot over already.
        let _ = self
            .owner
            .compare_exchange(self.generation, FREE, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl ActionDispatcher {
    pub fn new(detector: IntentDetector) -> Self {
        Self {
            detector,
            owner: AtomicU64::new(FREE),
        }
    }

    /// Decides what `raw` is.
    ///
    /// Text starting with `/` is looked up in the builtin table; unknown
    /// commands fall through as plain text. Smart and FAB sources may also
    /// name the action directly (`"estimate"`).
    pub fn dispatch(&self, raw: &str, source: DispatchSource) -> Dispatch {
        let trimmed = raw.trim();

        if trimmed.starts_with('/') {
            if let Some((command, args)) = parse_builtin_command(trimmed) {
                tracing::debug!(target: "dispatcher", "Slash command {}", command.usage);
                return Dispatch::Action {
                    action: command.action,
                    details: (!args.is_empty()).then(|| args.to_string()),
                };
            }
            tracing::debug!(target: "dispatcher", "Unknown slash command, sending as text: {}", trimmed);
            return Dispatch::Message { suggestion: None };
        }

        if matches!(source, DispatchSource::Smart | DispatchSource::Fab)
            && let Ok(action) = trimmed.parse::<MervinAction>()
        {
            return Dispatch::Action {
                action,
                details: None,
            };
        }

        Dispatch::Message {
            suggestion: self.detector.detect(trimmed),
        }
    }

    pub fn suggest(&self, text: &str) -> Option<IntentSuggestion> {
        self.detector.detect(text)
    }

    /// Claims the dispatch slot for an action that will run under
    /// `generation`, failing with `Busy` while an action of `current` still
    /// holds it.
    ///
    /// Callers serialize this under the session lock, with `current` the
    /// live generation and `generation` the one about to start.
    pub fn try_begin(&self, current: u64, generation: u64) -> Result<DispatchGuard<'_>> {
        let claimed = self
            .owner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                (held == FREE || held != current).then_some(generation)
            });
        if claimed.is_err() {
            tracing::debug!(target: "dispatcher", "Dispatch rejected: another is in flight");
            return Err(MervinError::Busy(
                "another action is still running".to_string(),
            ));
        }
        Ok(DispatchGuard {
            owner: &self.owner,
            generation,
        })
    }

    /// Whether an action of `current` holds the slot.
    pub fn is_busy(&self, current: u64) -> bool {
        let held = self.owner.load(Ordering::Acquire);
        held != FREE && held == current
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new(IntentDetector::default())
    }
}
