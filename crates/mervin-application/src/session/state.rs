//! Mutable state shared by the chat use case and the history bridge.

use super::history::LoadGate;
use super::retry::ErrorRetryManager;
use super::store::SessionStore;
use mervin_core::ChatMode;
use serde::Serialize;

/// Something the UI should tell the user that is not part of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The live session is intact but was not written to storage.
    NotSaved {
        conversation_id: String,
        message: String,
    },
}

/// Everything behind the session lock.
///
/// `generation` identifies the stream allowed to write to `store`. Anything
/// that abandons the current stream bumps it, so updates from the old stream
/// are recognised as stale and dropped.
#[derive(Debug)]
pub struct SessionState {
    pub store: SessionStore,
    pub generation: u64,
    pub load: LoadGate,
    pub retry: ErrorRetryManager,
    pub notice: Option<Notice>,
    pub page_context: Option<String>,
}

impl SessionState {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            store: SessionStore::new(mode),
            generation: 0,
            load: LoadGate::default(),
            retry: ErrorRetryManager::new(),
            notice: None,
            page_context: None,
        }
    }

    /// Starts a new generation, abandoning the current stream (if any).
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        if let Some(turn_id) = self.store.cancel_open_turn() {
            tracing::debug!(
                target: "session",
                generation = self.generation,
                turn_id = %turn_id,
                "Abandoned in-flight turn"
            );
        }
        self.generation
    }

    /// Whether a stream started at `generation` may still write.
    pub fn accepts(&self, generation: u64) -> bool {
        self.generation == generation && !self.load.is_pending()
    }
}
