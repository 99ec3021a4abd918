//! Session store.
//!
//! `SessionStore` is the single owned list of turns for the conversation on
//! screen. The backend stream never holds its own copy of the messages; it
//! only feeds updates that the use case applies here.

use mervin_core::conversation::{Turn, TurnRole, TurnStatus};
use mervin_core::stream::TaskState;
use mervin_core::{ChatMode, MervinError, Result};
use serde::Serialize;

/// Read-only copy of the live session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub conversation_id: Option<String>,
    pub mode: ChatMode,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    turns: Vec<Turn>,
    conversation_id: Option<String>,
    mode: ChatMode,
}

impl SessionStore {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            turns: Vec::new(),
            conversation_id: None,
            mode,
        }
    }

    // =========================================================================
    // Turn lifecycle
    // =========================================================================

    /// Appends a closed user turn and returns its id.
    pub fn append_user_turn(&mut self, content: impl Into<String>) -> String {
        let turn = Turn::user(content);
        let id = turn.id.clone();
        self.turns.push(turn);
        id
    }

    /// Opens an assistant placeholder in the `analyzing` state.
    ///
    /// Fails with `Conflict` while another turn is open.
    pub fn begin_assistant_turn(&mut self) -> Result<String> {
        if let Some(open) = self.open_turn_id() {
            return Err(reject(format!(
                "cannot open a turn while {} is still streaming",
                open
            )));
        }

        let turn = Turn::assistant_placeholder();
        let id = turn.id.clone();
        self.turns.push(turn);
        Ok(id)
    }

    /// Replaces the open turn's content with the cumulative text so far.
    ///
    /// Applying the same content twice leaves the store unchanged.
    pub fn update_assistant_turn(&mut self, turn_id: &str, partial_content: &str) -> Result<()> {
        let turn = self.open_turn_mut(turn_id)?;
        if turn.content != partial_content {
            turn.content = partial_content.to_string();
        }
        Ok(())
    }

    pub fn set_task_state(&mut self, turn_id: &str, state: TaskState) -> Result<()> {
        self.open_turn_mut(turn_id)?.state = Some(state);
        Ok(())
    }

    /// Closes the open turn with its final text.
    ///
    /// An empty `final_content` keeps whatever the stream already delivered.
    pub fn complete_assistant_turn(
        &mut self,
        turn_id: &str,
        final_content: &str,
        state: TaskState,
    ) -> Result<()> {
        let turn = self.open_turn_mut(turn_id)?;
        if !final_content.is_empty() {
            turn.content = final_content.to_string();
        }
        turn.state = Some(state);
        turn.status = TurnStatus::Closed;
        Ok(())
    }

    /// Turns the open turn into a closed error turn.
    pub fn mark_error(
        &mut self,
        turn_id: &str,
        error_id: &str,
        context: &str,
        can_retry: bool,
    ) -> Result<()> {
        let turn = self.open_turn_mut(turn_id)?;
        turn.content = context.to_string();
        turn.state = Some(TaskState::Error);
        turn.is_error = true;
        turn.error_id = Some(error_id.to_string());
        turn.can_retry = can_retry;
        turn.status = TurnStatus::Closed;
        Ok(())
    }

    /// Drops an abandoned open turn, returning its id.
    ///
    /// Partial text from a stream that will never complete is not kept, so
    /// it can never be persisted.
    pub fn cancel_open_turn(&mut self) -> Option<String> {
        let index = self.turns.iter().position(Turn::is_open)?;
        let turn = self.turns.remove(index);
        tracing::debug!(target: "session_store", turn_id = %turn.id, "Cancelled open turn");
        Some(turn.id)
    }

    pub fn remove_turn(&mut self, turn_id: &str) -> Option<Turn> {
        let index = self.turns.iter().position(|t| t.id == turn_id)?;
        Some(self.turns.remove(index))
    }

    /// Clears all turns. The conversation id is left alone; callers that
    /// start a fresh conversation clear it with `set_conversation_id(None)`.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Replaces the turn list with persisted turns (all closed).
    pub fn replace_turns(&mut self, turns: Vec<Turn>) {
        self.turns = turns
            .into_iter()
            .map(|mut turn| {
                turn.status = TurnStatus::Closed;
                turn
            })
            .collect();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, turn_id: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == turn_id)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Id of the open turn, if any. There is never more than one.
    pub fn open_turn_id(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|t| t.is_open())
            .map(|t| t.id.as_str())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn set_conversation_id(&mut self, conversation_id: Option<String>) {
        self.conversation_id = conversation_id;
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    pub fn snapshot(&self) -> Session {
        Session {
            conversation_id: self.conversation_id.clone(),
            mode: self.mode,
            turns: self.turns.clone(),
        }
    }

    /// Index of the user turn that precedes `turn_id`.
    pub fn preceding_user_turn(&self, turn_id: &str) -> Option<&Turn> {
        let index = self.turns.iter().position(|t| t.id == turn_id)?;
        self.turns[..index]
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
    }

    fn open_turn_mut(&mut self, turn_id: &str) -> Result<&mut Turn> {
        match self.turns.iter_mut().find(|t| t.id == turn_id) {
            Some(turn) if turn.is_open() => Ok(turn),
            Some(_) => Err(reject(format!("turn {} is already closed", turn_id))),
            None => Err(reject(format!("turn {} does not exist", turn_id))),
        }
    }
}

fn reject(message: String) -> MervinError {
    tracing::warn!(target: "session_store", "Rejected update: {}", message);
    MervinError::conflict(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_count(store: &SessionStore) -> usize {
        store.turns().iter().filter(|t| t.is_open()).count()
    }

    #[test]
    fn test_user_then_assistant_lifecycle() {
        let mut store = SessionStore::new(ChatMode::Legacy);
        store.append_user_turn("Hola");
        let turn_id = store.begin_assistant_turn().unwrap();

        store.update_assistant_turn(&turn_id, "¡Ho").unwrap();
        store.update_assistant_turn(&turn_id, "¡Hola!").unwrap();
        store
            .complete_assistant_turn(&turn_id, "¡Hola! ¿En qué te ayudo?", TaskState::Complete)
            .unwrap();

        let turn = store.turn(&turn_id).unwrap();
        assert_eq!(turn.content, "¡Hola! ¿En qué te ayudo?");
        assert_eq!(turn.state, Some(TaskState::Complete));
        assert!(!turn.is_open());
        assert_eq!(store.turns().len(), 2);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let turn_id = store.begin_assistant_turn().unwrap();

        store.update_assistant_turn(&turn_id, "Calculating lumber").unwrap();
        let once = store.snapshot();
        store.update_assistant_turn(&turn_id, "Calculating lumber").unwrap();

        assert_eq!(store.snapshot(), once);
    }

    #[test]
    fn test_at_most_one_open_turn() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let first = store.begin_assistant_turn().unwrap();

        let err = store.begin_assistant_turn().unwrap_err();
        assert!(matches!(err, MervinError::Conflict(_)));
        assert_eq!(open_count(&store), 1);

        store.complete_assistant_turn(&first, "done", TaskState::Complete).unwrap();
        assert_eq!(open_count(&store), 0);

        store.begin_assistant_turn().unwrap();
        assert_eq!(open_count(&store), 1);
    }

    #[test]
    fn test_updates_to_closed_or_unknown_turn_are_noops() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let turn_id = store.begin_assistant_turn().unwrap();
        store.complete_assistant_turn(&turn_id, "final", TaskState::Complete).unwrap();
        let before = store.snapshot();

        assert!(store.update_assistant_turn(&turn_id, "late chunk").is_err());
        assert!(store.complete_assistant_turn(&turn_id, "again", TaskState::Complete).is_err());
        assert!(store.mark_error(&turn_id, "ERR-1", "boom", true).is_err());
        assert!(store.update_assistant_turn("missing", "x").is_err());

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_complete_with_empty_final_keeps_streamed_text() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let turn_id = store.begin_assistant_turn().unwrap();
        store.update_assistant_turn(&turn_id, "Streamed answer").unwrap();
        store.complete_assistant_turn(&turn_id, "", TaskState::Complete).unwrap();

        assert_eq!(store.turn(&turn_id).unwrap().content, "Streamed answer");
    }

    #[test]
    fn test_mark_error_closes_turn() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let turn_id = store.begin_assistant_turn().unwrap();
        store.mark_error(&turn_id, "ERR-ABC", "Connection problem", true).unwrap();

        let turn = store.turn(&turn_id).unwrap();
        assert!(turn.is_error);
        assert!(turn.can_retry);
        assert_eq!(turn.error_id.as_deref(), Some("ERR-ABC"));
        assert_eq!(turn.state, Some(TaskState::Error));
        assert!(store.open_turn_id().is_none());
    }

    #[test]
    fn test_reset_keeps_conversation_id() {
        let mut store = SessionStore::new(ChatMode::Legacy);
        store.set_conversation_id(Some("c1".to_string()));
        store.append_user_turn("Hola");

        store.reset();
        assert!(store.turns().is_empty());
        assert_eq!(store.conversation_id(), Some("c1"));

        store.set_conversation_id(None);
        assert_eq!(store.conversation_id(), None);
    }

    #[test]
    fn test_cancel_open_turn_drops_partial_text() {
        let mut store = SessionStore::new(ChatMode::Agent);
        store.append_user_turn("Price a fence");
        let turn_id = store.begin_assistant_turn().unwrap();
        store.update_assistant_turn(&turn_id, "Half an ans").unwrap();

        assert_eq!(store.cancel_open_turn(), Some(turn_id));
        assert_eq!(store.turns().len(), 1);
        assert!(store.cancel_open_turn().is_none());
    }

    #[test]
    fn test_replace_turns_closes_everything() {
        let mut store = SessionStore::new(ChatMode::Agent);
        store.append_user_turn("old");

        let replacement = vec![Turn::user("a"), Turn::assistant_placeholder()];
        store.replace_turns(replacement);

        assert_eq!(store.turns().len(), 2);
        assert_eq!(store.turns()[0].content, "a");
        assert!(store.open_turn_id().is_none());
    }

    #[test]
    fn test_preceding_user_turn() {
        let mut store = SessionStore::new(ChatMode::Agent);
        let user_id = store.append_user_turn("Quote a roof");
        let turn_id = store.begin_assistant_turn().unwrap();

        assert_eq!(store.preceding_user_turn(&turn_id).map(|t| t.id.clone()), Some(user_id));
    }
}
