//! Chat session use case.
//!
//! `ChatSessionUseCase` is the boundary the UI talks to. It owns the live
//! session and coordinates the session components:
//!
//! - [`SessionStore`](crate::session::SessionStore) holds the turns
//! - the stream classifier turns backend progress into task states
//! - [`ConversationHistoryBridge`] loads and saves conversations
//! - [`ModeController`] gates legacy/agent capabilities
//! - [`ActionDispatcher`] routes slash commands and suggestions
//! - [`ErrorRetryManager`](crate::session::ErrorRetryManager) records failures for retry
//!
//! # Streams and generations
//!
//! Every backend call runs under a generation number. Sending a message,
//! opening a conversation, starting a new one or deleting the active one
//! bumps the generation; updates from a stream whose generation is no longer
//! current are dropped and the call reports [`TurnOutcome::Superseded`].
//!
//! # Thread Safety
//!
//! All mutable state sits behind one `tokio::sync::Mutex`, which is never
//! held across a backend or repository call.

use crate::session::{
    ActionDispatcher, ConversationHistoryBridge, ConversationList, Dispatch, ErrorRecord,
    LoadOutcome, ModeChange, ModeController, Notice, PendingRequest, Session, SessionState,
};
use futures::StreamExt;
use mervin_core::action::{DispatchSource, IntentSuggestion, MervinAction};
use mervin_core::backend::{Attachment, ChatBackend, ChatRequest, EntitlementService};
use mervin_core::conversation::{ConversationRepository, ListFilter, Turn};
use mervin_core::stream::{StreamClassifier, StreamUpdate, StreamUpdateType, TaskState};
use mervin_core::{ChatMode, MervinError, Result, SessionConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How one assistant turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed {
        turn_id: String,
        conversation_id: String,
        /// `false` when the save failed; the session still holds the turn.
        persisted: bool,
    },
    Failed {
        turn_id: String,
        error: ErrorRecord,
    },
    /// A newer generation took over; nothing from this stream was kept.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub turn: TurnOutcome,
    /// Action detected in the text, offered to the user but not run.
    pub suggestion: Option<IntentSuggestion>,
}

/// Read-only render state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub active_conversation_id: Option<String>,
    pub mode: ChatMode,
    pub turns: Vec<Turn>,
    pub is_loading_conversation: bool,
    pub loading_conversation_id: Option<String>,
    pub is_streaming: bool,
    /// Task state of the open turn while streaming.
    pub task_state: Option<TaskState>,
    pub can_retry: bool,
    pub dispatch_in_flight: bool,
    pub notice: Option<Notice>,
}

pub struct ChatSessionUseCase {
    backend: Arc<dyn ChatBackend>,
    history: ConversationHistoryBridge,
    modes: ModeController,
    dispatcher: ActionDispatcher,
    classifier: StreamClassifier,
    language: String,
    idle_timeout: Duration,
    state: Mutex<SessionState>,
}

impl ChatSessionUseCase {
    pub fn new(
        config: &SessionConfig,
        backend: Arc<dyn ChatBackend>,
        repository: Arc<dyn ConversationRepository>,
        entitlements: Arc<dyn EntitlementService>,
    ) -> Self {
        tracing::debug!(
            target: "chat",
            user_id = %config.user_id,
            mode = %config.default_mode,
            "Creating chat session"
        );
        Self {
            backend,
            history: ConversationHistoryBridge::new(repository, config.user_id.clone()),
            modes: ModeController::new(entitlements, config.user_id.clone()),
            dispatcher: ActionDispatcher::new(config.intent_detector()),
            classifier: config.classifier(),
            language: config.language.clone(),
            idle_timeout: config.stream_idle_timeout(),
            state: Mutex::new(SessionState::new(config.default_mode)),
        }
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Sends user input.
    ///
    /// Builtin slash commands run their action instead of being echoed.
    /// Anything else is appended as a user turn and streamed; a detected
    /// intent comes back as a suggestion only.
    pub async fn send_message(&self, text: &str, files: Vec<Attachment>) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MervinError::internal("cannot send an empty message"));
        }

        match self.dispatcher.dispatch(text, DispatchSource::Slash) {
            Dispatch::Action { action, details } => Ok(SendOutcome {
                turn: self.run_action(action, details.as_deref(), files).await?,
                suggestion: None,
            }),
            Dispatch::Message { suggestion } => {
                let request = PendingRequest {
                    message: text.to_string(),
                    attachments: files,
                    action: None,
                };
                Ok(SendOutcome {
                    turn: self.run_turn(request, TurnStart::Echo).await?,
                    suggestion,
                })
            }
        }
    }

    /// Runs an action chosen from a suggestion, the FAB, or a slash command.
    ///
    /// Fails with `Busy` while another dispatch is in flight.
    pub async fn dispatch_action(
        &self,
        action: MervinAction,
        source: DispatchSource,
    ) -> Result<TurnOutcome> {
        tracing::debug!(target: "dispatcher", ?source, "Dispatching /{}", action);
        self.run_action(action, None, Vec::new()).await
    }

    /// Re-submits the request behind the last retryable error.
    ///
    /// The error turn is removed and no new user turn is added. The request
    /// passes the capability gate of the current mode again, so a failure
    /// from agent mode cannot be replayed after a downgrade to legacy.
    pub async fn retry_last_error(&self) -> Result<TurnOutcome> {
        let (request, error_turn_id) = {
            let state = self.state.lock().await;
            if state.load.is_pending() {
                return Err(loading());
            }
            let failed = state
                .retry
                .last_failed()
                .ok_or_else(|| MervinError::not_found("retryable error", "last"))?;
            tracing::info!(target: "retry", error_id = %failed.error_id, "Retrying failed request");
            (failed.request.clone(), failed.turn_id.clone())
        };

        self.run_turn(request, TurnStart::Retry { error_turn_id }).await
    }

    pub fn suggest(&self, text: &str) -> Option<IntentSuggestion> {
        self.dispatcher.suggest(text)
    }

    pub async fn set_page_context(&self, page_context: Option<String>) {
        self.state.lock().await.page_context = page_context;
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    pub async fn select_conversation(&self, conversation_id: &str) -> Result<LoadOutcome> {
        self.history.select(&self.state, conversation_id).await
    }

    /// Clears the session and detaches it from any stored conversation.
    pub async fn new_conversation(&self) {
        let mut state = self.state.lock().await;
        clear_session(&mut state);
        tracing::debug!(target: "chat", generation = state.generation, "Started new conversation");
    }

    pub async fn list_conversations(&self, filter: &ListFilter) -> Result<ConversationList> {
        self.history.list(filter).await
    }

    /// Deletes a stored conversation. If it is open, the session is cleared.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.history.delete(conversation_id).await?;

        let mut state = self.state.lock().await;
        if state.load.pending_conversation_id() == Some(conversation_id) {
            state.load.cancel();
        }
        if state.store.conversation_id() == Some(conversation_id) {
            clear_session(&mut state);
            tracing::info!(target: "chat", "Active conversation {} was deleted", conversation_id);
        }
        Ok(())
    }

    pub async fn set_pinned(&self, conversation_id: &str, pinned: bool) -> Result<()> {
        self.history.set_pinned(conversation_id, pinned).await
    }

    pub async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.history.rename(conversation_id, title).await
    }

    // =========================================================================
    // Mode
    // =========================================================================

    /// Explicit mode switch. Takes effect from the next backend call.
    pub async fn set_mode(&self, mode: ChatMode) -> Result<ModeChange> {
        let current = self.state.lock().await.store.mode();
        let change = self.modes.request_mode(current, mode).await?;
        self.state.lock().await.store.set_mode(change.to);
        Ok(change)
    }

    /// Background entitlement check; may silently downgrade to legacy.
    pub async fn sync_entitlement(&self) -> Option<ModeChange> {
        let current = self.state.lock().await.store.mode();
        let change = self.modes.sync_entitlement(current).await?;

        let mut state = self.state.lock().await;
        if state.store.mode() != change.from {
            return None;
        }
        state.store.set_mode(change.to);
        Some(change)
    }

    // =========================================================================
    // Read-only state
    // =========================================================================

    pub async fn view(&self) -> SessionView {
        let state = self.state.lock().await;
        let open_turn = state
            .store
            .open_turn_id()
            .and_then(|id| state.store.turn(id));

        SessionView {
            active_conversation_id: state.store.conversation_id().map(str::to_string),
            mode: state.store.mode(),
            turns: state.store.turns().to_vec(),
            is_loading_conversation: state.load.is_pending(),
            loading_conversation_id: state.load.pending_conversation_id().map(str::to_string),
            is_streaming: open_turn.is_some(),
            task_state: open_turn.and_then(|t| t.state),
            can_retry: state.retry.last_failed().is_some(),
            dispatch_in_flight: self.dispatcher.is_busy(state.generation),
            notice: state.notice.clone(),
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.store.snapshot()
    }

    pub async fn is_loading_conversation(&self) -> bool {
        self.state.lock().await.load.is_pending()
    }

    pub async fn active_conversation_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .store
            .conversation_id()
            .map(str::to_string)
    }

    pub async fn dismiss_notice(&self) {
        self.state.lock().await.notice = None;
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    async fn run_action(
        &self,
        action: MervinAction,
        details: Option<&str>,
        attachments: Vec<Attachment>,
    ) -> Result<TurnOutcome> {
        let request = PendingRequest {
            message: action.task_prompt_with(details),
            attachments,
            action: Some(action),
        };
        self.run_turn(request, TurnStart::Silent).await
    }

    /// Streams one assistant turn for `request`.
    ///
    /// The capability gate, the dispatch slot and the generation bump all
    /// happen under one lock, so a rejected request leaves the session as
    /// it was.
    async fn run_turn(&self, request: PendingRequest, start: TurnStart) -> Result<TurnOutcome> {
        let (generation, turn_id, chat_request, _dispatch) = {
            let mut state = self.state.lock().await;
            if state.load.is_pending() {
                return Err(loading());
            }
            ModeController::check_request(state.store.mode(), &request)?;

            // Actions hold the dispatch slot for the generation bumped below.
            let dispatch = match request.action {
                Some(_) => Some(
                    self.dispatcher
                        .try_begin(state.generation, state.generation + 1)?,
                ),
                None => None,
            };

            if let TurnStart::Retry { error_turn_id } = &start {
                let still_failed = state
                    .retry
                    .last_failed()
                    .is_some_and(|failed| failed.turn_id == *error_turn_id);
                if !still_failed || state.store.remove_turn(error_turn_id).is_none() {
                    return Err(MervinError::not_found("error turn", error_turn_id.clone()));
                }
            }

            let generation = state.bump_generation();
            state.retry.clear();
            state.notice = None;
            if matches!(start, TurnStart::Echo) {
                state.store.append_user_turn(request.message.clone());
            }
            let turn_id = state.store.begin_assistant_turn()?;

            let chat_request = ChatRequest {
                message: request.message.clone(),
                attachments: request.attachments.clone(),
                mode: state.store.mode(),
                language: self.language.clone(),
                conversation_id: state.store.conversation_id().map(str::to_string),
                page_context: state.page_context.clone(),
            };
            (generation, turn_id, chat_request, dispatch)
        };

        tracing::debug!(
            target: "chat",
            generation,
            turn_id = %turn_id,
            mode = %chat_request.mode,
            "Starting backend stream"
        );

        let mut stream =
            match tokio::time::timeout(self.idle_timeout, self.backend.stream_chat(chat_request))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return self.fail(generation, &turn_id, e, request).await,
                Err(_) => {
                    let error = MervinError::transport(format!(
                        "backend did not answer within {:?}",
                        self.idle_timeout
                    ));
                    return self.fail(generation, &turn_id, error, request).await;
                }
            };

        let mut task_state = TaskState::Analyzing;
        loop {
            let update = match tokio::time::timeout(self.idle_timeout, stream.next()).await {
                Ok(Some(update)) => update,
                Ok(None) => {
                    let error = MervinError::transport("stream ended without a final answer");
                    return self.fail(generation, &turn_id, error, request).await;
                }
                Err(_) => {
                    let error =
                        MervinError::transport(format!("no update within {:?}", self.idle_timeout));
                    return self.fail(generation, &turn_id, error, request).await;
                }
            };

            let next_state = self.classifier.classify(&update, task_state);
            match update.update_type {
                StreamUpdateType::Complete => {
                    return self
                        .complete(generation, &turn_id, &update.content, request)
                        .await;
                }
                StreamUpdateType::Error => {
                    let message = if update.content.trim().is_empty() {
                        "the assistant reported an error".to_string()
                    } else {
                        update.content
                    };
                    let error = MervinError::backend(message);
                    return self.fail(generation, &turn_id, error, request).await;
                }
                StreamUpdateType::Progress | StreamUpdateType::Message => {
                    if !self.apply(generation, &turn_id, &update, next_state).await {
                        return Ok(TurnOutcome::Superseded);
                    }
                }
            }

            if next_state != task_state {
                tracing::debug!(target: "chat", turn_id = %turn_id, "Task state {} -> {}", task_state, next_state);
            }
            task_state = next_state;
        }
    }

    /// Applies a non-terminal update. Returns `false` if the stream is stale.
    async fn apply(
        &self,
        generation: u64,
        turn_id: &str,
        update: &StreamUpdate,
        task_state: TaskState,
    ) -> bool {
        let mut state = self.state.lock().await;
        if !state.accepts(generation) {
            tracing::debug!(target: "chat", generation, "Dropping update from stale stream");
            return false;
        }

        if update.update_type == StreamUpdateType::Message {
            // Rejections are logged by the store and leave it untouched.
            let _ = state.store.update_assistant_turn(turn_id, &update.content);
        }
        let _ = state.store.set_task_state(turn_id, task_state);
        true
    }

    async fn complete(
        &self,
        generation: u64,
        turn_id: &str,
        final_content: &str,
        request: PendingRequest,
    ) -> Result<TurnOutcome> {
        let (session, conversation_id) = {
            let mut state = self.state.lock().await;
            if !state.accepts(generation) {
                tracing::debug!(target: "chat", generation, "Dropping completion from stale stream");
                return Ok(TurnOutcome::Superseded);
            }
            state
                .store
                .complete_assistant_turn(turn_id, final_content, TaskState::Complete)?;
            let conversation_id = ensure_conversation_id(&mut state);
            (state.store.snapshot(), conversation_id)
        };

        tracing::debug!(target: "chat", turn_id = %turn_id, "Turn complete");
        let persisted = self.persist(&session, request.category()).await;

        Ok(TurnOutcome::Completed {
            turn_id: turn_id.to_string(),
            conversation_id,
            persisted,
        })
    }

    async fn fail(
        &self,
        generation: u64,
        turn_id: &str,
        error: MervinError,
        request: PendingRequest,
    ) -> Result<TurnOutcome> {
        let category = request.category();
        let (record, session) = {
            let mut state = self.state.lock().await;
            if !state.accepts(generation) {
                tracing::debug!(target: "chat", generation, "Dropping failure from stale stream: {}", error);
                return Ok(TurnOutcome::Superseded);
            }

            let record = state.retry.wrap(&error);
            state
                .store
                .mark_error(turn_id, &record.error_id, &record.context, record.can_retry)?;
            state.retry.record_failure(&record, turn_id, request);
            ensure_conversation_id(&mut state);
            (record, state.store.snapshot())
        };

        tracing::warn!(
            target: "chat",
            error_id = %record.error_id,
            retryable = record.can_retry,
            "Turn failed: {}",
            error
        );
        self.persist(&session, category).await;

        Ok(TurnOutcome::Failed {
            turn_id: turn_id.to_string(),
            error: record,
        })
    }

    /// Saves `session`. A failure leaves the live session alone and raises
    /// a "not saved" notice instead.
    async fn persist(&self, session: &Session, category: Option<&str>) -> bool {
        match self.history.save(session, category).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(target: "history", "Failed to save conversation: {}", e);
                let mut state = self.state.lock().await;
                if let Some(conversation_id) = session.conversation_id.clone()
                    && state.store.conversation_id() == Some(conversation_id.as_str())
                {
                    state.notice = Some(Notice::NotSaved {
                        conversation_id,
                        message: e.to_string(),
                    });
                }
                false
            }
        }
    }
}

/// How a turn enters the transcript.
enum TurnStart {
    /// Echo the request text as a user turn.
    Echo,
    /// Action prompt; nothing is echoed.
    Silent,
    /// Replace the error turn of the request being retried.
    Retry { error_turn_id: String },
}

/// Returns the session's conversation id, assigning a new one if needed.
///
/// The id is fixed under the session lock, before the save starts, so two
/// saves of the same new session can never create two conversations.
fn ensure_conversation_id(state: &mut SessionState) -> String {
    if let Some(id) = state.store.conversation_id() {
        return id.to_string();
    }
    let id = uuid::Uuid::new_v4().to_string();
    state.store.set_conversation_id(Some(id.clone()));
    id
}

fn clear_session(state: &mut SessionState) {
    state.bump_generation();
    state.load.cancel();
    state.store.reset();
    state.store.set_conversation_id(None);
    state.retry.clear();
    state.notice = None;
}

fn loading() -> MervinError {
    MervinError::Busy("a conversation is still loading".to_string())
}
