//! Conversation history bridge.
//!
//! The bridge is the only writer to the conversation repository. It saves
//! the live session when a stream finishes and hydrates the session when the
//! user opens a past conversation.
//!
//! # Load protocol
//!
//! Opening a conversation takes a fresh load ticket and marks the load as
//! pending. While it is pending the session refuses stream writes. When the
//! repository answers, the persisted turns *replace* the session's turns,
//! but only if the ticket is still current: a load that resolves after a
//! newer one started is discarded.

use super::state::SessionState;
use super::store::Session;
use chrono::{DateTime, Utc};
use mervin_core::conversation::{
    Conversation, ConversationListItem, ConversationRepository, DEFAULT_CATEGORY, ListFilter,
    Turn, UNTITLED_CONVERSATION, ai_model_label, derive_title,
};
use mervin_core::{MervinError, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracks the one conversation load allowed to land.
#[derive(Debug, Default)]
pub struct LoadGate {
    next_ticket: u64,
    pending: Option<PendingLoad>,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    ticket: u64,
    conversation_id: String,
}

impl LoadGate {
    /// Marks a load of `conversation_id` as pending, superseding any other.
    pub fn begin(&mut self, conversation_id: &str) -> u64 {
        self.next_ticket += 1;
        self.pending = Some(PendingLoad {
            ticket: self.next_ticket,
            conversation_id: conversation_id.to_string(),
        });
        self.next_ticket
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.pending.as_ref().is_some_and(|p| p.ticket == ticket)
    }

    /// Clears the pending marker if `ticket` still owns it.
    pub fn finish(&mut self, ticket: u64) -> bool {
        if self.is_current(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drops any pending load; its result will be discarded.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_conversation_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.conversation_id.as_str())
    }
}

/// Result of opening a past conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        conversation_id: String,
        turn_count: usize,
    },
    /// A newer load (or a new conversation) took over before this one landed.
    Superseded,
}

/// Listed conversations, pinned first then most recently active.
///
/// Iterating does not consume the list, so it can be walked any number of
/// times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationList {
    items: Vec<ConversationListItem>,
}

impl ConversationList {
    pub fn new(mut items: Vec<ConversationListItem>) -> Self {
        items.sort_by(list_order);
        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationListItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<ConversationListItem> {
        self.items
    }
}

impl<'a> IntoIterator for &'a ConversationList {
    type Item = &'a ConversationListItem;
    type IntoIter = std::slice::Iter<'a, ConversationListItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn list_order(a: &ConversationListItem, b: &ConversationListItem) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| {
            match (
                DateTime::parse_from_rfc3339(&a.last_activity_at),
                DateTime::parse_from_rfc3339(&b.last_activity_at),
            ) {
                (Ok(a), Ok(b)) => b.cmp(&a),
                _ => b.last_activity_at.cmp(&a.last_activity_at),
            }
        })
        .then_with(|| a.conversation_id.cmp(&b.conversation_id))
}

pub struct ConversationHistoryBridge {
    repository: Arc<dyn ConversationRepository>,
    user_id: String,
    save_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationHistoryBridge {
    pub fn new(repository: Arc<dyn ConversationRepository>, user_id: impl Into<String>) -> Self {
        Self {
            repository,
            user_id: user_id.into(),
            save_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<ConversationList> {
        let items = self.repository.list(&self.user_id, filter).await?;
        tracing::debug!(target: "history", "Listed {} conversations", items.len());
        Ok(ConversationList::new(items))
    }

    pub async fn load(&self, conversation_id: &str) -> Result<Conversation> {
        self.repository
            .find_by_id(&self.user_id, conversation_id)
            .await?
            .ok_or_else(|| MervinError::not_found("conversation", conversation_id))
    }

    /// Opens `conversation_id` into the session behind `state`.
    pub async fn select(
        &self,
        state: &Mutex<SessionState>,
        conversation_id: &str,
    ) -> Result<LoadOutcome> {
        let ticket = {
            let mut state = state.lock().await;
            state.bump_generation();
            state.retry.clear();
            state.load.begin(conversation_id)
        };
        tracing::debug!(target: "history", ticket, "Loading conversation {}", conversation_id);

        let loaded = self.load(conversation_id).await;

        let mut state = state.lock().await;
        if !state.load.finish(ticket) {
            tracing::debug!(target: "history", ticket, "Discarding superseded load of {}", conversation_id);
            return Ok(LoadOutcome::Superseded);
        }

        let conversation = loaded?;
        let turn_count = conversation.messages.len();
        state.store.replace_turns(conversation.messages);
        state
            .store
            .set_conversation_id(Some(conversation.conversation_id.clone()));
        state.notice = None;

        tracing::info!(
            target: "history",
            "Opened conversation {} ({} turns)",
            conversation.conversation_id,
            turn_count
        );
        Ok(LoadOutcome::Loaded {
            conversation_id: conversation.conversation_id,
            turn_count,
        })
    }

    /// Writes the closed turns of `session`, creating the conversation when
    /// the session has no id yet. Returns the conversation id.
    ///
    /// `category` only applies when the conversation is created.
    pub async fn save(&self, session: &Session, category: Option<&str>) -> Result<String> {
        let conversation_id = session
            .conversation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let lock = self.save_lock(&conversation_id).await;
        let _guard = lock.lock().await;

        let messages: Vec<Turn> = session
            .turns
            .iter()
            .filter(|t| !t.is_open())
            .cloned()
            .collect();
        let now = Utc::now().to_rfc3339();
        let ai_model = ai_model_label(session.mode);

        let existing = self
            .repository
            .find_by_id(&self.user_id, &conversation_id)
            .await
            .map_err(|e| not_saved(&conversation_id, e))?;

        let conversation = match existing {
            Some(existing) => {
                let title = if existing.title == UNTITLED_CONVERSATION {
                    derive_title(&messages)
                } else {
                    existing.title.clone()
                };
                Conversation {
                    title,
                    messages,
                    ai_model,
                    last_activity_at: now,
                    ..existing
                }
            }
            None => Conversation {
                conversation_id: conversation_id.clone(),
                user_id: self.user_id.clone(),
                title: derive_title(&messages),
                category: category.unwrap_or(DEFAULT_CATEGORY).to_string(),
                messages,
                is_pinned: false,
                ai_model,
                created_at: now.clone(),
                last_activity_at: now,
            },
        };

        self.repository
            .save(&conversation)
            .await
            .map_err(|e| not_saved(&conversation_id, e))?;

        tracing::debug!(
            target: "history",
            "Saved conversation {} ({} turns)",
            conversation_id,
            conversation.messages.len()
        );
        Ok(conversation_id)
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<()> {
        {
            let lock = self.save_lock(conversation_id).await;
            let _guard = lock.lock().await;
            self.repository.delete(&self.user_id, conversation_id).await?;
        }
        self.save_locks.lock().await.remove(conversation_id);
        tracing::info!(target: "history", "Deleted conversation {}", conversation_id);
        Ok(())
    }

    pub async fn set_pinned(&self, conversation_id: &str, pinned: bool) -> Result<()> {
        self.modify(conversation_id, |c| c.is_pinned = pinned).await
    }

    pub async fn rename(&self, conversation_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MervinError::config("conversation title cannot be empty"));
        }
        self.modify(conversation_id, |c| c.title = title.to_string())
            .await
    }

    async fn modify<F>(&self, conversation_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Conversation) + Send,
    {
        let lock = self.save_lock(conversation_id).await;
        let _guard = lock.lock().await;

        let mut conversation = self.load(conversation_id).await?;
        f(&mut conversation);
        self.repository.save(&conversation).await
    }

    async fn save_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        self.save_locks
            .lock()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }
}

fn not_saved(conversation_id: &str, error: MervinError) -> MervinError {
    if matches!(error, MervinError::Persistence(_)) {
        return error;
    }
    MervinError::persistence(format!(
        "conversation {} not saved: {}",
        conversation_id, error
    ))
}
