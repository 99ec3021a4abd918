//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::stream::BoxStream;
use mervin_application::{ChatSessionUseCase, SessionView};
use mervin_core::backend::{AllowAllEntitlements, ChatBackend, ChatRequest, EntitlementService};
use mervin_core::conversation::{
    Conversation, ConversationListItem, ConversationRepository, ListFilter, Turn, TurnRole,
};
use mervin_core::stream::StreamUpdate;
use mervin_core::{ChatMode, MervinError, Result, SessionConfig};
use mervin_infrastructure::MemoryConversationRepository;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Backends
// ============================================================================

/// One backend call's behaviour.
pub enum Script {
    Updates(Vec<StreamUpdate>),
    /// A stream that never yields.
    Silent,
    /// The call cannot be started.
    Refuse(MervinError),
    /// The call itself never returns.
    Hang,
}

/// Plays one script per call, in order, and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_chat(&self, request: ChatRequest) -> Result<BoxStream<'static, StreamUpdate>> {
        self.requests.lock().unwrap().push(request);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Updates(updates)) => Ok(futures::stream::iter(updates).boxed()),
            Some(Script::Silent) => Ok(futures::stream::pending().boxed()),
            Some(Script::Refuse(error)) => Err(error),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(MervinError::transport("no script left")),
        }
    }
}

/// Hands every stream's sending half to the test.
#[derive(Default)]
pub struct ChannelBackend {
    senders: Mutex<Vec<UnboundedSender<StreamUpdate>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ChannelBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stream_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    pub fn push(&self, stream: usize, update: StreamUpdate) {
        self.senders.lock().unwrap()[stream]
            .unbounded_send(update)
            .unwrap();
    }

    pub async fn wait_for_streams(&self, count: usize) {
        for _ in 0..1000 {
            if self.stream_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("backend never saw {} streams", count);
    }
}

#[async_trait]
impl ChatBackend for ChannelBackend {
    async fn stream_chat(&self, request: ChatRequest) -> Result<BoxStream<'static, StreamUpdate>> {
        let (tx, rx) = unbounded();
        self.requests.lock().unwrap().push(request);
        self.senders.lock().unwrap().push(tx);
        Ok(rx.boxed())
    }
}

// ============================================================================
// Entitlements
// ============================================================================

pub struct ToggleEntitlements {
    entitled: AtomicBool,
}

impl ToggleEntitlements {
    pub fn new(entitled: bool) -> Arc<Self> {
        Arc::new(Self {
            entitled: AtomicBool::new(entitled),
        })
    }

    pub fn set(&self, entitled: bool) {
        self.entitled.store(entitled, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntitlementService for ToggleEntitlements {
    async fn has_agent_access(&self, _user_id: &str) -> Result<bool> {
        Ok(self.entitled.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Repositories
// ============================================================================

/// Memory repository whose loads of selected ids wait for `release`.
#[derive(Default)]
pub struct GatedRepository {
    inner: MemoryConversationRepository,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl GatedRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed(&self, conversation: Conversation) {
        self.inner.insert(conversation).await;
    }

    pub fn gate(&self, conversation_id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, conversation_id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(conversation_id) {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl ConversationRepository for GatedRepository {
    async fn find_by_id(&self, user_id: &str, conversation_id: &str) -> Result<Option<Conversation>> {
        let gate = self.gates.lock().unwrap().get(conversation_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner.find_by_id(user_id, conversation_id).await
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.inner.save(conversation).await
    }

    async fn delete(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        self.inner.delete(user_id, conversation_id).await
    }

    async fn list(&self, user_id: &str, filter: &ListFilter) -> Result<Vec<ConversationListItem>> {
        self.inner.list(user_id, filter).await
    }
}

/// Repository whose writes always fail.
pub struct ReadOnlyRepository;

#[async_trait]
impl ConversationRepository for ReadOnlyRepository {
    async fn find_by_id(&self, _user_id: &str, _conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(None)
    }

    async fn save(&self, _conversation: &Conversation) -> Result<()> {
        Err(MervinError::io("disk full"))
    }

    async fn delete(&self, _user_id: &str, _conversation_id: &str) -> Result<()> {
        Ok(())
    }

    async fn list(&self, _user_id: &str, _filter: &ListFilter) -> Result<Vec<ConversationListItem>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn config(mode: ChatMode) -> SessionConfig {
    SessionConfig {
        user_id: "u1".to_string(),
        default_mode: mode,
        ..SessionConfig::default()
    }
}

pub fn session(
    mode: ChatMode,
    backend: Arc<dyn ChatBackend>,
    repository: Arc<dyn ConversationRepository>,
) -> Arc<ChatSessionUseCase> {
    Arc::new(ChatSessionUseCase::new(
        &config(mode),
        backend,
        repository,
        Arc::new(AllowAllEntitlements),
    ))
}

/// A stored conversation with `turns` alternating user/assistant turns.
pub fn stored_conversation(conversation_id: &str, turns: usize) -> Conversation {
    let messages = (0..turns)
        .map(|i| {
            let mut turn = Turn::user(format!("{} #{}", conversation_id, i));
            if i % 2 == 1 {
                turn.role = TurnRole::Assistant;
            }
            turn
        })
        .collect();

    Conversation {
        conversation_id: conversation_id.to_string(),
        user_id: "u1".to_string(),
        title: format!("Conversation {}", conversation_id),
        category: "general".to_string(),
        messages,
        is_pinned: false,
        ai_model: "mervin-agent".to_string(),
        created_at: "2024-03-01T10:00:00Z".to_string(),
        last_activity_at: "2024-03-01T10:00:00Z".to_string(),
    }
}

/// Polls the session view until `check` holds.
pub async fn wait_for_view<F>(session: &ChatSessionUseCase, check: F) -> SessionView
where
    F: Fn(&SessionView) -> bool,
{
    for _ in 0..1000 {
        let view = session.view().await;
        if check(&view) {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("session never reached the expected state");
}

pub fn user_turns(view: &SessionView) -> usize {
    view.turns.iter().filter(|t| t.is_user()).count()
}

pub fn open_turns(view: &SessionView) -> usize {
    view.turns.iter().filter(|t| t.is_open()).count()
}
