//! Session components coordinated by the chat use case.

pub mod dispatcher;
pub mod history;
pub mod mode;
pub mod retry;
pub mod state;
pub mod store;

pub use dispatcher::{ActionDispatcher, Dispatch, DispatchGuard};
pub use history::{ConversationHistoryBridge, ConversationList, LoadGate, LoadOutcome};
pub use mode::{ModeChange, ModeController};
pub use retry::{ErrorIdGenerator, ErrorRecord, ErrorRetryManager, FailedRequest, PendingRequest};
pub use state::{Notice, SessionState};
pub use store::{Session, SessionStore};
