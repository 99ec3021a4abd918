//! Error records and retry bookkeeping.

use chrono::Utc;
use mervin_core::action::MervinAction;
use mervin_core::backend::Attachment;
use mervin_core::{ErrorKind, MervinError};
use serde::Serialize;

/// A failure as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Reference id the user can quote to support (`ERR-...`).
    pub error_id: String,
    pub context: String,
    pub can_retry: bool,
    pub kind: ErrorKind,
}

/// What a turn was asked to do, kept so a failure can be re-submitted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub message: String,
    pub attachments: Vec<Attachment>,
    /// Action that produced `message`, if any. Its capability gate applies
    /// again on retry.
    pub action: Option<MervinAction>,
}

impl PendingRequest {
    /// Category a new conversation gets when this request creates it.
    pub fn category(&self) -> Option<&'static str> {
        self.action.map(MervinAction::category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRequest {
    pub error_id: String,
    /// The error turn the retry replaces.
    pub turn_id: String,
    pub request: PendingRequest,
}

/// Issues `ERR-` ids from the millisecond clock in base 36.
///
/// Two errors in the same millisecond still get distinct ids: the counter
/// never goes backwards and never repeats.
#[derive(Debug, Default)]
pub struct ErrorIdGenerator {
    last: u64,
}

impl ErrorIdGenerator {
    pub fn next_id(&mut self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last = now.max(self.last + 1);
        format!("ERR-{}", to_base36(self.last))
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Wraps failures into [`ErrorRecord`]s and remembers the last retryable one.
#[derive(Debug, Default)]
pub struct ErrorRetryManager {
    ids: ErrorIdGenerator,
    last_failed: Option<FailedRequest>,
}

impl ErrorRetryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrap(&mut self, error: &MervinError) -> ErrorRecord {
        let record = ErrorRecord {
            error_id: self.ids.next_id(),
            context: error.user_context(),
            can_retry: error.is_retryable(),
            kind: error.kind(),
        };
        tracing::debug!(
            target: "retry",
            error_id = %record.error_id,
            kind = ?record.kind,
            "Wrapped error: {}",
            error
        );
        record
    }

    /// Remembers `request` as the one `retry_last_error` re-submits.
    pub fn record_failure(&mut self, record: &ErrorRecord, turn_id: &str, request: PendingRequest) {
        self.last_failed = record.can_retry.then(|| FailedRequest {
            error_id: record.error_id.clone(),
            turn_id: turn_id.to_string(),
            request,
        });
    }

    pub fn last_failed(&self) -> Option<&FailedRequest> {
        self.last_failed.as_ref()
    }

    pub fn take_failed(&mut self) -> Option<FailedRequest> {
        self.last_failed.take()
    }

    pub fn clear(&mut self) {
        self.last_failed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn request() -> PendingRequest {
        PendingRequest {
            message: "Estimate a deck".to_string(),
            attachments: Vec::new(),
            action: None,
        }
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_error_ids_are_unique_and_increasing() {
        let mut ids = ErrorIdGenerator::default();
        let issued: Vec<String> = (0..200).map(|_| ids.next_id()).collect();

        assert!(issued.iter().all(|id| id.starts_with("ERR-")));
        let unique: HashSet<&String> = issued.iter().collect();
        assert_eq!(unique.len(), issued.len());
    }

    #[test]
    fn test_transport_failure_is_retryable() {
        let mut manager = ErrorRetryManager::new();
        let record = manager.wrap(&MervinError::transport("stream stalled"));
        assert!(record.can_retry);
        assert_eq!(record.kind, ErrorKind::Transport);

        manager.record_failure(&record, "turn-1", request());
        let failed = manager.take_failed().unwrap();
        assert_eq!(failed.turn_id, "turn-1");
        assert_eq!(failed.request, request());
        assert!(manager.last_failed().is_none());
    }

    #[test]
    fn test_entitlement_failure_is_not_kept() {
        let mut manager = ErrorRetryManager::new();
        let record = manager.wrap(&MervinError::Entitlement("agent mode".to_string()));
        assert!(!record.can_retry);

        manager.record_failure(&record, "turn-1", request());
        assert!(manager.last_failed().is_none());
    }
}
