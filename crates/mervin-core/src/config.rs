//! Session configuration.

use crate::action::{DEFAULT_INTENT_THRESHOLD, IntentDetector, IntentRule, default_intent_rules};
use crate::mode::ChatMode;
use crate::stream::{KeywordRule, StreamClassifier, default_keyword_rules};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of a chat session, loaded from `config.toml`.
///
/// Every field has a default so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Owner of the conversations this session reads and writes
    pub user_id: String,
    /// Language sent to the backend ("es", "en")
    pub language: String,
    /// Mode a fresh session starts in
    pub default_mode: ChatMode,
    /// A stream silent for longer than this is a delivery failure
    pub stream_idle_timeout_ms: u64,
    pub intent_threshold: f64,
    #[serde(rename = "intent_rule")]
    pub intent_rules: Vec<IntentRule>,
    #[serde(rename = "classifier_keyword")]
    pub classifier_keywords: Vec<KeywordRule>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            language: "es".to_string(),
            default_mode: ChatMode::Legacy,
            stream_idle_timeout_ms: 60_000,
            intent_threshold: DEFAULT_INTENT_THRESHOLD,
            intent_rules: default_intent_rules(),
            classifier_keywords: default_keyword_rules(),
        }
    }
}

impl SessionConfig {
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_idle_timeout_ms)
    }

    pub fn intent_detector(&self) -> IntentDetector {
        IntentDetector::new(self.intent_rules.clone(), self.intent_threshold)
    }

    pub fn classifier(&self) -> StreamClassifier {
        StreamClassifier::with_keywords(&self.classifier_keywords)
    }
}
