//! Stream update classification.
//!
//! The backend describes what it is doing in free text ("Buscando precios de
//! materiales..."), sometimes with a structured `phase` tag in the metadata.
//! `StreamClassifier` maps both onto the closed [`TaskState`] set with a
//! priority-ordered rule table evaluated left to right.

use super::update::{StreamUpdate, StreamUpdateType, TaskState};
use serde::{Deserialize, Serialize};

/// Metadata keys inspected for an explicit state tag, in order.
const METADATA_TAG_KEYS: [&str; 2] = ["phase", "state"];

/// Keyword list for one task state, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub state: TaskState,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(state: TaskState, keywords: &[&str]) -> Self {
        Self {
            state,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// English and Spanish progress vocabulary, most specific first.
///
/// Error markers are failure phrases rather than the bare word "error", so
/// "Checking for errors" still reads as verifying.
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            TaskState::Error,
            &["failed", "could not", "unable to", "falló", "no se pudo", "no fue posible"],
        ),
        KeywordRule::new(
            TaskState::Verifying,
            &["verifying", "checking", "validating", "verificando", "validando", "revisando"],
        ),
        KeywordRule::new(
            TaskState::Searching,
            &["searching", "looking up", "fetching", "buscando", "consultando"],
        ),
        KeywordRule::new(
            TaskState::Analyzing,
            &["analyzing", "analysing", "processing", "analizando", "procesando"],
        ),
        KeywordRule::new(
            TaskState::Generating,
            &[
                "generating",
                "writing",
                "drafting",
                "creating",
                "generando",
                "creando",
                "redactando",
                "preparando",
            ],
        ),
    ]
}

/// Condition half of a classifier rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The update has exactly this type.
    UpdateType(StreamUpdateType),
    /// `metadata.phase` (or `metadata.state`) names this state.
    MetadataTag(TaskState),
    /// A progress update whose text contains any of these lowercase substrings.
    ProgressContains(Vec<String>),
}

impl Predicate {
    fn matches(&self, update: &StreamUpdate, lowered: &str) -> bool {
        match self {
            Predicate::UpdateType(kind) => update.update_type == *kind,
            Predicate::MetadataTag(state) => METADATA_TAG_KEYS
                .iter()
                .filter_map(|key| update.metadata_str(key))
                .any(|tag| TaskState::from_tag(tag) == Some(*state)),
            Predicate::ProgressContains(keywords) => {
                update.update_type == StreamUpdateType::Progress
                    && keywords.iter().any(|k| lowered.contains(k.as_str()))
            }
        }
    }
}

/// A `(predicate, state)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRule {
    pub predicate: Predicate,
    pub state: TaskState,
}

/// Rule-table classifier from stream updates to task states.
#[derive(Debug, Clone)]
pub struct StreamClassifier {
    rules: Vec<ClassifierRule>,
}

impl StreamClassifier {
    /// Builds a classifier from an explicit rule table.
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Builds the standard table around the given keyword rules.
    ///
    /// Order: explicit error, explicit complete, metadata tags, keywords,
    /// then message chunks count as generating.
    pub fn with_keywords(keyword_rules: &[KeywordRule]) -> Self {
        let mut rules = vec![
            ClassifierRule {
                predicate: Predicate::UpdateType(StreamUpdateType::Error),
                state: TaskState::Error,
            },
            ClassifierRule {
                predicate: Predicate::UpdateType(StreamUpdateType::Complete),
                state: TaskState::Complete,
            },
        ];

        rules.extend(TaskState::ALL.into_iter().map(|state| ClassifierRule {
            predicate: Predicate::MetadataTag(state),
            state,
        }));

        rules.extend(keyword_rules.iter().map(|rule| ClassifierRule {
            predicate: Predicate::ProgressContains(
                rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            ),
            state: rule.state,
        }));

        rules.push(ClassifierRule {
            predicate: Predicate::UpdateType(StreamUpdateType::Message),
            state: TaskState::Generating,
        });

        Self::new(rules)
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Classifies one update given the previously shown state.
    ///
    /// Uninformative updates keep `previous` so the indicator does not
    /// flicker. A terminal `previous` falls back to the generic working state
    /// (`analyzing`), since new activity means the task is running again.
    pub fn classify(&self, update: &StreamUpdate, previous: TaskState) -> TaskState {
        let lowered = update.content.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(update, &lowered))
            .map(|rule| rule.state)
            .unwrap_or(if previous.is_terminal() {
                TaskState::Analyzing
            } else {
                previous
            })
    }
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::with_keywords(&default_keyword_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(update: StreamUpdate, previous: TaskState) -> TaskState {
        StreamClassifier::default().classify(&update, previous)
    }

    #[test]
    fn test_explicit_types_take_precedence() {
        let update = StreamUpdate::error("Buscando de nuevo").with_metadata(json!({"phase": "searching"}));
        assert_eq!(classify(update, TaskState::Generating), TaskState::Error);

        let update = StreamUpdate::complete("Listo, verificando nada más");
        assert_eq!(classify(update, TaskState::Verifying), TaskState::Complete);
    }

    #[test]
    fn test_metadata_tag_beats_keywords() {
        let update = StreamUpdate::progress("Buscando precios").with_metadata(json!({"phase": "verifying"}));
        assert_eq!(classify(update, TaskState::Analyzing), TaskState::Verifying);

        let update = StreamUpdate::progress("...").with_metadata(json!({"state": "Generating"}));
        assert_eq!(classify(update, TaskState::Analyzing), TaskState::Generating);
    }

    #[test]
    fn test_spanish_and_english_keywords() {
        assert_eq!(
            classify(StreamUpdate::progress("Buscando materiales en Home Depot"), TaskState::Analyzing),
            TaskState::Searching
        );
        assert_eq!(
            classify(StreamUpdate::progress("GENERATING your estimate"), TaskState::Searching),
            TaskState::Generating
        );
        assert_eq!(
            classify(StreamUpdate::progress("Verificando cálculos"), TaskState::Generating),
            TaskState::Verifying
        );
        assert_eq!(
            classify(StreamUpdate::progress("No se pudo conectar"), TaskState::Searching),
            TaskState::Error
        );
    }

    #[test]
    fn test_error_word_in_activity_is_not_a_failure() {
        assert_eq!(
            classify(StreamUpdate::progress("Checking for errors in your takeoff"), TaskState::Analyzing),
            TaskState::Verifying
        );
        assert_eq!(
            classify(StreamUpdate::progress("Verificando que no haya errores"), TaskState::Analyzing),
            TaskState::Verifying
        );
        assert_eq!(
            classify(StreamUpdate::progress("Failed to reach the supplier"), TaskState::Searching),
            TaskState::Error
        );
    }

    #[test]
    fn test_uninformative_progress_retains_previous() {
        let update = StreamUpdate::progress("Un momento...");
        assert_eq!(classify(update.clone(), TaskState::Searching), TaskState::Searching);
        assert_eq!(classify(update, TaskState::Verifying), TaskState::Verifying);
    }

    #[test]
    fn test_terminal_previous_degrades_to_working_state() {
        let update = StreamUpdate::progress("...");
        assert_eq!(classify(update.clone(), TaskState::Complete), TaskState::Analyzing);
        assert_eq!(classify(update, TaskState::Error), TaskState::Analyzing);
    }

    #[test]
    fn test_message_chunk_is_generating_even_with_error_word() {
        let update = StreamUpdate::message("The error in your framing estimate is...");
        assert_eq!(classify(update, TaskState::Searching), TaskState::Generating);
    }

    #[test]
    fn test_custom_keyword_table() {
        let classifier = StreamClassifier::with_keywords(&[KeywordRule::new(
            TaskState::Searching,
            &["Rastreando"],
        )]);
        let state = classifier.classify(&StreamUpdate::progress("rastreando proveedores"), TaskState::Analyzing);
        assert_eq!(state, TaskState::Searching);
    }
}
