//! Keyword intent detection for smart suggestions.
//!
//! Each rule scores `matched_keywords / total_keywords * base_weight` against
//! the lowercased input. The best score at or above the threshold becomes a
//! suggestion; suggestions are never dispatched without user confirmation.

use super::model::MervinAction;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INTENT_THRESHOLD: f64 = 0.6;

/// Weighted keyword list for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    pub action: MervinAction,
    pub keywords: Vec<String>,
    #[serde(default = "default_base_weight")]
    pub base_weight: f64,
}

fn default_base_weight() -> f64 {
    1.0
}

impl IntentRule {
    pub fn new(action: MervinAction, keywords: &[&str], base_weight: f64) -> Self {
        Self {
            action,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            base_weight,
        }
    }

    fn score(&self, lowered: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let matched = self
            .keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .count();
        matched as f64 / self.keywords.len() as f64 * self.base_weight
    }
}

/// Default rule table. Spanish and English vocabularies are separate rules so
/// one language does not dilute the other's ratio.
pub fn default_intent_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(MervinAction::Estimate, &["estimate", "quote", "cost"], 1.0),
        IntentRule::new(
            MervinAction::Estimate,
            &["estimado", "presupuesto", "cotización"],
            1.0,
        ),
        IntentRule::new(MervinAction::Contract, &["contract", "agreement", "sign"], 1.0),
        IntentRule::new(MervinAction::Contract, &["contrato", "acuerdo", "firmar"], 1.0),
        IntentRule::new(MervinAction::Permit, &["permit", "city", "inspection"], 1.0),
        IntentRule::new(MervinAction::Permit, &["permiso", "ciudad", "inspección"], 1.0),
        IntentRule::new(MervinAction::Property, &["property", "owner", "deed"], 1.0),
        IntentRule::new(MervinAction::Property, &["propiedad", "dueño", "escritura"], 1.0),
        IntentRule::new(MervinAction::Materials, &["materials", "inventory", "stock"], 0.9),
        IntentRule::new(MervinAction::Materials, &["materiales", "inventario"], 0.9),
    ]
}

/// A detected, not yet confirmed, action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSuggestion {
    pub action: MervinAction,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct IntentDetector {
    rules: Vec<IntentRule>,
    threshold: f64,
}

impl IntentDetector {
    /// Keywords are lowercased here so configured rules may use any case.
    pub fn new(mut rules: Vec<IntentRule>, threshold: f64) -> Self {
        for rule in &mut rules {
            for keyword in &mut rule.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        Self { rules, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the highest-scoring suggestion at or above the threshold.
    ///
    /// Ties keep the earlier rule.
    pub fn detect(&self, text: &str) -> Option<IntentSuggestion> {
        let lowered = text.to_lowercase();
        let mut best: Option<IntentSuggestion> = None;

        for rule in &self.rules {
            let confidence = rule.score(&lowered);
            if confidence < self.threshold {
                continue;
            }
            if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                best = Some(IntentSuggestion {
                    action: rule.action,
                    confidence,
                });
            }
        }

        best
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new(default_intent_rules(), DEFAULT_INTENT_THRESHOLD)
    }
}
