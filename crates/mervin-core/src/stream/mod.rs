//! Backend stream types and classification.

mod classifier;
mod update;

pub use classifier::{
    ClassifierRule, KeywordRule, Predicate, StreamClassifier, default_keyword_rules,
};
pub use update::{StreamUpdate, StreamUpdateType, TaskState};
