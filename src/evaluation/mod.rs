//! Evaluation support: fingerprints, candidate selection and the default
//! rule evaluator.
//!
//! The gateway's job is choosing *which* features to evaluate or ship;
//! computing variations is delegated to an [`Evaluator`](crate::traits::Evaluator),
//! with [`DefaultEvaluator`] as the built-in implementation.

mod engine;
pub mod fingerprint;
pub mod selection;

pub use engine::{DefaultEvaluator, topological_sort};
pub use fingerprint::{NO_EVALUATIONS, features_id, user_evaluations_id};
pub use selection::{CLOCK_SKEW_SECS, RETENTION_WINDOW_SECS};

/// Evaluator failures. The gateway reports all of them as internal errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("evaluator: default strategy not found for {0}")]
    DefaultStrategyNotFound(String),

    #[error("evaluator: variation not found for {0}")]
    VariationNotFound(String),

    #[error("evaluator: prerequisite variation not found: {0}")]
    PrerequisiteVariationNotFound(String),

    #[error("evaluator: dependency cycle through {0}")]
    CycleDetected(String),
}
