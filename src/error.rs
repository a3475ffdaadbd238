// 🚨 Error Types - Contract and configuration failures
// Data absence is never an error here; it drives classification instead.

use thiserror::Error;

/// Failures raised by the matching and comparison engines.
///
/// Two families live here:
/// - contract violations (duplicate keys, malformed pairs) raised while
///   building inputs or pairs
/// - configuration errors raised by `validate()` before any matching runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    // ------------------------------------------------------------------------
    // Contract violations
    // ------------------------------------------------------------------------
    /// Two model elements share the same non-empty global id.
    #[error("duplicate model element global id: {0}")]
    DuplicateModelId(String),

    /// Two budget items share the same non-empty code.
    #[error("duplicate budget item code: {0}")]
    DuplicateBudgetCode(String),

    /// A pair with neither a model element nor a budget item.
    #[error("matched pair has neither a model element nor a budget item")]
    EmptyPair,

    /// Status and populated sides disagree (e.g. MATCHED with one side missing).
    #[error("inconsistent pair: status {status} with model={has_model}, budget={has_budget}")]
    InconsistentPair {
        status: String,
        has_model: bool,
        has_budget: bool,
    },

    /// Confidence outside [0, 1] (or NaN).
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    // ------------------------------------------------------------------------
    // Configuration errors
    // ------------------------------------------------------------------------
    /// Tolerance is negative, NaN or infinite.
    #[error("tolerance must be a finite value >= 0, got {0}")]
    InvalidTolerance(f64),

    /// A similarity threshold outside [0, 1].
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("unknown attribute set '{0}' (expected 'spatial' or 'full')")]
    UnknownAttributeSet(String),

    #[error("unknown phase '{0}' (expected 'quick' or 'full')")]
    UnknownPhase(String),
}

pub type ReconResult<T> = Result<T, ReconError>;
