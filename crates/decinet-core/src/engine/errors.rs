//! Error types for network compilation and inference.

use thiserror::Error;

/// Errors that can occur while compiling a network, manipulating factors,
/// eliminating variables, or deriving decision policies.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Three families are distinguished:
/// - definition errors (unknown names, cycles, bad tables) surface at compile
///   or solve time and describe what the caller got wrong;
/// - invariant violations (`Internal`) mean a factor was handed an axis or
///   coordinate it does not have. They abort the operation;
/// - `NoSolution` means a decision could not be given a policy.
///
/// A failed solve never yields a partial result.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    /// A factor table does not hold exactly one cell per joint outcome.
    #[error("size mismatch: expected {expected} cells, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A definition or query references a variable that was never declared.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Evidence or a lookup names an outcome the variable does not have.
    #[error("unknown outcome '{outcome}' for variable '{variable}'")]
    UnknownOutcome { variable: String, outcome: String },

    /// A variable name or caller-supplied identity is already taken.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// A node kind string other than chance, decision or utility.
    #[error("unsupported node kind '{0}'")]
    UnsupportedKind(String),

    /// The parent graph is not a DAG.
    #[error("graph has cycles")]
    CyclicGraph,

    /// Any other malformed network or query definition.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Non-finite or otherwise unusable numeric configuration.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A decision has no factor from which a policy can be derived.
    #[error("no solution: {0}")]
    NoSolution(String),

    /// Invariant violation (programmer or compiler defect, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl InferenceError {
    /// Returns true for errors caused by the network or query definition
    /// rather than by a broken invariant inside the engine.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. }
                | Self::UnknownVariable(_)
                | Self::UnknownOutcome { .. }
                | Self::DuplicateVariable(_)
                | Self::UnsupportedKind(_)
                | Self::CyclicGraph
                | Self::ValidationError(_)
        )
    }
}
