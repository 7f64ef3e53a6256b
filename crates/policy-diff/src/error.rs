use policy_common::error::CommonError;

use crate::analysis::AnalysisError;

/// Failures that abort a whole comparison. Everything recoverable (a primary analysis
/// failing, a scorer failing, a section with no recognizable entities) is handled inside
/// the engine and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("config error: {0}")]
    Config(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("no analysis backend produced a result for {context}: {source}")]
    AnalysisExhausted {
        context: String,
        #[source]
        source: AnalysisError,
    },

    #[error("comparison cancelled")]
    Cancelled,
}

/// Failure of a pluggable similarity scorer. The generator recovers by scoring lexically.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("score matrix has shape {got:?}, expected {expected:?}")]
    Shape {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
