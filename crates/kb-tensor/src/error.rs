use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("{op}: shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to allocate {count} {what}")]
    AllocationFailure { what: &'static str, count: usize },
    #[error("{op}: interrupted before completion, outputs are incomplete")]
    Interrupted { op: &'static str },
    #[error("{op}: only {spawned} of {requested} workers started, outputs are incomplete")]
    PartialExecution {
        op: &'static str,
        requested: usize,
        spawned: usize,
    },
}

impl TensorError {
    /// Returns true if the error means the call was cut short by cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, TensorError::Interrupted { .. })
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
