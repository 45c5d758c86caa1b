use std::process::ExitCode;

use kb_io::LoadError;
use kb_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--threads must be >= 1, got {0}")]
    Threads(i32),
    #[error("--repeat must be >= 1, got {0}")]
    Repeat(i32),
    #[error("{name} must be >= 1")]
    EmptyShape { name: &'static str },
    #[error("{rows}x{cols} matrix is too large to allocate")]
    TooLarge { rows: usize, cols: usize },
}

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("[{op}] failed to load {what}: {source}")]
    Load {
        op: &'static str,
        what: String,
        #[source]
        source: LoadError,
    },
    #[error("[{op}] {source}")]
    Kernel {
        op: &'static str,
        #[source]
        source: TensorError,
    },
    #[error("[{op}] interrupted")]
    Interrupted { op: &'static str },
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl BenchError {
    /// Wrap a kernel error, keeping interruptions distinguishable.
    pub fn kernel(op: &'static str, source: TensorError) -> Self {
        if source.is_interrupted() {
            BenchError::Interrupted { op }
        } else {
            BenchError::Kernel { op, source }
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, BenchError::Interrupted { .. })
    }
}

/// Process exit status of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    Interrupted,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Failed => 1,
            Status::Interrupted => 2,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}
