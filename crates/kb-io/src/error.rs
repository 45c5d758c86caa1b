use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown file format '{0}' (expected 'text' or 'bin')")]
    UnknownFormat(String),
    #[error("line {line}: cannot parse '{token}' as {expected}")]
    Parse {
        line: usize,
        token: String,
        expected: &'static str,
    },
    #[error("unexpected end of input: expected {expected} values, found {found}")]
    UnexpectedEof { expected: usize, found: usize },
    #[error("dimensions must be non-zero, got {0:?}")]
    EmptyDimensions(Vec<u64>),
    #[error("dimensions {0:?} are too large for this platform")]
    Overflow(Vec<u64>),
    #[error("payload truncated: expected {expected} bytes, file has {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("tensor error: {0}")]
    Tensor(#[from] kb_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, LoadError>;
