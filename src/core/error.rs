//! Error types for the comm-word kernel

use thiserror::Error;

/// Which side of the kernel a feature set is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Lhs => write!(f, "lhs"),
            Side::Rhs => write!(f, "rhs"),
        }
    }
}

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Invalid {side} index: {index} (bound vectors: {len})")]
    InvalidIndex { side: Side, index: usize, len: usize },

    #[error("Kernel not initialized: {0}")]
    Uninitialized(String),

    #[error("No feature set bound on {0} side")]
    NotBound(Side),

    #[error("Allocation of {0} entries failed")]
    Allocation(usize),

    #[error("Failed to fetch feature vector: {0}")]
    FeatureFetch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid init data: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
