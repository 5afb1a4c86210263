use crate::types::{Algorithm, CollectiveKind, DataType, Rank, ReduceOp};

pub type Result<T> = std::result::Result<T, CollectiveError>;

/// Broad class of a [`CollectiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unresolvable collective/type/algorithm selection, raised before any
    /// network activity.
    Configuration,
    /// Operation driven out of order, or fed a buffer that does not match.
    Usage,
    /// Invalid process context, group or root.
    Validation,
    /// Failure reported by the point-to-point layer.
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectiveError {
    #[error("no {kind} algorithm `{algorithm}` registered for dtype {dtype}")]
    UnknownAlgorithm {
        kind: CollectiveKind,
        dtype: DataType,
        algorithm: Algorithm,
    },

    #[error("unknown algorithm name `{0}`")]
    UnknownAlgorithmName(String),

    #[error("unknown data type `{0}`")]
    UnknownDataType(String),

    #[error("unknown reduction operator `{0}`")]
    UnknownReduceOp(String),

    #[error("reduction operator {op} is not defined for dtype {dtype}")]
    IncompatibleReduceOp { op: ReduceOp, dtype: DataType },

    #[error("algorithm registry already initialized")]
    RegistryInitialized,

    #[error("{algorithm} cannot run {kind} parameters")]
    ParamsMismatch {
        algorithm: &'static str,
        kind: CollectiveKind,
    },

    #[error("{operation} already started")]
    AlreadyStarted { operation: CollectiveKind },

    #[error("{operation} already completed; create a new operation per call")]
    AlreadyCompleted { operation: CollectiveKind },

    #[error("{operation} has not been started")]
    NotStarted { operation: CollectiveKind },

    #[error("{operation} requires an input buffer on this rank")]
    MissingInput { operation: CollectiveKind },

    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("element type mismatch: operation uses {expected}, buffer is {actual}")]
    DTypeMismatch { expected: DataType, actual: DataType },

    #[error("{count} elements of {dtype} do not fit in memory")]
    CountOverflow { count: usize, dtype: DataType },

    #[error("operation must be started from within a tokio runtime")]
    NoRuntime,

    #[error("group must contain at least one rank")]
    EmptyGroup,

    #[error("rank {rank} is not a member of group {members:?}")]
    NotAMember { rank: Rank, members: Vec<Rank> },

    #[error("invalid rank {rank}: process count is {size}")]
    InvalidRank { rank: Rank, size: u32 },

    #[error("invalid root {root}: group size is {group_size}")]
    InvalidRoot { root: usize, group_size: usize },

    #[error("invalid peer index {index}: group size is {group_size}")]
    InvalidPeer { index: usize, group_size: usize },

    #[error("process context needs at least one rank")]
    EmptyContext,

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("received {actual} bytes from rank {rank}, expected {expected}")]
    UnexpectedMessageSize {
        rank: Rank,
        expected: usize,
        actual: usize,
    },

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("internal lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl CollectiveError {
    /// Create a `Transport` error with just a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Transport` error with a message and a source error.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectiveError::UnknownAlgorithm { .. }
            | CollectiveError::UnknownAlgorithmName(_)
            | CollectiveError::UnknownDataType(_)
            | CollectiveError::UnknownReduceOp(_)
            | CollectiveError::IncompatibleReduceOp { .. }
            | CollectiveError::RegistryInitialized
            | CollectiveError::ParamsMismatch { .. } => ErrorKind::Configuration,

            CollectiveError::AlreadyStarted { .. }
            | CollectiveError::AlreadyCompleted { .. }
            | CollectiveError::NotStarted { .. }
            | CollectiveError::MissingInput { .. }
            | CollectiveError::BufferSizeMismatch { .. }
            | CollectiveError::DTypeMismatch { .. }
            | CollectiveError::CountOverflow { .. }
            | CollectiveError::NoRuntime => ErrorKind::Usage,

            CollectiveError::EmptyGroup
            | CollectiveError::NotAMember { .. }
            | CollectiveError::InvalidRank { .. }
            | CollectiveError::InvalidRoot { .. }
            | CollectiveError::InvalidPeer { .. }
            | CollectiveError::EmptyContext => ErrorKind::Validation,

            CollectiveError::PeerDisconnected { .. }
            | CollectiveError::CollectiveFailed { .. }
            | CollectiveError::UnexpectedMessageSize { .. }
            | CollectiveError::Transport { .. }
            | CollectiveError::LockPoisoned(_) => ErrorKind::Transport,
        }
    }
}
