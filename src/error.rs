use std::fmt::Display;

/// Which identifier space a rejected ID belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    User,
    Item,
}

impl Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::User => write!(f, "user"),
            IdKind::Item => write!(f, "item"),
        }
    }
}

/// Engine-level errors
///
/// An empty recommendation list is not represented here: it is a normal
/// `Ok` outcome that callers use to cascade to their own fallbacks.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Invalid {kind} identifier: {value}")]
    InvalidIdentifier { kind: IdKind, value: i64 },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned by `InteractionSource` implementations when the source of
    /// truth cannot be read at all; single bad rows are skipped instead.
    #[error("Interaction source error: {0}")]
    Source(String),
}

impl GraphError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        GraphError::CorruptSnapshot(reason.into())
    }

    /// True for failures the caller should treat as "no snapshot available"
    pub fn is_corrupt_snapshot(&self) -> bool {
        matches!(self, GraphError::CorruptSnapshot(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
