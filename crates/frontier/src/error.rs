use std::fmt;
use std::path::PathBuf;

use game::{ErrorClass, GameId, StateId};

/// What a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    State(StateId),
    Root(GameId),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(id) => write!(f, "state {id}"),
            Self::Root(game) => write!(f, "root of game {game}"),
        }
    }
}

/// Errors from frontier operations.
#[derive(Debug, thiserror::Error)]
pub enum FrontierError {
    /// Identity (or, with layout dedup on, content) collision. Callers treat
    /// this as a no-op.
    #[error("state {0} already exists")]
    DuplicateState(StateId),

    #[error("{0} not found")]
    NotFound(Key),

    #[error("store I/O error: {0}")]
    Store(#[from] std::io::Error),

    #[error("corrupt journal {path} at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl FrontierError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateState(_) | Self::NotFound(_) => ErrorClass::Client,
            Self::Store(_) | Self::Corrupt { .. } => ErrorClass::Server,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateState(_))
    }
}
