use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use widetable_core::{
    Error as CoreError,
    error::ErrorOrigin as CoreErrorOrigin,
    mutation::MutationError,
    query::QuerySynthesisError,
    shard::ShardError,
};

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether part of a flush was applied before the failure.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self.kind, ErrorKind::Mutation(MutationErrorKind::PartialFlush))
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        let origin = err.origin().into();
        let message = err.to_string();

        let kind = match &err {
            CoreError::Config(_) => ErrorKind::Config,
            CoreError::Engine(_) => ErrorKind::Engine,
            CoreError::Flush(_) => ErrorKind::Mutation(MutationErrorKind::PartialFlush),
            CoreError::Mutation(MutationError::ColumnCollision { .. }) => {
                ErrorKind::Mutation(MutationErrorKind::Conflict)
            }
            CoreError::Mutation(MutationError::ProtectedColumn { .. }) => {
                ErrorKind::Mutation(MutationErrorKind::Protected)
            }
            CoreError::Mutation(MutationError::UnknownColumn { .. }) => {
                ErrorKind::Mutation(MutationErrorKind::NotFound)
            }
            CoreError::QuerySynthesis(err) => ErrorKind::Query(match err {
                QuerySynthesisError::EmptyColumnSet => QueryErrorKind::EmptyColumnSet,
                QuerySynthesisError::NoPrimaryKey => QueryErrorKind::NoPrimaryKey,
                QuerySynthesisError::UnknownColumn(_) => QueryErrorKind::UnknownColumn,
            }),
            CoreError::Shard(err) => ErrorKind::Shard(match err {
                ShardError::Creation { .. } => ShardErrorKind::Creation,
                ShardError::Full { .. } => ShardErrorKind::Full,
                ShardError::Unknown(_) => ShardErrorKind::NotFound,
            }),
        };

        Self::new(kind, origin, message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Configuration failed to load or validate.
    Config,

    /// The engine rejected a statement outside any flush.
    Engine,

    Mutation(MutationErrorKind),
    Query(QueryErrorKind),
    Shard(ShardErrorKind),
}

///
/// MutationErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MutationErrorKind {
    /// An add targets a column that exists and may not be dropped first.
    Conflict,

    /// Primary-key columns cannot be added or dropped.
    Protected,

    /// A drop names a column that is neither registered nor queued.
    NotFound,

    /// A flush stopped partway; earlier shards stay applied and the failed
    /// shard's queue is kept for a retry.
    PartialFlush,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    EmptyColumnSet,
    NoPrimaryKey,
    UnknownColumn,
}

///
/// ShardErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ShardErrorKind {
    /// Cloning the base table into a new shard failed.
    Creation,

    /// The shard reached the column ceiling.
    Full,

    NotFound,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Engine,
    Mutation,
    Query,
    Shard,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Engine => Self::Engine,
            CoreErrorOrigin::Mutation => Self::Mutation,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Shard => Self::Shard,
        }
    }
}
