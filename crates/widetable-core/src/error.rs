use crate::{
    config::ConfigError,
    engine::EngineError,
    mutation::{FlushError, MutationError},
    query::QuerySynthesisError,
    shard::ShardError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Runtime error for every fallible table operation.
/// Each variant wraps the structured error of the component that failed.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    QuerySynthesis(#[from] QuerySynthesisError),

    #[error(transparent)]
    Shard(#[from] ShardError),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::Invalid,
            Self::Engine(_) => ErrorClass::Engine,
            Self::Flush(_) => ErrorClass::PartialMutation,
            Self::Mutation(err) => err.class(),
            Self::QuerySynthesis(_) => ErrorClass::Invalid,
            Self::Shard(err) => err.class(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Config(_) => ErrorOrigin::Config,
            Self::Engine(_) => ErrorOrigin::Engine,
            Self::Flush(_) | Self::Mutation(_) => ErrorOrigin::Mutation,
            Self::QuerySynthesis(_) => ErrorOrigin::Query,
            Self::Shard(_) => ErrorOrigin::Shard,
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Two column definitions claim the same (shard, name).
    Conflict,
    /// The collaborator engine rejected a statement.
    Engine,
    /// The request is malformed for the current table state.
    Invalid,
    /// A shard has no room for the requested column.
    Exhausted,
    /// Some shards of a flush were applied and some were not.
    PartialMutation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Engine => "engine",
            Self::Invalid => "invalid",
            Self::Exhausted => "exhausted",
            Self::PartialMutation => "partial_mutation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Engine,
    Mutation,
    Query,
    Shard,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Engine => "engine",
            Self::Mutation => "mutation",
            Self::Query => "query",
            Self::Shard => "shard",
        };
        write!(f, "{label}")
    }
}
