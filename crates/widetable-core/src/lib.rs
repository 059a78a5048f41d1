//! Core runtime for WideTable: the column registry, shard allocator,
//! mutation batching, query synthesis, and the engine contract they share.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod mutation;
pub mod query;
pub mod registry;
pub mod shard;
pub mod sql;
pub mod table;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;

///
/// CONSTANTS
///

/// Default ceiling of allocated columns per shard table.
pub const MAX_COLS_TABLE: usize = 100;

/// Default physical column limit enforced by [`engine::MemoryEngine`].
///
/// Matches the hard per-table limit of the MySQL family.
pub const ENGINE_MAX_COLUMNS: usize = 4096;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, engines, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        column::{Column, ColumnKey, ColumnMetadata},
        registry::ColumnFilter,
        table::{LogicalTable, TableSession},
        types::{ColumnKind, ColumnType},
        value::Value,
    };
}
