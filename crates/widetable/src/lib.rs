//! ## Crate layout
//! - `core`: registry, shard allocation, mutation batching, query synthesis,
//!   the engine contract and the in-memory engine.
//! - `error`: the stable public error taxonomy.
//!
//! Most callers only need the `prelude` plus an [`Engine`](core::engine::Engine)
//! implementation.

pub use widetable_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{
    MAX_COLS_TABLE,
    config::WideTableConfig,
    engine::{Engine, MemoryEngine},
    table::{LogicalTable, TableSession},
};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        core::{
            column::{Column, ColumnKey, ColumnMetadata},
            config::WideTableConfig,
            engine::{Engine, RowSet},
            registry::ColumnFilter,
            table::{LogicalTable, TableSession},
            types::{ColumnKind, ColumnType},
            value::Value,
        },
    };
}
