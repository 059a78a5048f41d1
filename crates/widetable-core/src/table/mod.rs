//! The user-facing logical table.
//!
//! `LogicalTable` owns all in-memory state (registry, shards, pending
//! mutations) and answers read-only questions. Anything that talks to the
//! engine goes through a [`TableSession`], which borrows the table and a
//! caller-owned engine together.

mod session;

use crate::{
    Error,
    column::{Column, ColumnKey},
    config::WideTableConfig,
    engine::{Engine, EngineError, execute_traced},
    mutation::MutationBatch,
    query::QuerySynthesizer,
    registry::{ColumnFilter, ColumnRegistry},
    shard::{ShardAllocator, ShardTable},
    sql::{SelectStatement, Statement},
    types::ColumnKind,
    value::Value,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use session::TableSession;

///
/// LogicalTable
///
/// One logical table spread over a base table and its derived shards.
/// Serializable; it never holds an engine handle.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LogicalTable {
    name: String,
    primary_key_names: Vec<String>,
    row_count: u64,
    config: WideTableConfig,
    registry: ColumnRegistry,
    allocator: ShardAllocator,
    pending: MutationBatch,
}

impl LogicalTable {
    /// Reflect `base_table`, sample its row count, and register its columns.
    pub fn open<E: Engine + ?Sized>(
        engine: &mut E,
        base_table: &str,
        config: WideTableConfig,
    ) -> Result<Self, Error> {
        config.validate()?;

        let schema = engine.reflect(base_table)?;
        let counted = execute_traced(
            engine,
            &Statement::CountRows {
                table: base_table.to_string(),
            },
        )?;
        let row_count = counted
            .scalar()
            .and_then(Value::as_int)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| EngineError::new(format!("row count of '{base_table}' is not a count")))?;

        let registry = ColumnRegistry::from_base_schema(&schema, &config.numeric_types);
        let primary_key_names = schema.primary_key_names();

        info!(
            table = %base_table,
            columns = schema.columns.len(),
            rows = row_count,
            "opened logical table"
        );

        Ok(Self {
            name: base_table.to_string(),
            primary_key_names,
            row_count,
            allocator: ShardAllocator::new(schema, config.max_columns_per_shard),
            registry,
            config,
            pending: MutationBatch::new(),
        })
    }

    /// Bind the table to an engine for operations that issue statements.
    pub fn session<'a, E: Engine + ?Sized>(&'a mut self, engine: &'a mut E) -> TableSession<'a, E> {
        TableSession::new(self, engine)
    }

    //
    // Accessors
    //

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn primary_key_names(&self) -> &[String] {
        &self.primary_key_names
    }

    /// Row count sampled when the table was opened.
    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.row_count
    }

    #[must_use]
    pub const fn config(&self) -> &WideTableConfig {
        &self.config
    }

    /// Every shard, base table included, in name order.
    pub fn shards(&self) -> impl Iterator<Item = &ShardTable> {
        self.allocator.shards()
    }

    /// The shard currently receiving new columns, if one exists yet.
    #[must_use]
    pub fn active_shard(&self) -> Option<&ShardTable> {
        self.allocator.active()
    }

    #[must_use]
    pub const fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn pending(&self) -> &MutationBatch {
        &self.pending
    }

    //
    // Column lookups
    //

    #[must_use]
    pub fn columns(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.registry.query(filter)
    }

    /// See [`ColumnRegistry::by_name`] for the tie-break across shards.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.registry.by_name(name)
    }

    #[must_use]
    pub fn names_to_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<Option<&Column>> {
        self.registry.names_to_columns(names)
    }

    #[must_use]
    pub fn columns_of_type(&self, kinds: &[ColumnKind], filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.registry.columns_of_type(kinds, filter)
    }

    #[must_use]
    pub fn numeric_columns(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.registry.numeric_columns(filter)
    }

    #[must_use]
    pub fn categorical_columns(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.registry.categorical_columns(filter)
    }

    #[must_use]
    pub fn has_column(&self, shard: &str, name: &str) -> bool {
        self.registry.exists(shard, name)
    }

    //
    // Query synthesis
    //

    pub fn build_select(&self, columns: Option<&[ColumnKey]>) -> Result<SelectStatement, Error> {
        Ok(QuerySynthesizer::new(&self.registry).select(columns)?)
    }

    pub fn build_select_sql(&self, columns: Option<&[ColumnKey]>) -> Result<String, Error> {
        self.build_select(columns).map(|select| select.to_string())
    }

    fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key_names.iter().any(|pk| pk == name)
    }
}
