//! Shard placement: which physical table receives the next column, and
//! materializing new shard tables as row-aligned clones of the base table.

#[cfg(test)]
mod tests;

use crate::{
    column::ColumnKey,
    engine::{Engine, EngineError, TableSchema, execute_traced},
    error::ErrorClass,
    sql::Statement,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use tracing::{info, warn};

///
/// ShardError
///

#[derive(Debug, ThisError)]
pub enum ShardError {
    #[error("failed to create shard '{shard}': {source}")]
    Creation {
        shard: String,
        #[source]
        source: EngineError,
    },

    #[error("shard '{shard}' is full ({ceiling} columns)")]
    Full { shard: String, ceiling: usize },

    #[error("unknown shard '{0}'")]
    Unknown(String),
}

impl ShardError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Creation { .. } => ErrorClass::Engine,
            Self::Full { .. } => ErrorClass::Exhausted,
            Self::Unknown(_) => ErrorClass::Invalid,
        }
    }
}

///
/// ShardTable
///
/// One physical table. `column_count` counts allocations, not reflected
/// columns: it only grows, so generated names are never reused. The base
/// table starts counting at its reflected width.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ShardTable {
    name: String,
    column_count: usize,
    schema: TableSchema,
    base: bool,
}

impl ShardTable {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    /// Physical schema as of the last reflection.
    #[must_use]
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Whether this is the base table rather than a derived shard.
    #[must_use]
    pub const fn is_base(&self) -> bool {
        self.base
    }

    #[must_use]
    pub const fn is_full(&self, ceiling: usize) -> bool {
        self.column_count >= ceiling
    }
}

///
/// Slot
///
/// Location assigned to a new column plus its allocation index.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub key: ColumnKey,
    pub ordinal: usize,
}

///
/// ShardAllocator
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ShardAllocator {
    logical_name: String,
    max_columns: usize,
    shards: BTreeMap<String, ShardTable>,
    shards_created: u32,
    active: Option<String>,
}

impl ShardAllocator {
    /// Start with only the base table; it is never chosen for allocation.
    #[must_use]
    pub fn new(base: TableSchema, max_columns: usize) -> Self {
        let logical_name = base.name.clone();
        let mut shards = BTreeMap::new();
        shards.insert(
            logical_name.clone(),
            ShardTable {
                name: logical_name.clone(),
                column_count: base.columns.len(),
                schema: base,
                base: true,
            },
        );

        Self {
            logical_name,
            max_columns,
            shards,
            shards_created: 0,
            active: None,
        }
    }

    #[must_use]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    #[must_use]
    pub const fn max_columns(&self) -> usize {
        self.max_columns
    }

    /// All shards, base included, in name order.
    pub fn shards(&self) -> impl Iterator<Item = &ShardTable> {
        self.shards.values()
    }

    #[must_use]
    pub fn shard(&self, name: &str) -> Option<&ShardTable> {
        self.shards.get(name)
    }

    #[must_use]
    pub fn active(&self) -> Option<&ShardTable> {
        self.active.as_deref().and_then(|name| self.shards.get(name))
    }

    /// Clone the base table into a new shard and register it.
    ///
    /// The counter is consumed even on failure, so a retry never reuses the
    /// name of a half-created table.
    pub fn new_shard<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<&ShardTable, ShardError> {
        self.shards_created += 1;
        let name = format!("{}_{}", self.logical_name, self.shards_created);

        let schema = match Self::materialize(engine, &name, &self.logical_name) {
            Ok(schema) => schema,
            Err(source) => {
                warn!(shard = %name, error = %source, "shard creation failed");
                return Err(ShardError::Creation {
                    shard: name,
                    source,
                });
            }
        };

        info!(shard = %name, base = %self.logical_name, "created shard");

        let shard = ShardTable {
            name: name.clone(),
            column_count: 0,
            schema,
            base: false,
        };

        Ok(self.shards.entry(name).or_insert(shard))
    }

    // CREATE LIKE, copy rows, then reflect what the engine built.
    fn materialize<E: Engine + ?Sized>(
        engine: &mut E,
        name: &str,
        base: &str,
    ) -> Result<TableSchema, EngineError> {
        execute_traced(
            engine,
            &Statement::CreateTableLike {
                table: name.to_string(),
                like: base.to_string(),
            },
        )?;
        execute_traced(
            engine,
            &Statement::InsertSelectAll {
                table: name.to_string(),
                source: base.to_string(),
            },
        )?;

        engine.reflect(name)
    }

    /// Pick the shard and generated name for the next new column, creating
    /// and activating a new shard when none is active or the active one is
    /// full.
    pub fn allocate_slot<E: Engine + ?Sized>(&mut self, engine: &mut E) -> Result<Slot, ShardError> {
        let needs_shard = self
            .active()
            .is_none_or(|shard| shard.is_full(self.max_columns));

        if needs_shard {
            let name = self.new_shard(engine)?.name.clone();
            self.active = Some(name);
        }

        let name = self
            .active
            .clone()
            .ok_or_else(|| ShardError::Unknown(self.logical_name.clone()))?;
        let shard = self
            .shards
            .get_mut(&name)
            .ok_or_else(|| ShardError::Unknown(name.clone()))?;

        let index = shard.column_count;
        shard.column_count += 1;

        Ok(Slot {
            key: ColumnKey::new(name.clone(), format!("{name}__{index}")),
            ordinal: index,
        })
    }

    /// Account for a caller-named column in an existing shard.
    ///
    /// Derived shards count it against the ceiling; the base table is not
    /// subject to the ceiling and orders it after its reflected columns.
    pub fn reserve(&mut self, shard: &str) -> Result<usize, ShardError> {
        let max_columns = self.max_columns;
        let table = self
            .shards
            .get_mut(shard)
            .ok_or_else(|| ShardError::Unknown(shard.to_string()))?;

        if !table.base && table.is_full(max_columns) {
            return Err(ShardError::Full {
                shard: shard.to_string(),
                ceiling: max_columns,
            });
        }

        let index = table.column_count;
        table.column_count += 1;

        Ok(index)
    }

    /// Replace a shard's schema snapshot after re-reflection.
    pub(crate) fn refresh_schema(&mut self, schema: TableSchema) {
        if let Some(shard) = self.shards.get_mut(&schema.name) {
            shard.schema = schema;
        }
    }

    /// Drop columns from a shard's snapshot after a successful `DROP`.
    /// The allocation counter is left alone.
    pub(crate) fn forget_columns(&mut self, shard: &str, names: &[String]) {
        if let Some(table) = self.shards.get_mut(shard) {
            table
                .schema
                .columns
                .retain(|c| !names.iter().any(|n| *n == c.name));
        }
    }
}
