use crate::{
    Error,
    column::{ColumnKey, ColumnMetadata},
    engine::{Engine, EngineError, RowSet, execute_traced},
    mutation::{FlushReport, MutationError, PendingAdd, PendingMutation, column_exists},
    query::QuerySynthesizer,
    sql::Statement,
    table::LogicalTable,
    types::ColumnType,
    value::Value,
};
use std::collections::BTreeMap;
use tracing::debug;

///
/// TableSession
///
/// A logical table paired with a caller-owned engine. Sessions are cheap;
/// open one per unit of work and drop it to release both borrows.
///

pub struct TableSession<'a, E: Engine + ?Sized> {
    table: &'a mut LogicalTable,
    engine: &'a mut E,
}

impl<'a, E: Engine + ?Sized> TableSession<'a, E> {
    pub(crate) const fn new(table: &'a mut LogicalTable, engine: &'a mut E) -> Self {
        Self { table, engine }
    }

    #[must_use]
    pub fn table(&self) -> &LogicalTable {
        self.table
    }

    //
    // Mutations
    //

    /// Allocate a generated column in the active shard and queue its add.
    ///
    /// May create a new shard (issuing DDL) even when `flush` is false.
    pub fn create_column(
        &mut self,
        column_type: ColumnType,
        metadata: ColumnMetadata,
        flush: bool,
        drop_if_exists: bool,
    ) -> Result<ColumnKey, Error> {
        let slot = self.table.allocator.allocate_slot(&mut *self.engine)?;
        debug!(column = %slot.key, column_type = %column_type, "queued column add");

        self.table.pending.queue_add(
            &slot.key.shard,
            PendingAdd {
                name: slot.key.name.clone(),
                column_type,
                metadata,
                ordinal: slot.ordinal,
            },
        );
        if flush {
            self.flush(drop_if_exists)?;
        }

        Ok(slot.key)
    }

    /// Queue an add under a caller-chosen name in an existing shard.
    ///
    /// Re-adding a name that is registered or already queued keeps its
    /// ordinal; a new name is counted against the shard's ceiling. Without
    /// `drop_if_exists`, a name that already exists in the shard (and is not
    /// queued for a drop) is rejected before anything is queued.
    pub fn create_column_at(
        &mut self,
        key: ColumnKey,
        column_type: ColumnType,
        metadata: ColumnMetadata,
        flush: bool,
        drop_if_exists: bool,
    ) -> Result<ColumnKey, Error> {
        if self.table.is_primary_key(&key.name) {
            return Err(MutationError::ProtectedColumn {
                shard: key.shard,
                column: key.name,
            }
            .into());
        }

        let dropping = self
            .table
            .pending
            .queue(&key.shard)
            .is_some_and(|queue| queue.is_dropping(&key.name));
        if !drop_if_exists
            && !dropping
            && column_exists(
                &self.table.registry,
                &self.table.allocator,
                &key.shard,
                &key.name,
            )
        {
            return Err(MutationError::ColumnCollision {
                shard: key.shard,
                column: key.name,
            }
            .into());
        }

        let known = self
            .table
            .registry
            .get(&key)
            .map(|column| column.ordinal)
            .or_else(|| {
                self.table.pending.queue(&key.shard).and_then(|queue| {
                    queue
                        .adds()
                        .iter()
                        .find(|add| add.name == key.name)
                        .map(|add| add.ordinal)
                })
            });
        let ordinal = match known {
            Some(ordinal) => ordinal,
            None => self.table.allocator.reserve(&key.shard)?,
        };
        debug!(column = %key, column_type = %column_type, "queued column add");

        self.table.pending.queue_add(
            &key.shard,
            PendingAdd {
                name: key.name.clone(),
                column_type,
                metadata,
                ordinal,
            },
        );
        if flush {
            self.flush(drop_if_exists)?;
        }

        Ok(key)
    }

    /// Queue a drop of a registered column. A queued add of the same name
    /// is discarded first; dropping a name that was only queued just
    /// discards it. A flush triggered here uses the configured
    /// `drop_if_exists` policy.
    pub fn drop_column(&mut self, key: &ColumnKey, flush: bool) -> Result<(), Error> {
        if self.table.is_primary_key(&key.name) {
            return Err(MutationError::ProtectedColumn {
                shard: key.shard.clone(),
                column: key.name.clone(),
            }
            .into());
        }

        let registered = self.table.registry.get(key).is_some();
        let discarded = self.table.pending.discard_add(&key.shard, &key.name);
        if !registered && discarded.is_none() {
            return Err(MutationError::UnknownColumn {
                shard: key.shard.clone(),
                column: key.name.clone(),
            }
            .into());
        }

        if registered {
            debug!(column = %key, "queued column drop");
            self.table.pending.queue_drop(&key.shard, key.name.clone());
        } else {
            debug!(column = %key, "discarded queued column add");
        }

        if flush {
            let drop_if_exists = self.table.config.drop_if_exists;
            self.flush(drop_if_exists)?;
        }

        Ok(())
    }

    /// Forget queued work for one column. Returns whether anything was
    /// queued. The column's allocated ordinal is not given back.
    pub fn cancel(&mut self, key: &ColumnKey) -> bool {
        let cancelled = self.table.pending.cancel(&key.shard, &key.name);
        if cancelled {
            debug!(column = %key, "cancelled queued mutations");
        }

        cancelled
    }

    /// Forget all queued work, returning what was pending per shard.
    pub fn discard_pending(&mut self) -> BTreeMap<String, PendingMutation> {
        let discarded = self.table.pending.discard();
        if !discarded.is_empty() {
            debug!(shards = discarded.len(), "discarded pending mutations");
        }

        discarded
    }

    /// Apply every pending mutation. See [`crate::mutation`] for the
    /// failure contract.
    pub fn flush(&mut self, drop_if_exists: bool) -> Result<FlushReport, Error> {
        let table = &mut *self.table;

        table.pending.flush(
            &mut *self.engine,
            &mut table.registry,
            &mut table.allocator,
            drop_if_exists,
        )
    }

    /// Create an empty shard without activating it. Returns its name.
    pub fn new_shard(&mut self) -> Result<String, Error> {
        let shard = self.table.allocator.new_shard(&mut *self.engine)?;

        Ok(shard.name().to_string())
    }

    //
    // Reads
    //

    /// One row per logical row, ordered by primary key. `None` reads every
    /// registered column.
    pub fn rows(&mut self, columns: Option<&[ColumnKey]>) -> Result<RowSet, Error> {
        let select = self.table.build_select(columns)?;

        Ok(execute_traced(&mut *self.engine, &Statement::Select(select))?)
    }

    /// [`Self::rows`] keyed by physical column name. When two requested
    /// columns share a name, the later one wins.
    pub fn rows_as_mappings(
        &mut self,
        columns: Option<&[ColumnKey]>,
    ) -> Result<Vec<BTreeMap<String, Value>>, Error> {
        let RowSet { columns: names, rows } = self.rows(columns)?;

        Ok(rows
            .into_iter()
            .map(|row| names.iter().cloned().zip(row).collect())
            .collect())
    }

    /// Distinct non-null value counts, in request order.
    pub fn num_distinct(
        &mut self,
        columns: Option<&[ColumnKey]>,
    ) -> Result<Vec<(ColumnKey, u64)>, Error> {
        let count = QuerySynthesizer::new(&self.table.registry).count_distinct(columns)?;
        let result = execute_traced(&mut *self.engine, &Statement::CountDistinct(count.clone()))?;
        let row = result
            .rows
            .first()
            .ok_or_else(|| EngineError::new("COUNT(DISTINCT) returned no rows"))?;

        count
            .columns
            .into_iter()
            .zip(row)
            .map(|(key, value)| -> Result<(ColumnKey, u64), Error> {
                let n = value
                    .as_int()
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        EngineError::new(format!("distinct count for '{key}' is not a count"))
                    })?;

                Ok((key, n))
            })
            .collect()
    }
}
