use crate::{
    Error,
    column::{Column, ColumnKey},
    engine::{Engine, execute_traced},
    mutation::{FlushError, FlushPhase, MutationBatch, MutationError, PendingAdd},
    registry::ColumnRegistry,
    shard::ShardAllocator,
    sql::{AlterOp, AlterTable, Statement},
    types::ColumnType,
};
use tracing::{info, warn};

///
/// FlushReport
///
/// What one flush applied.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlushReport {
    pub statements: usize,
    pub dropped: usize,
    pub added: usize,
}

impl FlushReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.statements == 0
    }
}

impl MutationBatch {
    /// Apply every pending mutation.
    ///
    /// Phase 1 queues a drop for each pending add that already exists (when
    /// `drop_if_exists`), phase 2 drops, phase 3 adds and re-reflects. With
    /// `drop_if_exists` off, an existing add target fails the whole flush
    /// before any statement is issued, and the colliding adds are removed
    /// from the queue.
    pub fn flush<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        registry: &mut ColumnRegistry,
        allocator: &mut ShardAllocator,
        drop_if_exists: bool,
    ) -> Result<FlushReport, Error> {
        if self.is_empty() {
            return Ok(FlushReport::default());
        }

        if drop_if_exists {
            self.reconcile(registry, allocator);
        } else {
            self.reject_collisions(registry, allocator)?;
        }

        let mut report = FlushReport::default();
        let result = self
            .drop_phase(engine, registry, allocator, &mut report)
            .and_then(|()| self.add_phase(engine, registry, allocator, &mut report));

        for queue in self.queues.values_mut() {
            queue.settle();
        }
        self.queues.retain(|_, q| !q.is_empty());

        match result {
            Ok(()) => {
                info!(
                    statements = report.statements,
                    dropped = report.dropped,
                    added = report.added,
                    "flushed pending mutations"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    shard = %err.shard,
                    phase = %err.phase,
                    error = %err.source,
                    "flush stopped"
                );
                Err(err.into())
            }
        }
    }

    // Phase 1: an add whose target already exists drops it first.
    fn reconcile(&mut self, registry: &ColumnRegistry, allocator: &ShardAllocator) {
        for (shard, queue) in &mut self.queues {
            let stale: Vec<String> = queue
                .adds
                .iter()
                .filter(|add| column_exists(registry, allocator, shard, &add.name))
                .map(|add| add.name.clone())
                .collect();

            for name in stale {
                queue.queue_drop(name);
            }
        }
    }

    // Colliding adds are taken out of the queue before the error is raised,
    // so a later flush never applies them under another policy.
    fn reject_collisions(
        &mut self,
        registry: &ColumnRegistry,
        allocator: &ShardAllocator,
    ) -> Result<(), MutationError> {
        let mut first = None;

        for (shard, queue) in &mut self.queues {
            let before = queue.adds.len();
            let mut rejected = Vec::new();
            queue.adds.retain(|add| {
                let collides = column_exists(registry, allocator, shard, &add.name)
                    && !queue.drops.contains(&add.name);
                if collides {
                    rejected.push(add.name.clone());
                }
                !collides
            });
            if queue.adds.len() == before {
                continue;
            }

            queue.settle();
            warn!(shard = %shard, columns = ?rejected, "rejected colliding column adds");
            if first.is_none() {
                first = rejected.into_iter().next().map(|column| (shard.clone(), column));
            }
        }
        self.queues.retain(|_, q| !q.is_empty());

        match first {
            Some((shard, column)) => Err(MutationError::ColumnCollision { shard, column }),
            None => Ok(()),
        }
    }

    // Phase 2: one ALTER ... DROP per shard; registry entries go only after
    // the engine accepted the statement.
    fn drop_phase<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        registry: &mut ColumnRegistry,
        allocator: &mut ShardAllocator,
        report: &mut FlushReport,
    ) -> Result<(), FlushError> {
        for (shard, queue) in &mut self.queues {
            if queue.drops.is_empty() {
                continue;
            }
            queue.begin();

            let statement = Statement::AlterTable(AlterTable {
                table: shard.clone(),
                ops: queue
                    .drops
                    .iter()
                    .map(|name| AlterOp::DropColumn { name: name.clone() })
                    .collect(),
            });
            if let Err(source) = execute_traced(engine, &statement) {
                queue.abort();
                return Err(FlushError {
                    shard: shard.clone(),
                    phase: FlushPhase::Drop,
                    source,
                });
            }

            for name in &queue.drops {
                registry.remove(&ColumnKey::new(shard.clone(), name.clone()));
            }
            allocator.forget_columns(shard, &queue.drops);

            report.statements += 1;
            report.dropped += queue.drops.len();
            queue.drops.clear();
        }

        Ok(())
    }

    // Phase 3: one ALTER ... ADD per shard, then re-reflect and register the
    // queued names with their captured metadata.
    fn add_phase<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        registry: &mut ColumnRegistry,
        allocator: &mut ShardAllocator,
        report: &mut FlushReport,
    ) -> Result<(), FlushError> {
        for (shard, queue) in &mut self.queues {
            if queue.adds.is_empty() {
                continue;
            }
            queue.begin();

            let statement = Statement::AlterTable(AlterTable {
                table: shard.clone(),
                ops: queue
                    .adds
                    .iter()
                    .map(|add| AlterOp::AddColumn {
                        name: add.name.clone(),
                        column_type: add.column_type.clone(),
                    })
                    .collect(),
            });
            if let Err(source) = execute_traced(engine, &statement) {
                queue.abort();
                return Err(FlushError {
                    shard: shard.clone(),
                    phase: FlushPhase::Add,
                    source,
                });
            }

            report.statements += 1;
            report.added += queue.adds.len();
            let adds = std::mem::take(&mut queue.adds);

            match engine.reflect(shard) {
                Ok(schema) => {
                    for add in adds {
                        match schema.column(&add.name) {
                            Some(physical) => {
                                let column_type = physical.column_type.clone();
                                registry.register(added_column(shard, add, column_type));
                            }
                            None => {
                                warn!(shard = %shard, column = %add.name, "added column missing after reflection");
                            }
                        }
                    }
                    allocator.refresh_schema(schema);
                }
                Err(source) => {
                    // the ALTER went through, so the queued definitions are authoritative
                    for add in adds {
                        let column_type = add.column_type.clone();
                        registry.register(added_column(shard, add, column_type));
                    }
                    return Err(FlushError {
                        shard: shard.clone(),
                        phase: FlushPhase::Reflect,
                        source,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Whether `name` is registered in `shard` or physically present there.
/// Derived shards carry unregistered clones of the base columns.
pub(crate) fn column_exists(
    registry: &ColumnRegistry,
    allocator: &ShardAllocator,
    shard: &str,
    name: &str,
) -> bool {
    registry.exists(shard, name)
        || allocator
            .shard(shard)
            .is_some_and(|table| table.schema().column(name).is_some())
}

fn added_column(shard: &str, add: PendingAdd, column_type: ColumnType) -> Column {
    Column {
        key: ColumnKey::new(shard, add.name),
        column_type,
        metadata: add.metadata,
        primary_key: false,
        foreign_key: false,
        ordinal: add.ordinal,
    }
}
