//! Pending schema mutations, batched per shard and applied by a flush.
//!
//! Contract:
//! - Queues are transient; nothing here touches the engine until `flush`.
//! - A flush runs reconciliation, then every shard's drops, then every
//!   shard's adds. Shards are visited in name order.
//! - A failed statement leaves earlier shards applied and the failed shard's
//!   remaining queue intact, so calling `flush` again resumes the work.
//! - A rejected add never stays queued; `cancel` and `discard` remove work
//!   the caller no longer wants applied.

mod flush;

use crate::{
    column::ColumnMetadata, engine::EngineError, error::ErrorClass, types::ColumnType,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

pub use flush::FlushReport;
pub(crate) use flush::column_exists;

///
/// MutationError
///
/// Rejections raised before any statement is issued.
///

#[derive(Debug, ThisError)]
pub enum MutationError {
    #[error("column '{column}' already exists in shard '{shard}'")]
    ColumnCollision { shard: String, column: String },

    #[error("column '{column}' in shard '{shard}' is a primary key and cannot be altered")]
    ProtectedColumn { shard: String, column: String },

    #[error("no column '{column}' in shard '{shard}'")]
    UnknownColumn { shard: String, column: String },
}

impl MutationError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::ColumnCollision { .. } => ErrorClass::Conflict,
            Self::ProtectedColumn { .. } | Self::UnknownColumn { .. } => ErrorClass::Invalid,
        }
    }
}

///
/// FlushPhase
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum FlushPhase {
    #[display("drop")]
    Drop,
    #[display("add")]
    Add,
    #[display("reflect")]
    Reflect,
}

///
/// FlushError
///
/// A statement failed mid-flush. Shards visited earlier stay applied.
///

#[derive(Debug, ThisError)]
#[error("flush {phase} phase failed on shard '{shard}': {source}")]
pub struct FlushError {
    pub shard: String,
    pub phase: FlushPhase,
    #[source]
    pub source: EngineError,
}

///
/// PendingAdd
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PendingAdd {
    pub name: String,
    pub column_type: ColumnType,
    pub metadata: ColumnMetadata,
    pub ordinal: usize,
}

///
/// PendingState
///
/// Empty → Queued → Flushing → Empty, or back to Queued when a flush
/// stops partway through this shard.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PendingState {
    #[default]
    Empty,
    Queued,
    Flushing,
}

///
/// PendingMutation
///
/// One shard's queued adds and drops.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PendingMutation {
    adds: Vec<PendingAdd>,
    drops: Vec<String>,
    state: PendingState,
}

impl PendingMutation {
    #[must_use]
    pub fn adds(&self) -> &[PendingAdd] {
        &self.adds
    }

    #[must_use]
    pub fn drops(&self) -> &[String] {
        &self.drops
    }

    #[must_use]
    pub const fn state(&self) -> PendingState {
        self.state
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.drops.is_empty()
    }

    #[must_use]
    pub fn is_dropping(&self, name: &str) -> bool {
        self.drops.iter().any(|d| d == name)
    }

    // A later add of the same name replaces the earlier one.
    fn queue_add(&mut self, add: PendingAdd) {
        self.adds.retain(|a| a.name != add.name);
        self.adds.push(add);
        self.state = PendingState::Queued;
    }

    fn queue_drop(&mut self, name: String) {
        if !self.is_dropping(&name) {
            self.drops.push(name);
        }
        self.state = PendingState::Queued;
    }

    // Forget queued work for one name; true when anything was removed.
    fn cancel(&mut self, name: &str) -> bool {
        let before = self.adds.len() + self.drops.len();
        self.adds.retain(|a| a.name != name);
        self.drops.retain(|d| d != name);
        self.settle();

        before != self.adds.len() + self.drops.len()
    }

    fn begin(&mut self) {
        self.state = PendingState::Flushing;
    }

    fn abort(&mut self) {
        self.state = PendingState::Queued;
    }

    fn settle(&mut self) {
        self.state = if self.is_empty() {
            PendingState::Empty
        } else {
            PendingState::Queued
        };
    }
}

///
/// MutationBatch
///
/// Pending mutations for every shard of one logical table.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MutationBatch {
    queues: BTreeMap<String, PendingMutation>,
}

impl MutationBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_add(&mut self, shard: &str, add: PendingAdd) {
        self.queues.entry(shard.to_string()).or_default().queue_add(add);
    }

    pub fn queue_drop(&mut self, shard: &str, name: impl Into<String>) {
        self.queues
            .entry(shard.to_string())
            .or_default()
            .queue_drop(name.into());
    }

    /// Remove a queued add for `name` without touching queued drops.
    pub fn discard_add(&mut self, shard: &str, name: &str) -> Option<PendingAdd> {
        let queue = self.queues.get_mut(shard)?;
        let index = queue.adds.iter().position(|a| a.name == name)?;
        let add = queue.adds.remove(index);
        queue.settle();
        self.queues.retain(|_, q| !q.is_empty());

        Some(add)
    }

    /// Forget every queued add and drop of one column.
    pub fn cancel(&mut self, shard: &str, name: &str) -> bool {
        let cancelled = self
            .queues
            .get_mut(shard)
            .is_some_and(|queue| queue.cancel(name));
        self.queues.retain(|_, q| !q.is_empty());

        cancelled
    }

    /// Drop all queued work, returning what was pending per shard.
    pub fn discard(&mut self) -> BTreeMap<String, PendingMutation> {
        let mut queues = std::mem::take(&mut self.queues);
        queues.retain(|_, q| !q.is_empty());

        queues
    }

    #[must_use]
    pub fn queue(&self, shard: &str) -> Option<&PendingMutation> {
        self.queues.get(shard)
    }

    /// Shards with queued work, in name order.
    pub fn pending(&self) -> impl Iterator<Item = (&str, &PendingMutation)> {
        self.queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(shard, q)| (shard.as_str(), q))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.values().all(PendingMutation::is_empty)
    }

    #[must_use]
    pub fn is_pending_add(&self, shard: &str, name: &str) -> bool {
        self.queues
            .get(shard)
            .is_some_and(|q| q.adds.iter().any(|a| a.name == name))
    }
}
