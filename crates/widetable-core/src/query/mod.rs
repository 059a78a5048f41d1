//! Query synthesis: one SELECT that reconstructs row-aligned logical rows
//! from whichever shards hold the requested columns.

#[cfg(test)]
mod tests;

use crate::{
    column::{Column, ColumnKey},
    registry::ColumnRegistry,
    sql::{CountDistinct, JoinSource, SelectStatement},
};
use thiserror::Error as ThisError;

///
/// QuerySynthesisError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum QuerySynthesisError {
    #[error("no columns requested")]
    EmptyColumnSet,

    #[error("no primary key column is registered")]
    NoPrimaryKey,

    #[error("unknown column '{0}'")]
    UnknownColumn(ColumnKey),
}

///
/// QuerySynthesizer
///
/// Read-only view over a registry that turns column sets into statements.
///
/// The base of the FROM clause is the shard owning the primary key when it
/// is involved, otherwise the first involved shard by name. Every other
/// involved shard is joined on the primary key, in name order.
///

#[derive(Clone, Copy, Debug)]
pub struct QuerySynthesizer<'a> {
    registry: &'a ColumnRegistry,
}

impl<'a> QuerySynthesizer<'a> {
    #[must_use]
    pub const fn new(registry: &'a ColumnRegistry) -> Self {
        Self { registry }
    }

    /// Build the row-reconstructing SELECT. `None` selects every registered
    /// column in registry order.
    pub fn select(
        &self,
        columns: Option<&[ColumnKey]>,
    ) -> Result<SelectStatement, QuerySynthesisError> {
        let (projection, source) = self.plan(columns)?;

        Ok(SelectStatement { projection, source })
    }

    /// Build `SELECT COUNT(DISTINCT ..)` over the same join as [`Self::select`].
    pub fn count_distinct(
        &self,
        columns: Option<&[ColumnKey]>,
    ) -> Result<CountDistinct, QuerySynthesisError> {
        let (columns, source) = self.plan(columns)?;

        Ok(CountDistinct { columns, source })
    }

    fn plan(
        &self,
        columns: Option<&[ColumnKey]>,
    ) -> Result<(Vec<ColumnKey>, JoinSource), QuerySynthesisError> {
        let pk = self
            .registry
            .primary_key()
            .ok_or(QuerySynthesisError::NoPrimaryKey)?;
        let projection = self.resolve(columns)?;
        let source = join_source(pk, &projection)?;

        Ok((projection, source))
    }

    // Deduplicate keeping the first occurrence, and check every key exists.
    fn resolve(&self, columns: Option<&[ColumnKey]>) -> Result<Vec<ColumnKey>, QuerySynthesisError> {
        let keys: Vec<ColumnKey> = match columns {
            Some(keys) => {
                let mut unique: Vec<ColumnKey> = Vec::with_capacity(keys.len());
                for key in keys {
                    if self.registry.get(key).is_none() {
                        return Err(QuerySynthesisError::UnknownColumn(key.clone()));
                    }
                    if !unique.contains(key) {
                        unique.push(key.clone());
                    }
                }
                unique
            }
            None => self.registry.iter().map(|c| c.key.clone()).collect(),
        };

        if keys.is_empty() {
            return Err(QuerySynthesisError::EmptyColumnSet);
        }

        Ok(keys)
    }
}

fn join_source(pk: &Column, projection: &[ColumnKey]) -> Result<JoinSource, QuerySynthesisError> {
    let mut shards: Vec<&str> = projection.iter().map(|key| key.shard.as_str()).collect();
    shards.sort_unstable();
    shards.dedup();

    let base = if shards.contains(&pk.shard()) {
        pk.shard()
    } else {
        shards
            .first()
            .copied()
            .ok_or(QuerySynthesisError::EmptyColumnSet)?
    };

    Ok(JoinSource {
        base: base.to_string(),
        joins: shards
            .into_iter()
            .filter(|shard| *shard != base)
            .map(str::to_string)
            .collect(),
        primary_key: pk.name().to_string(),
    })
}
