//! Column registry: the canonical record of which columns exist where.
//!
//! Enumeration order is explicit: shard name, then column ordinal, then
//! column name. Nothing depends on map iteration order.

#[cfg(test)]
mod tests;

use crate::{
    column::{Column, ColumnKey, ColumnMetadata},
    engine::TableSchema,
    types::ColumnKind,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap};

///
/// ColumnFilter
///
/// Filter applied by [`ColumnRegistry::query`], in order:
/// relationship exclusion, then the predicate, then the first-only cutoff.
///

#[derive(Default)]
pub struct ColumnFilter<'a> {
    exclude_relationships: bool,
    predicate: Option<Box<dyn Fn(&Column) -> bool + 'a>>,
    first_only: bool,
}

impl<'a> ColumnFilter<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip primary- and foreign-key columns.
    #[must_use]
    pub const fn exclude_relationships(mut self) -> Self {
        self.exclude_relationships = true;
        self
    }

    #[must_use]
    pub fn matching(mut self, predicate: impl Fn(&Column) -> bool + 'a) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Stop at the first match.
    #[must_use]
    pub const fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    fn accepts(&self, column: &Column) -> bool {
        if self.exclude_relationships && column.is_relationship() {
            return false;
        }

        self.predicate.as_ref().is_none_or(|p| p(column))
    }
}

///
/// ColumnRegistry
///
/// Exclusive owner of column descriptors, keyed shard → name.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ColumnRegistry {
    shards: BTreeMap<String, BTreeMap<String, Column>>,
}

impl ColumnRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every column of a freshly reflected base table.
    ///
    /// A column is numeric when its kind is in `numeric_kinds` and it is
    /// neither a primary nor a foreign key. No column starts categorical.
    #[must_use]
    pub fn from_base_schema(schema: &TableSchema, numeric_kinds: &[ColumnKind]) -> Self {
        let mut registry = Self::new();

        for (ordinal, physical) in schema.columns.iter().enumerate() {
            let relationship = physical.primary_key || physical.foreign_key;
            let numeric = numeric_kinds.contains(&physical.column_type.kind()) && !relationship;

            registry.register(Column {
                key: ColumnKey::new(schema.name.clone(), physical.name.clone()),
                column_type: physical.column_type.clone(),
                metadata: ColumnMetadata {
                    numeric,
                    categorical: false,
                    real_name: Some(physical.name.clone()),
                    extra: BTreeMap::new(),
                },
                primary_key: physical.primary_key,
                foreign_key: physical.foreign_key,
                ordinal,
            });
        }

        registry
    }

    /// Insert or overwrite the descriptor for the column's (shard, name).
    pub fn register(&mut self, column: Column) -> Option<Column> {
        self.shards
            .entry(column.key.shard.clone())
            .or_default()
            .insert(column.key.name.clone(), column)
    }

    pub fn remove(&mut self, key: &ColumnKey) -> Option<Column> {
        let shard = self.shards.get_mut(&key.shard)?;
        let removed = shard.remove(&key.name);
        if shard.is_empty() {
            self.shards.remove(&key.shard);
        }

        removed
    }

    #[must_use]
    pub fn get(&self, key: &ColumnKey) -> Option<&Column> {
        self.shards.get(&key.shard)?.get(&key.name)
    }

    #[must_use]
    pub fn exists(&self, shard: &str, name: &str) -> bool {
        self.shards
            .get(shard)
            .is_some_and(|columns| columns.contains_key(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Columns of one shard, in ordinal order.
    #[must_use]
    pub fn shard_columns(&self, shard: &str) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self
            .shards
            .get(shard)
            .map(|c| c.values().collect())
            .unwrap_or_default();
        columns.sort_by(|a, b| registry_order(a, b));

        columns
    }

    /// Every column, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        // shard keys are already sorted; only the within-shard order needs work
        self.shards.keys().flat_map(|shard| self.shard_columns(shard))
    }

    /// Apply a [`ColumnFilter`]. With `first_only`, the result holds at most
    /// one column: the first match in registry order.
    #[must_use]
    pub fn query(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        let matches = self.iter().filter(|c| filter.accepts(c));

        if filter.first_only {
            matches.take(1).collect()
        } else {
            matches.collect()
        }
    }

    #[must_use]
    pub fn first(&self, filter: &ColumnFilter<'_>) -> Option<&Column> {
        self.iter().find(|c| filter.accepts(c))
    }

    /// First column anywhere named `name`.
    ///
    /// Names are unique per shard only. When several shards hold `name`, the
    /// shard that sorts first wins; use [`Self::get`] to address one shard.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Column> {
        self.first(&ColumnFilter::new().matching(|c| c.name() == name))
    }

    #[must_use]
    pub fn names_to_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<Option<&Column>> {
        names.iter().map(|n| self.by_name(n.as_ref())).collect()
    }

    #[must_use]
    pub fn columns_of_type(&self, kinds: &[ColumnKind], filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.query(filter)
            .into_iter()
            .filter(|c| kinds.contains(&c.column_type.kind()))
            .collect()
    }

    /// Columns whose metadata marks them numeric.
    #[must_use]
    pub fn numeric_columns(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.query(filter)
            .into_iter()
            .filter(|c| c.metadata.numeric)
            .collect()
    }

    /// Columns whose metadata already marks them categorical.
    #[must_use]
    pub fn categorical_columns(&self, filter: &ColumnFilter<'_>) -> Vec<&Column> {
        self.query(filter)
            .into_iter()
            .filter(|c| c.metadata.categorical)
            .collect()
    }

    /// The first primary-key column in registry order.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Column> {
        self.first(&ColumnFilter::new().matching(|c| c.primary_key))
    }
}

// Shard name, then ordinal, then name.
fn registry_order(a: &Column, b: &Column) -> Ordering {
    a.key
        .shard
        .cmp(&b.key.shard)
        .then(a.ordinal.cmp(&b.ordinal))
        .then_with(|| a.key.name.cmp(&b.key.name))
}
