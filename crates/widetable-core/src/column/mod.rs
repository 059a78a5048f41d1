use crate::types::ColumnType;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// ColumnKey
///
/// Identity of a physical column: the shard that holds it plus its name.
/// Names are unique per shard only; two shards may both hold `foo`.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ColumnKey {
    pub shard: String,
    pub name: String,
}

impl ColumnKey {
    #[must_use]
    pub fn new(shard: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            shard: shard.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.shard, self.name)
    }
}

///
/// ColumnMetadata
///
/// Semantic metadata carried alongside a column, independent of where the
/// column physically lives. Keys without a dedicated field go in `extra`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ColumnMetadata {
    pub numeric: bool,
    pub categorical: bool,
    pub real_name: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl ColumnMetadata {
    #[must_use]
    pub fn numeric() -> Self {
        Self {
            numeric: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_real_name(mut self, name: impl Into<String>) -> Self {
        self.real_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn with_categorical(mut self, categorical: bool) -> Self {
        self.categorical = categorical;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

///
/// Column
///
/// Registry-owned descriptor for one physical column.
///
/// `ordinal` is the secondary sort key within a shard: the reflected
/// position for base-table columns, the allocation index for allocated ones.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Column {
    pub key: ColumnKey,
    pub column_type: ColumnType,
    pub metadata: ColumnMetadata,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub ordinal: usize,
}

impl Column {
    #[must_use]
    pub fn shard(&self) -> &str {
        &self.key.shard
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Primary- and foreign-key columns relate rows rather than describe them.
    #[must_use]
    pub const fn is_relationship(&self) -> bool {
        self.primary_key || self.foreign_key
    }
}
