//! Table tunables, loadable from TOML.

use crate::{MAX_COLS_TABLE, types::ColumnKind};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// WideTableConfig
///
/// Every field has a default, so an empty document is a valid config.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WideTableConfig {
    /// Ceiling of allocated columns per shard before a new shard is made.
    pub max_columns_per_shard: usize,

    /// Physical kinds flagged `numeric` when base columns are registered.
    pub numeric_types: Vec<ColumnKind>,

    /// Default conflict policy for flushes issued through `create_column`.
    pub drop_if_exists: bool,
}

impl WideTableConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_columns_per_shard == 0 {
            return Err(ConfigError::Invalid(
                "max_columns_per_shard must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Override the shard ceiling.
    #[must_use]
    pub const fn with_max_columns_per_shard(mut self, max: usize) -> Self {
        self.max_columns_per_shard = max;
        self
    }

    #[must_use]
    pub fn is_numeric(&self, kind: ColumnKind) -> bool {
        self.numeric_types.contains(&kind)
    }
}

impl Default for WideTableConfig {
    fn default() -> Self {
        Self {
            max_columns_per_shard: MAX_COLS_TABLE,
            numeric_types: ColumnKind::DEFAULT_NUMERIC.to_vec(),
            drop_if_exists: true,
        }
    }
}
