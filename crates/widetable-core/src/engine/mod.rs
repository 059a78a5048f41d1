//! Engine contract: the single collaborator the table talks to.
//!
//! The table never opens or closes an engine. Callers own it and lend it to
//! a [`TableSession`](crate::table::TableSession) for the duration of each
//! engine-touching operation.

mod memory;

use crate::{sql::Statement, types::ColumnType, value::Value};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::debug;

pub use memory::MemoryEngine;

///
/// Engine
///
/// Blocking statement execution plus schema reflection.
///

pub trait Engine {
    /// Execute one statement. Reads return their rows; DDL returns an empty set.
    fn execute(&mut self, statement: &Statement) -> Result<RowSet, EngineError>;

    /// Return the table's columns as currently defined, in physical order.
    fn reflect(&mut self, table: &str) -> Result<TableSchema, EngineError>;
}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn execute(&mut self, statement: &Statement) -> Result<RowSet, EngineError> {
        (**self).execute(statement)
    }

    fn reflect(&mut self, table: &str) -> Result<TableSchema, EngineError> {
        (**self).reflect(table)
    }
}

// Execute with a trace line; every statement the table issues goes through here.
pub(crate) fn execute_traced<E: Engine + ?Sized>(
    engine: &mut E,
    statement: &Statement,
) -> Result<RowSet, EngineError> {
    debug!(sql = %statement, "executing statement");

    engine.execute(statement).map_err(|err| {
        if err.statement.is_some() {
            err
        } else {
            err.with_statement(statement.to_string())
        }
    })
}

///
/// EngineError
///
/// Opaque failure reported by the engine; carried through, never interpreted.
///

#[derive(Debug, ThisError)]
#[error("engine error: {message}")]
pub struct EngineError {
    pub message: String,

    /// Rendered text of the statement that failed, when known.
    pub statement: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            statement: None,
        }
    }

    #[must_use]
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }
}

///
/// PhysicalColumn
///
/// One column as reflected from the engine.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PhysicalColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub foreign_key: bool,
}

impl PhysicalColumn {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            foreign_key: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }
}

///
/// TableSchema
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<PhysicalColumn>,
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&PhysicalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names of the primary-key columns, in physical order.
    #[must_use]
    pub fn primary_key_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }
}

///
/// Row
///

pub type Row = Vec<Value>;

///
/// RowSet
///
/// Result of one statement: output column names and the rows beneath them.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,

    #[deref]
    #[into_iterator(owned, ref)]
    pub rows: Vec<Row>,
}

impl RowSet {
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// The first cell of the first row, for scalar reads like `count(*)`.
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}
