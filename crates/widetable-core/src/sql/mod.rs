//! Typed statements for the fixed SQL surface the table issues.
//!
//! Statements are built as values and rendered to MySQL text through
//! `Display`. Engines may interpret the typed form directly or send the
//! rendered text; both describe the same operation.

#[cfg(test)]
mod tests;

use crate::{column::ColumnKey, types::ColumnType};
use derive_more::Display;
use std::fmt;

///
/// Ident
///
/// A backtick-quoted identifier; embedded backticks are doubled.
///

#[derive(Clone, Copy, Debug)]
pub struct Ident<'a>(pub &'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("`")?;
        for part in self.0.split_inclusive('`') {
            f.write_str(part)?;
            if part.ends_with('`') {
                f.write_str("`")?;
            }
        }
        f.write_str("`")
    }
}

///
/// Qualified
///
/// `shard`.`column` reference.
///

#[derive(Clone, Copy, Debug)]
pub struct Qualified<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

impl<'a> Qualified<'a> {
    #[must_use]
    pub const fn new(table: &'a str, column: &'a str) -> Self {
        Self { table, column }
    }
}

impl<'a> From<&'a ColumnKey> for Qualified<'a> {
    fn from(key: &'a ColumnKey) -> Self {
        Self::new(&key.shard, &key.name)
    }
}

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Ident(self.table), Ident(self.column))
    }
}

///
/// Statement
///

#[derive(Clone, Debug, Display, PartialEq)]
pub enum Statement {
    #[display("SELECT count(*) FROM {}", Ident(table))]
    CountRows { table: String },

    #[display("CREATE TABLE {} LIKE {}", Ident(table), Ident(like))]
    CreateTableLike { table: String, like: String },

    #[display("INSERT INTO {} SELECT * FROM {}", Ident(table), Ident(source))]
    InsertSelectAll { table: String, source: String },

    #[display("{_0}")]
    AlterTable(AlterTable),

    #[display("{_0}")]
    Select(SelectStatement),

    #[display("{_0}")]
    CountDistinct(CountDistinct),
}

impl Statement {
    /// Whether the statement changes schema or data rather than reading.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateTableLike { .. } | Self::InsertSelectAll { .. } | Self::AlterTable(_)
        )
    }
}

///
/// AlterTable
///
/// One statement, one clause per operation.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub ops: Vec<AlterOp>,
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} ", Ident(&self.table))?;
        write_list(f, &self.ops)
    }
}

///
/// AlterOp
///

#[derive(Clone, Debug, PartialEq)]
pub enum AlterOp {
    AddColumn {
        name: String,
        column_type: ColumnType,
    },
    DropColumn {
        name: String,
    },
}

impl fmt::Display for AlterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddColumn { name, column_type } => {
                write!(f, "ADD COLUMN {} {column_type}", Ident(name))
            }
            Self::DropColumn { name } => write!(f, "DROP COLUMN {}", Ident(name)),
        }
    }
}

///
/// JoinSource
///
/// `FROM base JOIN other ON base.pk = other.pk ...`, shared by every read
/// that spans shards.
///

#[derive(Clone, Debug, PartialEq)]
pub struct JoinSource {
    pub base: String,
    pub joins: Vec<String>,
    pub primary_key: String,
}

impl JoinSource {
    /// Every table named by the source, base first.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base.as_str()).chain(self.joins.iter().map(String::as_str))
    }
}

impl fmt::Display for JoinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", Ident(&self.base))?;
        for table in &self.joins {
            write!(
                f,
                " JOIN {} ON {} = {}",
                Ident(table),
                Qualified::new(&self.base, &self.primary_key),
                Qualified::new(table, &self.primary_key),
            )?;
        }

        Ok(())
    }
}

///
/// SelectStatement
///
/// Row-aligned read across shards, one output row per primary key.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStatement {
    pub projection: Vec<ColumnKey>,
    pub source: JoinSource,
}

impl SelectStatement {
    /// Physical names of the projected columns, in output order.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.projection.iter().map(|key| key.name.clone()).collect()
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pk = Qualified::new(&self.source.base, &self.source.primary_key);

        f.write_str("SELECT ")?;
        write_list(f, self.projection.iter().map(Qualified::from))?;
        write!(f, " {} GROUP BY {pk} ORDER BY {pk}", self.source)
    }
}

///
/// CountDistinct
///

#[derive(Clone, Debug, PartialEq)]
pub struct CountDistinct {
    pub columns: Vec<ColumnKey>,
    pub source: JoinSource,
}

impl fmt::Display for CountDistinct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        write_list(
            f,
            self.columns
                .iter()
                .map(|key| format!("COUNT(DISTINCT {})", Qualified::from(key))),
        )?;
        write!(f, " {}", self.source)
    }
}

// Comma-separated rendering.
fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }

    Ok(())
}
