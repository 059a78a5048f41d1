//! Physical SQL column types as the engine reports and accepts them.


use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ColumnKind
///
/// Parameter-free type family of a [`ColumnType`].
/// Type filters and the numeric classification compare kinds, never
/// precision or length, so `DECIMAL(10,2)` and `DECIMAL(4,0)` match alike.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnKind {
    #[display("TINYINT")]
    TinyInt,
    #[display("SMALLINT")]
    SmallInt,
    #[display("MEDIUMINT")]
    MediumInt,
    #[display("INT")]
    Int,
    #[display("BIGINT")]
    BigInt,
    #[display("FLOAT")]
    Float,
    #[display("DOUBLE")]
    Double,
    #[display("DECIMAL")]
    Decimal,
    #[display("BOOLEAN")]
    Boolean,
    #[display("VARCHAR")]
    Varchar,
    #[display("TEXT")]
    Text,
    #[display("DATE")]
    Date,
    #[display("DATETIME")]
    DateTime,
    #[display("OTHER")]
    Other,
}

impl ColumnKind {
    /// Kinds treated as numeric when a base table is first registered.
    pub const DEFAULT_NUMERIC: [Self; 6] = [
        Self::Int,
        Self::Float,
        Self::Decimal,
        Self::Double,
        Self::SmallInt,
        Self::MediumInt,
    ];

    /// Resolve a bare type name (no parameters), accepting common aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "TINYINT" => Self::TinyInt,
            "SMALLINT" => Self::SmallInt,
            "MEDIUMINT" => Self::MediumInt,
            "INT" | "INTEGER" => Self::Int,
            "BIGINT" => Self::BigInt,
            "FLOAT" | "REAL" => Self::Float,
            "DOUBLE" | "DOUBLE PRECISION" => Self::Double,
            "DECIMAL" | "NUMERIC" | "DEC" => Self::Decimal,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "VARCHAR" | "CHARACTER VARYING" => Self::Varchar,
            "TEXT" => Self::Text,
            "DATE" => Self::Date,
            "DATETIME" | "TIMESTAMP" => Self::DateTime,
            _ => Self::Other,
        }
    }
}

///
/// ColumnType
///
/// Physical column type, rendered verbatim into DDL.
/// `Other` carries any type text the engine reports that has no
/// dedicated variant; it round-trips unchanged.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Varchar(u16),
    Text,
    Date,
    DateTime,
    Other(String),
}

impl ColumnType {
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::TinyInt => ColumnKind::TinyInt,
            Self::SmallInt => ColumnKind::SmallInt,
            Self::MediumInt => ColumnKind::MediumInt,
            Self::Int => ColumnKind::Int,
            Self::BigInt => ColumnKind::BigInt,
            Self::Float => ColumnKind::Float,
            Self::Double => ColumnKind::Double,
            Self::Decimal { .. } => ColumnKind::Decimal,
            Self::Boolean => ColumnKind::Boolean,
            Self::Varchar(_) => ColumnKind::Varchar,
            Self::Text => ColumnKind::Text,
            Self::Date => ColumnKind::Date,
            Self::DateTime => ColumnKind::DateTime,
            Self::Other(_) => ColumnKind::Other,
        }
    }

    /// Parse a type as reflected from the engine, e.g. `decimal(10, 2)`.
    ///
    /// Anything unrecognised, including malformed parameters, is kept as
    /// [`ColumnType::Other`] with the original text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let (name, args) = match trimmed.split_once('(') {
            Some((name, rest)) => match rest.strip_suffix(')') {
                Some(args) => (name, Some(args)),
                None => return Self::Other(trimmed.to_string()),
            },
            None => (trimmed, None),
        };

        let parsed = match (ColumnKind::from_name(name), args) {
            (ColumnKind::Decimal, None) => Some(Self::Decimal {
                precision: 10,
                scale: 0,
            }),
            (ColumnKind::Decimal, Some(args)) => parse_decimal_args(args),
            (ColumnKind::Varchar, Some(args)) => args.trim().parse().ok().map(Self::Varchar),
            // integer display widths like INT(11) carry no type information
            (kind, Some(_)) if kind.is_integer() => Self::from_kind(kind),
            (kind, None) => Self::from_kind(kind),
            (_, Some(_)) => None,
        };

        parsed.unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }

    // Build the parameter-free type for a kind, if it has one.
    const fn from_kind(kind: ColumnKind) -> Option<Self> {
        let ty = match kind {
            ColumnKind::TinyInt => Self::TinyInt,
            ColumnKind::SmallInt => Self::SmallInt,
            ColumnKind::MediumInt => Self::MediumInt,
            ColumnKind::Int => Self::Int,
            ColumnKind::BigInt => Self::BigInt,
            ColumnKind::Float => Self::Float,
            ColumnKind::Double => Self::Double,
            ColumnKind::Boolean => Self::Boolean,
            ColumnKind::Text => Self::Text,
            ColumnKind::Date => Self::Date,
            ColumnKind::DateTime => Self::DateTime,
            ColumnKind::Decimal | ColumnKind::Varchar | ColumnKind::Other => return None,
        };

        Some(ty)
    }
}

impl ColumnKind {
    const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt
        )
    }
}

fn parse_decimal_args(args: &str) -> Option<ColumnType> {
    let mut parts = args.split(',').map(str::trim);
    let precision = parts.next()?.parse().ok()?;
    let scale = match parts.next() {
        Some(scale) => scale.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(ColumnType::Decimal { precision, scale })
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::Other(text) => f.write_str(text),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}
