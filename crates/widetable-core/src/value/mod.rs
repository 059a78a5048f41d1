
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
///
/// One cell as returned by the engine.
///
/// Null  → SQL NULL; never equal to anything in a join condition.
///

#[derive(Clone, Debug, Deserialize, Display, From, PartialEq, Serialize)]
pub enum Value {
    #[display("NULL")]
    #[from(ignore)]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality under SQL join semantics: NULL matches nothing and
    /// integers compare equal to floats of the same magnitude.
    #[must_use]
    pub fn sql_eq(&self, other: &Self) -> bool {
        !self.is_null() && !other.is_null() && self.total_cmp(other) == Ordering::Equal
    }

    /// Total order used for ORDER BY and grouping.
    ///
    /// NULL sorts first, then booleans, numbers (ints and floats compared
    /// numerically), and finally text.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
