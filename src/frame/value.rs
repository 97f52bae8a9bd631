use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::frame::error::FrameError;

/// Semantic column types, as declared in the config's `file_types` map.
/// `Category` is a string enum; it only differs from `String` in intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Category,
    Integer,
    NullableInteger,
    Date,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Category => "category",
            ColumnType::Integer => "integer",
            ColumnType::NullableInteger => "nullable integer",
            ColumnType::Date => "date",
        }
    }
}

/// A single typed cell. `Key` holds a surrogate key (fixed-width on purpose:
/// the dimensions this pipeline produces are small).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Key(i16),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Key(_) => "key",
            Value::Date(_) => "date",
        }
    }

    /// Coerce a raw field to the declared semantic type.
    pub fn coerce(column: &str, raw: &str, ty: ColumnType) -> Result<Value, FrameError> {
        let s = raw.trim();
        let err = || FrameError::Coerce {
            column: column.to_string(),
            value: raw.to_string(),
            ty: ty.name(),
        };
        match ty {
            ColumnType::String | ColumnType::Category => Ok(Value::Str(s.to_string())),
            ColumnType::Integer => s.parse::<i64>().map(Value::Int).map_err(|_| err()),
            ColumnType::NullableInteger => {
                if s.is_empty() {
                    Ok(Value::Null)
                } else {
                    s.parse::<i64>().map(Value::Int).map_err(|_| err())
                }
            }
            ColumnType::Date => parse_date(s).map(Value::Date).ok_or_else(err),
        }
    }

    /// Coerce an identifier wrapped in brackets (`"[482910]"`) to a nullable
    /// integer. Exactly one leading `[` and one trailing `]` are stripped; a
    /// non-empty value missing either bracket is a coercion error.
    pub fn coerce_bracketed(column: &str, raw: &str) -> Result<Value, FrameError> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(Value::Null);
        }
        let inner = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| FrameError::Coerce {
                column: column.to_string(),
                value: raw.to_string(),
                ty: "bracketed integer",
            })?;
        if inner.is_empty() {
            return Ok(Value::Null);
        }
        inner
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| FrameError::Coerce {
                column: column.to_string(),
                value: raw.to_string(),
                ty: "bracketed integer",
            })
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Key(_) => 0,
            Value::Int(_) => 1,
            Value::Date(_) => 2,
            Value::Str(_) => 3,
            // Nulls sort last, matching the source's sort behavior.
            Value::Null => 4,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Key(a), Value::Key(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Key(k) => write!(f, "{}", k),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Parse of report dates: ISO `YYYY-MM-DD` first, then US `M/D/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}
