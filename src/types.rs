use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

/// Format used whenever a timestamp becomes SQL text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Values that can be turned into SQL literals or read back out of a result set.
///
/// The same enum is used for statement parameters, condition-map values and fetched
/// cells, so helper code never has to branch on driver types:
/// ```rust
/// use simple_sql_middleware::prelude::*;
///
/// let params: Vec<SqlValue> = vec![1.into(), "alice".into(), true.into(), None::<i64>.into()];
/// assert!(params[3].is_null());
/// ```
#[derive(Clone, Default)]
pub enum SqlValue {
    /// NULL value
    #[default]
    Null,
    /// Boolean value (rendered as 0/1)
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Raw text bytes that may not be valid UTF-8
    Bytes(Vec<u8>),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Ordered list of values
    List(Vec<SqlValue>),
    /// Ordered key/value pairs
    Map(Vec<(String, SqlValue)>),
    /// Any value with a textual representation
    Stringable(Arc<dyn fmt::Display + Send + Sync>),
    /// A value with no SQL representation; carries its type name for diagnostics
    Opaque(&'static str),
}

impl SqlValue {
    /// Wrap anything printable so it is escaped through its `Display` output.
    pub fn stringable<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        SqlValue::Stringable(Arc::new(value))
    }

    /// Marker for a value of type `T` that cannot be expressed in SQL.
    #[must_use]
    pub fn opaque<T: ?Sized>() -> Self {
        SqlValue::Opaque(std::any::type_name::<T>())
    }

    /// Raw bytes that should be treated as (possibly malformed) text.
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        SqlValue::Bytes(bytes.into())
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_empty_text(&self) -> bool {
        match self {
            SqlValue::Text(s) => s.is_empty(),
            SqlValue::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            SqlValue::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let SqlValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Bytes(bytes) => Some(bytes),
            SqlValue::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value`.
    ///
    /// # Errors
    /// Returns `serde_json::Error` if the value cannot be represented as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl fmt::Debug for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("Null"),
            SqlValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            SqlValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            SqlValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
            SqlValue::Text(v) => f.debug_tuple("Text").field(v).finish(),
            SqlValue::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            SqlValue::Timestamp(v) => f.debug_tuple("Timestamp").field(v).finish(),
            SqlValue::List(v) => f.debug_tuple("List").field(v).finish(),
            SqlValue::Map(v) => f.debug_tuple("Map").field(v).finish(),
            SqlValue::Stringable(v) => f.debug_tuple("Stringable").field(&v.to_string()).finish(),
            SqlValue::Opaque(name) => f.debug_tuple("Opaque").field(name).finish(),
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int(a), SqlValue::Int(b)) => a == b,
            (SqlValue::Float(a), SqlValue::Float(b)) => a == b,
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a == b,
            (SqlValue::List(a), SqlValue::List(b)) => a == b,
            (SqlValue::Map(a), SqlValue::Map(b)) => a == b,
            (SqlValue::Stringable(a), SqlValue::Stringable(b)) => a.to_string() == b.to_string(),
            (SqlValue::Opaque(a), SqlValue::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null | SqlValue::Opaque(_) => serializer.serialize_unit(),
            SqlValue::Bool(v) => serializer.serialize_bool(*v),
            SqlValue::Int(v) => serializer.serialize_i64(*v),
            SqlValue::Float(v) => serializer.serialize_f64(*v),
            SqlValue::Text(v) => serializer.serialize_str(v),
            SqlValue::Bytes(v) => serializer.serialize_str(&String::from_utf8_lossy(v)),
            SqlValue::Timestamp(v) => {
                serializer.serialize_str(&v.format(TIMESTAMP_FORMAT).to_string())
            }
            SqlValue::Stringable(v) => serializer.serialize_str(&v.to_string()),
            SqlValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            SqlValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(value: $t) -> Self {
                SqlValue::Int(i64::from(value))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        SqlValue::Float(f64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Timestamp(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value.naive_utc())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(values: Vec<T>) -> Self {
        SqlValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Row shape produced by `Cursor::fetch` and `Cursor::fetch_all`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FetchShape {
    /// Structured `Row` record (column names shared across the result set)
    #[default]
    Record,
    /// Plain `HashMap` from column name to value
    Map,
    /// Column-ordered `OrderedRow`
    Ordered,
}

/// Scalar kind inferred for a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}
