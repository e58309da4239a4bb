//! Per-column coercion of fetched cells.

use std::sync::LazyLock;

use regex::Regex;

use crate::driver::FieldMeta;
use crate::types::{ColumnKind, SqlValue, TIMESTAMP_FORMAT};

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").expect("int prefix pattern is valid"));

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("float prefix pattern is valid")
});

pub(crate) fn column_kinds(fields: &[FieldMeta]) -> Vec<ColumnKind> {
    fields.iter().map(FieldMeta::kind).collect()
}

/// Coerce `value` to `kind`. `NULL` always stays `NULL`.
pub(crate) fn cast(value: SqlValue, kind: ColumnKind) -> SqlValue {
    match (kind, value) {
        (_, SqlValue::Null) => SqlValue::Null,
        (ColumnKind::Int, SqlValue::Int(v)) => SqlValue::Int(v),
        (ColumnKind::Int, SqlValue::Bool(v)) => SqlValue::Int(i64::from(v)),
        #[allow(clippy::cast_possible_truncation)]
        (ColumnKind::Int, SqlValue::Float(v)) => SqlValue::Int(v as i64),
        (ColumnKind::Int, other) => SqlValue::Int(leading_int(&text_of(&other))),
        (ColumnKind::Float, SqlValue::Float(v)) => SqlValue::Float(v),
        #[allow(clippy::cast_precision_loss)]
        (ColumnKind::Float, SqlValue::Int(v)) => SqlValue::Float(v as f64),
        (ColumnKind::Float, other) => SqlValue::Float(leading_float(&text_of(&other))),
        (ColumnKind::Text, SqlValue::Text(v)) => SqlValue::Text(v),
        (ColumnKind::Text, other) => SqlValue::Text(text_of(&other)),
    }
}

fn text_of(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Bool(v) => if *v { "1" } else { "" }.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Text(v) => v.clone(),
        SqlValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        SqlValue::Timestamp(v) => v.format(TIMESTAMP_FORMAT).to_string(),
        SqlValue::Stringable(v) => v.to_string(),
        SqlValue::List(_) | SqlValue::Map(_) | SqlValue::Opaque(_) => String::new(),
    }
}

/// Integer value of the leading numeric prefix; `0` when there is none.
fn leading_int(text: &str) -> i64 {
    let Some(prefix) = LEADING_INT.find(text) else {
        return 0;
    };
    let digits = prefix.as_str().trim_start();
    digits.parse::<i64>().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn leading_float(text: &str) -> f64 {
    LEADING_FLOAT
        .find(text)
        .and_then(|m| m.as_str().trim_start().parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::field_type;

    #[test]
    fn kinds_follow_type_codes() {
        let fields = vec![
            FieldMeta::new("a", field_type::LONG),
            FieldMeta::new("b", field_type::DOUBLE),
            FieldMeta::new("c", field_type::VAR_STRING),
            FieldMeta::new("d", field_type::NEWDECIMAL),
        ];
        assert_eq!(
            column_kinds(&fields),
            vec![
                ColumnKind::Int,
                ColumnKind::Float,
                ColumnKind::Text,
                ColumnKind::Text
            ]
        );
    }

    #[test]
    fn int_columns_parse_numeric_prefixes() {
        assert_eq!(cast("42".into(), ColumnKind::Int), SqlValue::Int(42));
        assert_eq!(cast(" -7abc".into(), ColumnKind::Int), SqlValue::Int(-7));
        assert_eq!(cast("abc".into(), ColumnKind::Int), SqlValue::Int(0));
        assert_eq!(cast("12.9".into(), ColumnKind::Int), SqlValue::Int(12));
        assert_eq!(cast(SqlValue::Null, ColumnKind::Int), SqlValue::Null);
    }

    #[test]
    fn float_and_text_columns() {
        assert_eq!(cast("2.5".into(), ColumnKind::Float), SqlValue::Float(2.5));
        assert_eq!(cast("1e3x".into(), ColumnKind::Float), SqlValue::Float(1000.0));
        assert_eq!(cast(SqlValue::Int(3), ColumnKind::Text), SqlValue::Text("3".into()));
        assert_eq!(cast(SqlValue::bytes(b"hi".to_vec()), ColumnKind::Text), SqlValue::Text("hi".into()));
    }
}
