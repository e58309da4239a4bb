use rusqlite::types::Value;

use crate::driver::{DriverRows, FieldMeta, field_type};
use crate::error::SqlClientError;
use crate::types::SqlValue;

/// A fully materialized SQLite result set.
#[derive(Debug, Clone, Default)]
pub struct SqliteRows {
    fields: Vec<FieldMeta>,
    rows: Vec<Vec<SqlValue>>,
    offset: usize,
}

impl SqliteRows {
    /// Run `stmt` and buffer every row.
    ///
    /// # Errors
    /// Returns `SqlClientError::SqliteError` if stepping the statement fails.
    pub fn collect(stmt: &mut rusqlite::Statement<'_>) -> Result<Self, SqlClientError> {
        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        let col_count = column_names.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(col_count);
            for idx in 0..col_count {
                values.push(extract_value(row, idx)?);
            }
            rows.push(values);
        }

        let fields = column_names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| FieldMeta::new(name, type_code(&rows, idx)))
            .collect();

        Ok(Self {
            fields,
            rows,
            offset: 0,
        })
    }
}

fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<SqlValue, SqlClientError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Bytes(b),
    })
}

/// SQLite columns are untyped; report the type of the first non-null cell.
fn type_code(rows: &[Vec<SqlValue>], idx: usize) -> u16 {
    let first = rows
        .iter()
        .filter_map(|row| row.get(idx))
        .find(|value| !value.is_null());
    match first {
        Some(SqlValue::Int(_)) => field_type::LONGLONG,
        Some(SqlValue::Float(_)) => field_type::DOUBLE,
        Some(SqlValue::Bytes(_)) => field_type::BLOB,
        Some(_) => field_type::VAR_STRING,
        None => field_type::NULL,
    }
}

impl DriverRows for SqliteRows {
    fn fields(&self) -> Vec<FieldMeta> {
        self.fields.clone()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn seek(&mut self, offset: usize) -> bool {
        if offset > self.rows.len() {
            return false;
        }
        self.offset = offset;
        true
    }

    fn fetch_row(&mut self) -> Option<Vec<SqlValue>> {
        let row = self.rows.get(self.offset).cloned()?;
        self.offset += 1;
        Some(row)
    }

    fn free(&mut self) {
        self.rows = Vec::new();
        self.offset = 0;
    }
}
