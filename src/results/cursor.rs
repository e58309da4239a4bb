use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::cast::{cast, column_kinds};
use super::row::{FetchedRow, OrderedRow, Row, column_index};
use crate::driver::{DriverRows, FieldMeta};
use crate::error::SqlClientError;
use crate::types::{ColumnKind, FetchShape, SqlValue};

/// Identity of one executed result set, unique within its `Connection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultSetId(u64);

impl ResultSetId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResultSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rs#{}", self.0)
    }
}

/// Typed view over a buffered driver result set.
///
/// Column kinds are read from the driver metadata on the first fetch and reused for
/// every row after that, so a column keeps one type across the whole result. The driver
/// result set is released when the cursor is dropped or [`Cursor::free`]d.
pub struct Cursor {
    id: ResultSetId,
    sql: String,
    rows: Box<dyn DriverRows>,
    fields: Vec<FieldMeta>,
    column_names: Arc<Vec<String>>,
    column_index_cache: Arc<HashMap<String, usize>>,
    kinds: OnceCell<Vec<ColumnKind>>,
    native_types: bool,
    num_rows: usize,
    shape: FetchShape,
}

impl Cursor {
    pub fn new(
        id: ResultSetId,
        sql: impl Into<String>,
        rows: Box<dyn DriverRows>,
        native_types: bool,
    ) -> Self {
        let fields = rows.fields();
        let column_names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        let column_index_cache = Arc::new(column_index(&column_names));
        let num_rows = rows.num_rows();
        Self {
            id,
            sql: sql.into(),
            rows,
            fields,
            column_names: Arc::new(column_names),
            column_index_cache,
            kinds: OnceCell::new(),
            native_types,
            num_rows,
            shape: FetchShape::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ResultSetId {
        self.id
    }

    /// Statement that produced this result set.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn default_shape(&self) -> FetchShape {
        self.shape
    }

    pub fn set_default_shape(&mut self, shape: FetchShape) -> &mut Self {
        self.shape = shape;
        self
    }

    /// Rewind to the first row.
    pub fn reset(&mut self) -> &mut Self {
        if self.num_rows > 0 {
            self.rows.seek(0);
        }
        self
    }

    /// Column kinds, if the cast layer has been initialised.
    #[must_use]
    pub fn column_kinds(&self) -> Option<&[ColumnKind]> {
        self.kinds.get().map(Vec::as_slice)
    }

    fn next_values(&mut self) -> Option<Vec<SqlValue>> {
        let raw = self.rows.fetch_row()?;
        if self.native_types {
            return Some(raw);
        }
        let kinds = self.kinds.get_or_init(|| {
            tracing::trace!(result_set = %self.id, columns = self.fields.len(), "inferring column kinds");
            column_kinds(&self.fields)
        });
        Some(
            raw.into_iter()
                .enumerate()
                .map(|(i, value)| cast(value, kinds.get(i).copied().unwrap_or(ColumnKind::Text)))
                .collect(),
        )
    }

    /// Next row as a `Row`, or `None` once the result set is exhausted.
    pub fn fetch_record(&mut self, reset: bool) -> Option<Row> {
        if reset {
            self.reset();
        }
        let values = self.next_values()?;
        Some(Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index_cache),
            values,
        ))
    }

    pub fn fetch_map(&mut self, reset: bool) -> Option<HashMap<String, SqlValue>> {
        self.fetch_record(reset).map(Row::into_map)
    }

    pub fn fetch_ordered(&mut self, reset: bool) -> Option<OrderedRow> {
        self.fetch_record(reset).map(Row::into_ordered)
    }

    /// Next row in the cursor's default shape.
    pub fn fetch(&mut self, reset: bool) -> Option<FetchedRow> {
        let row = self.fetch_record(reset)?;
        Some(match self.shape {
            FetchShape::Record => FetchedRow::Record(row),
            FetchShape::Map => FetchedRow::Map(row.into_map()),
            FetchShape::Ordered => FetchedRow::Ordered(row.into_ordered()),
        })
    }

    /// Next row deserialized into `T` through its JSON object form.
    ///
    /// # Errors
    /// Returns `SqlClientError::JsonError` if the row does not fit `T`.
    pub fn fetch_object<T: DeserializeOwned>(
        &mut self,
        reset: bool,
    ) -> Result<Option<T>, SqlClientError> {
        let Some(row) = self.fetch_record(reset) else {
            return Ok(None);
        };
        let object = serde_json::Value::Object(row.to_json()?);
        Ok(Some(serde_json::from_value(object)?))
    }

    /// Every row in the default shape, starting from the first.
    pub fn fetch_all(&mut self) -> Vec<FetchedRow> {
        self.reset();
        std::iter::from_fn(|| self.fetch(false)).collect()
    }

    pub fn fetch_all_records(&mut self) -> Vec<Row> {
        self.reset();
        std::iter::from_fn(|| self.fetch_record(false)).collect()
    }

    pub fn fetch_all_maps(&mut self) -> Vec<HashMap<String, SqlValue>> {
        self.fetch_all_records().into_iter().map(Row::into_map).collect()
    }

    pub fn fetch_all_ordered(&mut self) -> Vec<OrderedRow> {
        self.fetch_all_records()
            .into_iter()
            .map(Row::into_ordered)
            .collect()
    }

    /// # Errors
    /// Returns `SqlClientError::JsonError` if any row does not fit `T`.
    pub fn fetch_all_objects<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, SqlClientError> {
        self.fetch_all_records()
            .iter()
            .map(|row| -> Result<T, SqlClientError> {
                Ok(serde_json::from_value(serde_json::Value::Object(row.to_json()?))?)
            })
            .collect()
    }

    /// Value of `column` from the last row that has one.
    ///
    /// Rows are walked from the end. With `skip_nulls` a row whose value is `NULL` is
    /// passed over; without it the walk stops at the first row scanned, so a trailing
    /// `NULL` is returned as is. An unknown column yields `None` either way.
    pub fn fetch_column(&mut self, column: &str, skip_nulls: bool) -> Option<SqlValue> {
        let rows = self.fetch_all_records();
        for row in rows.into_iter().rev() {
            match row.get(column) {
                Some(value) if skip_nulls && value.is_null() => {}
                Some(value) => return Some(value.clone()),
                None if skip_nulls => {}
                None => break,
            }
        }
        None
    }

    /// Every value of `column`, walking forward with the same policy as `fetch_column`.
    pub fn fetch_all_column(&mut self, column: &str, skip_nulls: bool) -> Vec<SqlValue> {
        let mut values = Vec::new();
        for row in self.fetch_all_records() {
            match row.get(column) {
                Some(value) if skip_nulls && value.is_null() => {}
                Some(value) => values.push(value.clone()),
                None if skip_nulls => {}
                None => break,
            }
        }
        values
    }

    /// `key_column → value_column` pairs in first-seen key order; a repeated key keeps its
    /// position and takes the later value.
    pub fn fetch_array_pair(
        &mut self,
        key_column: &str,
        value_column: &str,
    ) -> Vec<(SqlValue, SqlValue)> {
        let mut pairs: Vec<(SqlValue, SqlValue)> = Vec::new();
        for row in self.fetch_all_records() {
            let (Some(key), Some(value)) = (row.get(key_column), row.get(value_column)) else {
                continue;
            };
            if let Some(slot) = pairs.iter_mut().find(|(k, _)| k == key) {
                slot.1 = value.clone();
            } else {
                pairs.push((key.clone(), value.clone()));
            }
        }
        pairs
    }

    /// All rows as a JSON array of objects in column order.
    ///
    /// # Errors
    /// Returns `SqlClientError::JsonError` if serialization fails.
    pub fn json(&mut self) -> Result<String, SqlClientError> {
        Ok(serde_json::to_string(&self.fetch_all_ordered())?)
    }

    /// Release the driver result set now.
    pub fn free(self) {
        drop(self);
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        tracing::trace!(result_set = %self.id, "freeing result set");
        self.rows.free();
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("sql", &self.sql)
            .field("columns", &self.column_names)
            .field("num_rows", &self.num_rows)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, DriverOutcome, field_type};
    use crate::test_utils::ScriptedDriver;

    fn cursor_over(driver: &ScriptedDriver) -> Cursor {
        let mut exec = driver.clone();
        match exec.execute("SELECT") {
            DriverOutcome::Rows(rows) => Cursor::new(ResultSetId::new(1), "SELECT", rows, false),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn integer_columns_stay_integer_for_text_cells() {
        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("id", field_type::LONG), ("name", field_type::VAR_STRING)],
            vec![
                vec!["1".into(), "a".into()],
                vec!["2x".into(), SqlValue::Int(5)],
            ],
        );
        let mut cursor = cursor_over(&driver);
        let rows = cursor.fetch_all_records();
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(rows[1].get("id"), Some(&SqlValue::Int(2)));
        assert_eq!(rows[1].get("name"), Some(&SqlValue::Text("5".into())));
        assert_eq!(
            cursor.column_kinds(),
            Some(&[ColumnKind::Int, ColumnKind::Text][..])
        );
    }

    #[test]
    fn fetch_all_is_repeatable() {
        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("n", field_type::LONG)],
            vec![vec![1.into()], vec![2.into()]],
        );
        let mut cursor = cursor_over(&driver);
        let first = cursor.fetch_all();
        cursor.reset();
        let second = cursor.fetch_all();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(cursor.fetch(false).is_none());
        assert!(cursor.fetch(true).is_some());
    }

    #[test]
    fn fetch_column_walks_from_the_end() {
        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("c", field_type::LONG)],
            vec![vec![SqlValue::Null], vec![5.into()]],
        );
        let mut cursor = cursor_over(&driver);
        assert_eq!(cursor.fetch_column("c", true), Some(SqlValue::Int(5)));
        assert_eq!(cursor.fetch_column("c", false), Some(SqlValue::Int(5)));
        assert_eq!(cursor.fetch_column("missing", false), None);
        assert_eq!(cursor.fetch_all_column("c", true), vec![SqlValue::Int(5)]);
        assert_eq!(
            cursor.fetch_all_column("c", false),
            vec![SqlValue::Null, SqlValue::Int(5)]
        );
    }

    #[test]
    fn trailing_null_is_skipped_only_when_asked() {
        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("c", field_type::LONG)],
            vec![vec![7.into()], vec![SqlValue::Null]],
        );
        let mut cursor = cursor_over(&driver);
        assert_eq!(cursor.fetch_column("c", true), Some(SqlValue::Int(7)));
        assert_eq!(cursor.fetch_column("c", false), Some(SqlValue::Null));
    }

    #[test]
    fn array_pair_overwrites_duplicate_keys() {
        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("k", field_type::VAR_STRING), ("v", field_type::LONG)],
            vec![
                vec!["a".into(), "1".into()],
                vec!["b".into(), "2".into()],
                vec!["a".into(), "3".into()],
            ],
        );
        let mut cursor = cursor_over(&driver);
        assert_eq!(
            cursor.fetch_array_pair("k", "v"),
            vec![
                (SqlValue::Text("a".into()), SqlValue::Int(3)),
                (SqlValue::Text("b".into()), SqlValue::Int(2)),
            ]
        );
        assert!(cursor.fetch_array_pair("k", "nope").is_empty());
    }

    #[test]
    fn drop_frees_exactly_once() {
        let driver = ScriptedDriver::new();
        driver.push_rows(&[("n", field_type::LONG)], vec![]);
        let cursor = cursor_over(&driver);
        assert!(cursor.is_empty());
        cursor.free();
        assert_eq!(driver.frees(), 1);
    }

    #[test]
    fn shapes_and_json() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: i64,
            label: String,
        }

        let driver = ScriptedDriver::new();
        driver.push_rows(
            &[("id", field_type::LONG), ("label", field_type::VAR_STRING)],
            vec![vec!["3".into(), "x".into()]],
        );
        let mut cursor = cursor_over(&driver);
        cursor.set_default_shape(FetchShape::Map);
        assert!(matches!(cursor.fetch(false), Some(FetchedRow::Map(_))));

        let item: Option<Item> = cursor.fetch_object(true).unwrap();
        assert_eq!(
            item,
            Some(Item {
                id: 3,
                label: "x".into()
            })
        );
        assert_eq!(cursor.json().unwrap(), r#"[{"id":3,"label":"x"}]"#);
    }
}
