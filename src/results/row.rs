use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::types::SqlValue;

/// A row from a query result
///
/// This struct represents a single fetched row, with access to both the column names
/// and the (already cast) values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<SqlValue>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a new row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        let cache = Arc::new(column_index(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    ///
    /// Returns `None` if the column wasn't found.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Plain name → value map. With duplicate column names the last one wins.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, SqlValue> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }

    #[must_use]
    pub fn into_ordered(self) -> OrderedRow {
        OrderedRow(self.column_names.iter().cloned().zip(self.values).collect())
    }

    /// Row as a JSON object, in column order.
    ///
    /// # Errors
    /// Returns `serde_json::Error` if a value cannot be represented as JSON.
    pub fn to_json(&self) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        let mut object = serde_json::Map::with_capacity(self.values.len());
        for (name, value) in self.column_names.iter().zip(&self.values) {
            object.insert(name.clone(), value.to_json()?);
        }
        Ok(object)
    }
}

pub(crate) fn column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// Column-ordered `(name, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedRow(Vec<(String, SqlValue)>);

impl OrderedRow {
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.0
            .iter()
            .find(|(name, _)| name == column_name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, SqlValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<(String, SqlValue)> {
        self.0
    }
}

impl Serialize for OrderedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A row in the cursor's default `FetchShape`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedRow {
    Record(Row),
    Map(HashMap<String, SqlValue>),
    Ordered(OrderedRow),
}

impl FetchedRow {
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        match self {
            FetchedRow::Record(row) => row.get(column_name),
            FetchedRow::Map(map) => map.get(column_name),
            FetchedRow::Ordered(row) => row.get(column_name),
        }
    }
}
