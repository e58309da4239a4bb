//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::results::Row;
use crate::types::SqlValue;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<SqlValue>) -> Row {
    Row::new(Arc::new(column_names), values)
}
