use std::sync::Arc;

use crate::types::DbValue;

/// A single fetched row with access by column name or position.
///
/// Column names are shared across all rows of a result set.
#[derive(Debug, Clone)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<DbValue>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<DbValue>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[DbValue] {
        &self.values
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&DbValue> {
        let idx = self.column_names.iter().position(|c| c == column_name)?;
        self.values.get(idx)
    }

    /// Look up a value by position.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }
}

/// All rows fetched from a statement, in order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The fetched rows.
    pub results: Vec<Row>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub fn add_row(&mut self, row: Row) {
        self.results.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
