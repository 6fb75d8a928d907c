//! `Frame`: a plain in-memory table implementing both sides of the
//! serialization traits. Tests and simple callers use it directly; hosts
//! with their own column representation implement the traits instead.

use crate::types::{Column, ColumnRef, DestTable, SourceTable};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<(String, Column)>,
    key_columns: Vec<usize>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the key columns (0-based positions, key order significant).
    pub fn with_key_columns(mut self, keys: Vec<usize>) -> Self {
        self.key_columns = keys;
        self
    }

    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> &mut Self {
        debug_assert!(
            self.columns.is_empty() || self.columns[0].1.len() == column.len(),
            "all columns must have the same row count"
        );
        self.columns.push((name.into(), column));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }
}

impl SourceTable for Frame {
    fn nr_of_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    fn nr_of_cols(&self) -> usize {
        self.columns.len()
    }

    fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    fn col_name(&self, col: usize) -> &str {
        &self.columns[col].0
    }

    fn column(&self, col: usize) -> ColumnRef<'_> {
        self.columns[col].1.as_ref()
    }
}

impl DestTable for Frame {
    fn init(&mut self, nr_of_cols: usize, _nr_of_rows: usize) {
        self.columns.clear();
        self.columns.reserve(nr_of_cols);
        self.key_columns.clear();
    }

    fn set_column(&mut self, col: usize, name: &str, column: Column) {
        if col < self.columns.len() {
            self.columns[col] = (name.to_string(), column);
        } else {
            debug_assert_eq!(col, self.columns.len());
            self.columns.push((name.to_string(), column));
        }
    }
}
