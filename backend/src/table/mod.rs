//! Column-oriented table used between parsing and record building.
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length.
//! The parser fills it with [`Cell::Text`] / [`Cell::Missing`]; the
//! normalizer then rewrites whole columns with pure functions (cast,
//! rename, wrap, fill) before records are extracted row by row.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

/// Target type of a catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Boolean,
}

impl ColumnType {
    /// Integer and decimal columns default to `0` when missing.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One cell. `Missing` is an empty field in the upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    List(Vec<Cell>),
}

impl Cell {
    /// Empty strings are treated as missing.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if !v.is_empty() => Cell::Text(v.to_string()),
            _ => Cell::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// Ordered sequence of equally long columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table from a header and row-major raw values.
    ///
    /// Short rows are padded with [`Cell::Missing`], extra values are dropped.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let row_count = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                cells: Vec::with_capacity(row_count),
            })
            .collect();

        for row in &rows {
            for (i, column) in columns.iter_mut().enumerate() {
                let raw = row.get(i).and_then(|v| v.as_deref());
                column.cells.push(Cell::from_raw(raw));
            }
        }

        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Rename a column in place, replacing any column already named `to`.
    /// Returns `false` if `from` does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.column(from).is_none() {
            return false;
        }
        if from != to {
            self.columns.retain(|c| c.name != to);
            if let Some(column) = self.columns.iter_mut().find(|c| c.name == from) {
                column.name = to.to_string();
            }
        }
        true
    }

    /// Keep only the columns whose name satisfies `keep`.
    pub fn retain_columns<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.columns.retain(|c| keep(&c.name));
    }

    /// Rewrite every cell of a column with `f(row, cell)`.
    ///
    /// Stops at the first error; the column is left partially rewritten,
    /// which is fine because callers abort on error.
    pub fn try_map_column<E, F>(&mut self, name: &str, mut f: F) -> Result<bool, E>
    where
        F: FnMut(usize, Cell) -> Result<Cell, E>,
    {
        let Some(column) = self.columns.iter_mut().find(|c| c.name == name) else {
            return Ok(false);
        };

        for (row, cell) in column.cells.iter_mut().enumerate() {
            let current = std::mem::replace(cell, Cell::Missing);
            *cell = f(row, current)?;
        }
        Ok(true)
    }

    /// Infallible variant of [`Table::try_map_column`].
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(Cell) -> Cell,
    {
        let result: Result<bool, std::convert::Infallible> =
            self.try_map_column(name, |_, cell| Ok(f(cell)));
        match result {
            Ok(found) => found,
            Err(never) => match never {},
        }
    }

    /// Cell at `(row, column)`, if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        self.column(column).and_then(|c| c.cells.get(row))
    }

    /// Row-major JSON view, keyed by column name.
    pub fn to_json_rows(&self) -> Vec<Value> {
        (0..self.row_count)
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| {
                        let value = serde_json::to_value(&c.cells[row]).unwrap_or(Value::Null);
                        (c.name.clone(), value)
                    })
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}
