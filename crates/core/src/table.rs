//! Uniform tabular shape shared by registers and tracked tables.
//!
//! Both external sources are normalised into a [`Table`]: an ordered list of unique column names
//! and rows that carry exactly one [`Scalar`] per column. Column names and order are preserved end
//! to end so exported CSV headers match the source. Lookups ignore surrounding whitespace, so
//! names are unique after trimming.

use crate::{SyncError, SyncResult};
use std::collections::HashSet;
use std::fmt;

/// A single cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Empty => true,
            Scalar::Text(s) => s.is_empty(),
            Scalar::Number(_) | Scalar::Bool(_) => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => f.write_str(&format_number(*n)),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Empty => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Renders a number without scientific notation.
///
/// Integral values print with no fractional part, so a ten digit NHS number stored as a float
/// comes out as the digits a clinician would type.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e18 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// One row of a [`Table`], aligned with the table's columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    cells: Vec<Scalar>,
}

impl Row {
    pub fn cells(&self) -> &[Scalar] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.cells.get(index)
    }
}

/// Ordered columns plus ordered rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateColumn`] if a non-blank column name appears twice, ignoring
    /// surrounding whitespace.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> SyncResult<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        for column in &columns {
            let key = column.trim();
            if !key.is_empty() && !seen.insert(key) {
                return Err(SyncError::DuplicateColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }

        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
        })
    }

    /// Convenience constructor from string literals, mainly for tests and fixtures.
    pub fn from_rows<C, R, S>(name: &str, columns: C, rows: R) -> SyncResult<Self>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        let mut table = Table::new(name, columns.into_iter().map(Into::into).collect())?;
        for row in rows {
            table.push_row(row.into_iter().map(Into::into).collect())?;
        }
        Ok(table)
    }

    /// Appends a row, padding short rows with [`Scalar::Empty`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RaggedRow`] if the row has more cells than the table has columns.
    pub fn push_row(&mut self, mut cells: Vec<Scalar>) -> SyncResult<()> {
        if cells.len() > self.columns.len() {
            return Err(SyncError::RaggedRow {
                table: self.name.clone(),
                row: self.rows.len() + 1,
                cells: cells.len(),
                columns: self.columns.len(),
            });
        }
        cells.resize(self.columns.len(), Scalar::Empty);
        self.rows.push(Row { cells });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a column by name, ignoring surrounding whitespace on either side.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        let column = column.trim();
        self.columns.iter().position(|c| c.trim() == column)
    }

    /// Looks up the index of the identifier column.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingIdentifierColumn`] if the column is absent.
    pub fn require_column(&self, column: &str) -> SyncResult<usize> {
        self.column_index(column)
            .ok_or_else(|| SyncError::MissingIdentifierColumn {
                table: self.name.clone(),
                column: column.to_owned(),
            })
    }

    /// Returns an empty table with the same name and columns.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// Keeps rows for which `keep` returns true, preserving order.
    pub fn filter_rows(&self, mut keep: impl FnMut(&Row) -> bool) -> Self {
        let mut out = self.empty_like();
        out.rows = self.rows.iter().filter(|r| keep(*r)).cloned().collect();
        out
    }
}
