use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use itertools::Itertools;
use tracing::debug;

use crate::error::AnalysisError;
use crate::models::{Cell, COUNTRY_NAME, TIME};

/// Row-oriented table of raw and coerced cells, addressed by exact header name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub(crate) fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, AnalysisError> {
        if let Some((row, cells)) = rows.iter().find_position(|cells| cells.len() != headers.len()) {
            return Err(AnalysisError::RowWidth {
                row,
                found: cells.len(),
                expected: headers.len(),
            });
        }
        Ok(Table { headers, rows })
    }

    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let file = File::open(path.as_ref()).map_err(csv::Error::from)?;
        let table = Self::from_reader(file)?;
        debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers().len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    pub(crate) fn from_reader<R: io::Read>(reader: R) -> Result<Self, AnalysisError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == 0 {
                    name.trim_start_matches('\u{feff}').to_string()
                } else {
                    name.to_string()
                }
            })
            .collect();
        if headers.iter().all(|name| name.is_empty()) {
            return Err(AnalysisError::EmptyHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Footer lines are shorter than the header; pad them out.
            let mut cells: Vec<Cell> = record
                .iter()
                .take(headers.len())
                .map(Cell::from_field)
                .collect();
            cells.resize(headers.len(), Cell::Missing);
            rows.push(cells);
        }

        Table::new(headers, rows)
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn column_index(&self, name: &str) -> Result<usize, AnalysisError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub(crate) fn column(&self, name: &str) -> Result<Vec<&Cell>, AnalysisError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Copy of the table with the positions of two columns exchanged. Names
    /// move with their contents, so lookups by name are unaffected.
    pub(crate) fn swap_columns(&self, first: &str, second: &str) -> Result<Table, AnalysisError> {
        let a = self.column_index(first)?;
        let b = self.column_index(second)?;
        let mut swapped = self.clone();
        swapped.headers.swap(a, b);
        for row in &mut swapped.rows {
            row.swap(a, b);
        }
        Ok(swapped)
    }

    pub(crate) fn head(&self, n: usize) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub(crate) fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Table {
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t{}", self.headers.iter().join(" | "))?;
        for (i, row) in self.rows.iter().enumerate() {
            writeln!(f, "{}\t{}", i, row.iter().join(" | "))?;
        }
        write!(f, "[{} rows x {} columns]", self.rows.len(), self.headers.len())
    }
}

// Load and Clean Data
pub(crate) fn ingest_and_manipulate<P: AsRef<Path>>(
    file_path: P,
) -> Result<(Table, Table, Table), AnalysisError> {
    let original = Table::from_path(file_path)?;
    let swapped = original.swap_columns(COUNTRY_NAME, TIME)?;
    let cleaned = swapped.drop_missing();
    debug!(
        "Dropped {} rows with missing values",
        original.len() - cleaned.len()
    );
    Ok((original, swapped, cleaned))
}
