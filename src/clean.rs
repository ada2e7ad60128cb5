use std::ops::RangeInclusive;

use tracing::debug;

use crate::error::AnalysisError;
use crate::load_clean::Table;
use crate::models::{Cell, COUNTRY_NAME, TIME};

/// The one coercion rule: text that parses as a number becomes that number,
/// anything else (`..`, blanks, NaN) becomes missing.
pub(crate) fn coerce_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(value) => Some(*value).filter(|v| !v.is_nan()),
        Cell::Text(text) => text.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
        Cell::Missing => None,
    }
}

impl Table {
    pub(crate) fn coerce_numeric(&mut self, column: &str) -> Result<(), AnalysisError> {
        let idx = self.column_index(column)?;
        let mut replaced = 0;
        for row in self.rows_mut() {
            let coerced = match coerce_cell(&row[idx]) {
                Some(value) => Cell::Number(value),
                None => {
                    if !row[idx].is_missing() {
                        replaced += 1;
                    }
                    Cell::Missing
                }
            };
            row[idx] = coerced;
        }
        if replaced > 0 {
            debug!("Coerced {} non-numeric values to missing in `{}`", replaced, column);
        }
        Ok(())
    }

    pub(crate) fn coerce_numeric_columns(&mut self, columns: &[&str]) -> Result<(), AnalysisError> {
        for column in columns {
            self.coerce_numeric(column)?;
        }
        Ok(())
    }

    /// Numeric view of a column through `coerce_cell`; never mutates.
    pub(crate) fn numeric(&self, column: &str) -> Result<Vec<Option<f64>>, AnalysisError> {
        Ok(self.column(column)?.into_iter().map(coerce_cell).collect())
    }

    pub(crate) fn drop_missing(&self) -> Table {
        let rows = self
            .rows()
            .iter()
            .filter(|row| !row.iter().any(Cell::is_missing))
            .cloned()
            .collect();
        self.with_rows(rows)
    }

    pub(crate) fn filter_rows<F>(&self, column: &str, keep: F) -> Result<Table, AnalysisError>
    where
        F: Fn(&Cell) -> bool,
    {
        let idx = self.column_index(column)?;
        let rows = self
            .rows()
            .iter()
            .filter(|row| keep(&row[idx]))
            .cloned()
            .collect();
        Ok(self.with_rows(rows))
    }

    pub(crate) fn filter_year(&self, year: i32) -> Result<Table, AnalysisError> {
        self.filter_rows(TIME, |cell| coerce_cell(cell) == Some(f64::from(year)))
    }

    pub(crate) fn filter_year_range(&self, years: RangeInclusive<i32>) -> Result<Table, AnalysisError> {
        if years.is_empty() {
            return Err(AnalysisError::InvalidYearRange {
                from: *years.start(),
                to: *years.end(),
            });
        }
        let (from, to) = (f64::from(*years.start()), f64::from(*years.end()));
        self.filter_rows(TIME, |cell| {
            coerce_cell(cell).is_some_and(|year| year >= from && year <= to)
        })
    }

    pub(crate) fn filter_countries<S: AsRef<str>>(&self, countries: &[S]) -> Result<Table, AnalysisError> {
        self.filter_rows(COUNTRY_NAME, |cell| {
            cell.as_text()
                .is_some_and(|name| countries.iter().any(|c| c.as_ref() == name))
        })
    }
}
