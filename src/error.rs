use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AnalysisError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    EmptyHeader,

    #[error("column `{0}` not found in header")]
    MissingColumn(String),

    #[error("row {row} has {found} cells, header has {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("year range {from}..={to} is empty")]
    InvalidYearRange { from: i32, to: i32 },
}
