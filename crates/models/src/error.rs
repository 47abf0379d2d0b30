use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoopError {
    #[error("Required file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Required column(s) missing from {table}: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Duplicate column {column} in {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Invalid value {value:?} in column {column}")]
    InvalidValue { column: String, value: String },

    #[error("Player not found in processed data: {player_id}")]
    PlayerNotFound { player_id: i64 },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HoopError {
    pub fn missing_columns(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::MissingColumns {
            table: table.into(),
            columns,
        }
    }

    /// True for errors caused by a pipeline stage that has not run yet.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }
}

pub type Result<T> = std::result::Result<T, HoopError>;
