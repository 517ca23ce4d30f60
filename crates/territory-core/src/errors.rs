//! Error types for the territory core library.

/// Top-level error enum for the territory core library.
#[derive(Debug, thiserror::Error)]
pub enum TerritoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<TerritoryError> for pyo3::PyErr {
    fn from(err: TerritoryError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyKeyError, PyRuntimeError, PyValueError};

        match &err {
            TerritoryError::Database(_) | TerritoryError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            TerritoryError::Import(_) | TerritoryError::Validation(_) => {
                PyValueError::new_err(err.to_string())
            }
            TerritoryError::NotFound(_) => PyKeyError::new_err(err.to_string()),
            TerritoryError::Io(_) => PyIOError::new_err(err.to_string()),
            TerritoryError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type TerritoryResult<T> = Result<T, TerritoryError>;
