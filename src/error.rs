use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn the source document into records.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document must be an array of records")]
    NotASequence,

    #[error("record {index} is not an object")]
    RecordNotObject { index: usize },

    #[error("record {index}: missing or invalid field '{field}'")]
    InvalidField { index: usize, field: &'static str },
}

#[derive(Error, Debug)]
pub enum PadiError {
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PadiError>;

#[cfg(feature = "python")]
impl From<PadiError> for pyo3::PyErr {
    fn from(err: PadiError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        match err {
            PadiError::InvalidParameter(_) => PyValueError::new_err(err.to_string()),
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}
