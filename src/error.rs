//! Error types for loading grid models and reference data.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading one of the input datasets.
///
/// Every variant is fatal for a run: the comparison needs all three inputs.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no header rows", .0.display())]
    EmptyHeader(PathBuf),

    #[error("{} is missing column {column}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}, row {row}: invalid value {value:?} in column {column}", path.display())]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{component} {id} in network {network} references unknown bus {bus}")]
    DanglingBus {
        network: String,
        component: &'static str,
        id: String,
        bus: String,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path)
        } else {
            LoadError::Io { path, source }
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        LoadError::Csv {
            path: path.into(),
            source,
        }
    }
}
