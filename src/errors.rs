//! Centralized error handling for datadict
//!
//! All fallible operations in the crate return [`Result`], carrying a
//! [`DataDictError`] that names the offending field, axis or file.

use thiserror::Error;

/// Main error type for datadict operations
#[derive(Debug, Error)]
pub enum DataDictError {
    /// Container failed validation; one entry per problem found
    #[error("Validation failed:\n{}", format_problems(.0))]
    Validation(Vec<String>),

    /// Field not present in the container
    #[error("No field '{name}' present")]
    FieldNotFound { name: String },

    /// Metadata key not present (on the container or on a field)
    #[error("Meta data '{key}' not found{}", on_field(.field))]
    MetaNotFound { key: String, field: Option<String> },

    /// Group not present in a data file
    #[error("Group '{name}' does not exist in {path}")]
    GroupNotFound { name: String, path: String },

    /// Two containers do not share fields, units and axes
    #[error("Incompatible data structures: {message}")]
    IncompatibleStructure { message: String },

    /// Dependents do not share the same axes
    #[error("Incompatible axes: {message}")]
    IncompatibleAxes { message: String },

    /// Invalid axis order specification
    #[error("Invalid axis order: {message}")]
    InvalidOrder { message: String },

    /// Grid shape could not be determined or applied
    #[error("Cannot grid data: {message}")]
    GridInference { message: String },

    /// Array shape does not fit the requested operation
    #[error("Invalid shape: {message}")]
    InvalidShape { message: String },

    /// Invalid argument to an operation
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Metadata or configuration (de)serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!(" * {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn on_field(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" on field '{f}'"),
        None => String::new(),
    }
}

impl DataDictError {
    pub(crate) fn field_not_found(name: &str) -> Self {
        Self::FieldNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for datadict operations
pub type Result<T> = std::result::Result<T, DataDictError>;
