//! Error types for the driver.

use std::path::PathBuf;

use schemata_core::types::DialectKind;
use schemata_core::{ConfigurationError, MigrateError, SchemaReadError};

/// Errors raised while loading inputs or talking to the database.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An input file is not valid JSON for its format.
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A plan was generated for a different database than the one connected.
    #[error("Cannot execute a {actual} plan against a {expected} database")]
    DialectMismatch {
        /// Dialect of the connected database.
        expected: DialectKind,
        /// Dialect the plan was generated for.
        actual: DialectKind,
    },

    /// Entity metadata is inconsistent.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The live schema could not be read.
    #[error(transparent)]
    SchemaRead(#[from] SchemaReadError),

    /// Comparison or generation failed.
    #[error(transparent)]
    Migrate(#[from] MigrateError),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
