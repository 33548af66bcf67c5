//! Error types for cursor operations

use nova_pg_config::ConfigError;
use thiserror::Error;

/// Errors raised by cursor helpers
///
/// Driver failures are carried unchanged in [`DataError::Driver`]; nothing in this
/// crate retries or swallows them.
#[derive(Error, Debug)]
pub enum DataError {
    /// Batch or chunk size of zero
    #[error("Batch size must be a positive integer, got {batch_size}")]
    InvalidBatchSize { batch_size: usize },

    /// Rows were requested before any query opened a result set
    #[error("No result set: run a query before fetching rows")]
    NoResultSet,

    /// A row does not line up with the column list
    #[error("Row has {actual} values but the result set has {expected} columns")]
    RowWidthMismatch { expected: usize, actual: usize },

    /// The cursor returned more rows than were requested
    #[error("Cursor returned {returned} rows for a batch of at most {batch_size}")]
    BatchOverflow { batch_size: usize, returned: usize },

    /// Bulk insert called with no rows
    #[error("The provided row set for {table} is empty and cannot be inserted")]
    EmptyInsert { table: String },

    /// Column type name with no PostgreSQL mapping
    #[error("Unsupported column type '{name}'")]
    UnsupportedColumnType { name: String },

    /// Result column whose PostgreSQL type has no `Value` mapping
    #[error("Column '{column}' has unsupported type {type_name} (cast it to text in the query)")]
    UnsupportedValueType { column: String, type_name: String },

    #[error("Schema '{schema}' does not exist")]
    SchemaNotFound { schema: String },

    #[error("Table '{schema}.{table}' already exists")]
    TableAlreadyExists { schema: String, table: String },

    /// Credential loading failed before a connection was attempted
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error from the PostgreSQL driver, passed through untouched
    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

impl DataError {
    /// True for caller mistakes caught before the database was touched
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidBatchSize { .. }
                | Self::EmptyInsert { .. }
                | Self::UnsupportedColumnType { .. }
                | Self::RowWidthMismatch { .. }
        )
    }
}

/// Result type for cursor operations
pub type DataResult<T> = Result<T, DataError>;
