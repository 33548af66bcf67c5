//! Cursor access and chunked retrieval for PostgreSQL
//!
//! - [`cursor`]: the [`Cursor`] trait, the sqlx-backed [`PgCursor`] and scoped
//!   acquisition with [`with_cursor`]
//! - [`chunked`]: [`fetch_in_chunks`] and the lazy [`fetch_batches`]
//! - [`toolbox`]: schema, table and bulk-insert helpers
//! - [`mock`]: [`MockCursor`] for tests that need no database

// Module declarations
pub mod chunked;
pub mod cursor;
pub mod error;
pub mod toolbox;
pub mod value;

pub mod mock;
pub use mock::{MockCall, MockCursor};

// Public exports
pub use chunked::{
    BatchIter, DEFAULT_FETCH_BATCH_SIZE, FetchResult, fetch_batches, fetch_in_chunks,
    fetch_in_chunks_default,
};
pub use cursor::{Cursor, PgCursor, get_cursor, get_cursor_for_env, with_cursor};
pub use error::{DataError, DataResult};
pub use toolbox::{
    ColumnType, DEFAULT_INSERT_CHUNK_SIZE, create_schema, create_table, execute_query, fetch_one,
    fetch_query, insert_rows, quote_ident, quote_literal, schema_exists, table_exists,
};
pub use value::{Interval, Row, Value, encode_csv};

// Re-exports for callers building futures for `with_cursor` and decimal values
pub use futures::future::BoxFuture;
pub use rust_decimal::Decimal;
