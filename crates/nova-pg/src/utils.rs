//! Cursors and chunked retrieval

pub use nova_pg_data::{
    BatchIter, BoxFuture, Cursor, DEFAULT_FETCH_BATCH_SIZE, DataError, DataResult, Decimal,
    FetchResult, Interval, PgCursor, Row, Value, fetch_batches, fetch_in_chunks,
    fetch_in_chunks_default, get_cursor, get_cursor_for_env, with_cursor,
};
