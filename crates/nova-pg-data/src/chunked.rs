//! Chunked retrieval of query results
//!
//! [`fetch_batches`] executes a query once and returns a [`BatchIter`], a lazy,
//! single-pass sequence of row batches: memory use is bounded by the batch size.
//! [`fetch_in_chunks`] drives the same iterator to completion and returns every
//! row at once, for callers that want the whole result set.
//!
//! Iteration stops at the first empty retrieval (end-of-data). A query returning
//! exactly `batch_size` rows therefore takes two retrievals: one full batch and
//! one empty one.

use futures::Stream;
use tracing::{debug, info, trace};

use crate::cursor::Cursor;
use crate::error::{DataError, DataResult};
use crate::value::Row;

/// Rows per retrieval when the caller does not choose
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 2000;

/// Column names plus every row of a result set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Lazy, single-pass batches of one query's rows
///
/// Once the end-of-data signal (or an error) has been seen the iterator is
/// exhausted and never touches the cursor again. Re-running the query is the
/// only way to start over.
pub struct BatchIter<'c, C: Cursor + ?Sized> {
    cursor: &'c mut C,
    columns: Vec<String>,
    table_name: String,
    batch_size: usize,
    batches: usize,
    rows: usize,
    exhausted: bool,
}

impl<'c, C: Cursor + ?Sized> BatchIter<'c, C> {
    /// Column names, read once right after the query executed
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of non-empty batches yielded so far
    pub const fn batch_count(&self) -> usize {
        self.batches
    }

    /// Number of rows yielded so far
    pub const fn row_count(&self) -> usize {
        self.rows
    }

    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Retrieve the next batch, or `None` at end-of-data
    ///
    /// # Errors
    /// - `DataError::Driver` if retrieval fails (the iterator is then exhausted)
    /// - `DataError::BatchOverflow` / `DataError::RowWidthMismatch` if the cursor
    ///   breaks the batch contract
    pub async fn next_batch(&mut self) -> DataResult<Option<Vec<Row>>> {
        if self.exhausted {
            return Ok(None);
        }

        let batch = match self.cursor.fetch_many(self.batch_size).await {
            Ok(batch) => batch,
            Err(error) => {
                self.exhausted = true;
                return Err(error);
            }
        };

        if batch.is_empty() {
            self.exhausted = true;
            debug!(
                table = %self.table_name,
                batches = self.batches,
                rows = self.rows,
                "Reached end of result set"
            );
            return Ok(None);
        }

        if let Err(error) = self.check_batch(&batch) {
            self.exhausted = true;
            return Err(error);
        }

        self.batches = self.batches.saturating_add(1);
        self.rows = self.rows.saturating_add(batch.len());
        trace!(
            table = %self.table_name,
            batch = self.batches,
            batch_rows = batch.len(),
            "Fetched batch"
        );
        Ok(Some(batch))
    }

    fn check_batch(&self, batch: &[Row]) -> DataResult<()> {
        if batch.len() > self.batch_size {
            return Err(DataError::BatchOverflow {
                batch_size: self.batch_size,
                returned: batch.len(),
            });
        }
        let expected = self.columns.len();
        match batch.iter().find(|row| row.len() != expected) {
            Some(row) => Err(DataError::RowWidthMismatch {
                expected,
                actual: row.len(),
            }),
            None => Ok(()),
        }
    }

    /// Consume the iterator, keeping only the column names
    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }

    /// Expose the remaining batches as a `futures::Stream`
    pub fn into_stream(self) -> impl Stream<Item = DataResult<Vec<Row>>> + 'c {
        futures::stream::try_unfold(self, |mut batches| async move {
            let next = batches.next_batch().await?;
            Ok::<_, DataError>(next.map(|batch| (batch, batches)))
        })
    }
}

fn validate_batch_size(batch_size: usize) -> DataResult<()> {
    if batch_size == 0 {
        Err(DataError::InvalidBatchSize { batch_size })
    } else {
        Ok(())
    }
}

/// Execute `query` on `cursor` and return a lazy sequence of row batches
///
/// `table_name` only labels log events.
///
/// # Errors
/// - `DataError::InvalidBatchSize` if `batch_size` is zero (nothing is executed)
/// - `DataError::Driver` if the query fails
pub async fn fetch_batches<'c, C: Cursor + ?Sized>(
    cursor: &'c mut C,
    query: &str,
    table_name: &str,
    batch_size: usize,
) -> DataResult<BatchIter<'c, C>> {
    validate_batch_size(batch_size)?;

    cursor.query(query).await?;
    let columns = cursor.columns().to_vec();
    debug!(
        table = table_name,
        batch_size,
        columns = columns.len(),
        "Executed query for chunked fetch"
    );

    Ok(BatchIter {
        cursor,
        columns,
        table_name: table_name.to_string(),
        batch_size,
        batches: 0,
        rows: 0,
        exhausted: false,
    })
}

/// Execute `query` and collect every row, retrieving `batch_size` rows at a time
///
/// Transfers are bounded by `batch_size`, but the returned [`FetchResult`] holds
/// the whole result set. Use [`fetch_batches`] to keep memory bounded too.
///
/// # Errors
/// - `DataError::InvalidBatchSize` if `batch_size` is zero (nothing is executed)
/// - `DataError::Driver` if execution or any retrieval fails
pub async fn fetch_in_chunks<C: Cursor + ?Sized>(
    cursor: &mut C,
    query: &str,
    table_name: &str,
    batch_size: usize,
) -> DataResult<FetchResult> {
    let mut batches = fetch_batches(cursor, query, table_name, batch_size).await?;

    let mut rows = Vec::new();
    while let Some(batch) = batches.next_batch().await? {
        rows.extend(batch);
    }

    info!(
        table = table_name,
        rows = rows.len(),
        batches = batches.batch_count(),
        "Fetched result set in chunks"
    );
    Ok(FetchResult {
        columns: batches.into_columns(),
        rows,
    })
}

/// [`fetch_in_chunks`] with [`DEFAULT_FETCH_BATCH_SIZE`]
///
/// # Errors
/// Same as [`fetch_in_chunks`]
pub async fn fetch_in_chunks_default<C: Cursor + ?Sized>(
    cursor: &mut C,
    query: &str,
    table_name: &str,
) -> DataResult<FetchResult> {
    fetch_in_chunks(cursor, query, table_name, DEFAULT_FETCH_BATCH_SIZE).await
}
