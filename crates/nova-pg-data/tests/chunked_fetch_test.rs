//! Chunked fetch behaviour against the in-memory cursor

use async_trait::async_trait;
use nova_pg_data::{
    Cursor, DataError, DataResult, MockCall, MockCursor, Row, Value, fetch_batches,
    fetch_in_chunks,
};

fn ohlcv_rows(count: i64) -> Vec<Row> {
    (0..count)
        .map(|i| vec![Value::from("AAPL"), Value::from(100 + i), Value::from(0.5)])
        .collect()
}

#[tokio::test]
async fn test_twenty_five_rows_in_batches_of_ten() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["symbol", "volume", "change"], ohlcv_rows(25));

    let result = fetch_in_chunks(&mut cursor, "SELECT * FROM raw.ohlcv;", "raw.ohlcv", 10)
        .await
        .expect("fetch should succeed");

    assert_eq!(result.columns, vec!["symbol", "volume", "change"]);
    assert_eq!(result.rows.len(), 25);
    assert_eq!(result.rows, ohlcv_rows(25), "rows must keep query order");
    assert_eq!(cursor.fetch_sizes_returned(), vec![10, 10, 5, 0]);

    // Query runs exactly once, before any retrieval
    let queries = cursor
        .calls()
        .iter()
        .filter(|call| matches!(call, MockCall::Query { .. }))
        .count();
    assert_eq!(queries, 1);
    assert!(matches!(cursor.calls().first(), Some(MockCall::Query { .. })));
}

#[tokio::test]
async fn test_batch_size_one() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["symbol", "volume", "change"], ohlcv_rows(3));

    let result = fetch_in_chunks(&mut cursor, "SELECT * FROM raw.ohlcv", "raw.ohlcv", 1)
        .await
        .expect("fetch should succeed");

    assert_eq!(result.rows.len(), 3);
    assert_eq!(cursor.fetch_sizes_returned(), vec![1, 1, 1, 0]);
}

#[tokio::test]
async fn test_zero_batch_size_is_validation_error() {
    let mut cursor = MockCursor::new();
    let error = fetch_in_chunks(&mut cursor, "SELECT 1", "t", 0)
        .await
        .expect_err("zero batch size must fail");

    assert!(error.is_validation());
    assert!(cursor.calls().is_empty());
}

#[tokio::test]
async fn test_batches_can_be_consumed_incrementally() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["symbol", "volume", "change"], ohlcv_rows(5));

    let mut batches = fetch_batches(&mut cursor, "SELECT * FROM raw.ohlcv", "raw.ohlcv", 4)
        .await
        .expect("query should open");

    let mut total = 0;
    while let Some(batch) = batches.next_batch().await.expect("batch") {
        assert!(batch.len() <= 4);
        total += batch.len();
    }
    assert_eq!(total, 5);
    assert_eq!(batches.batch_count(), 2);
}

/// Cursor that ignores the requested size
struct GreedyCursor {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[async_trait]
impl Cursor for GreedyCursor {
    async fn execute(&mut self, _statement: &str) -> DataResult<u64> {
        Ok(0)
    }

    async fn query(&mut self, _query: &str) -> DataResult<()> {
        Ok(())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn fetch_many(&mut self, _size: usize) -> DataResult<Vec<Row>> {
        Ok(std::mem::take(&mut self.rows))
    }

    async fn copy_in(&mut self, _statement: &str, _data: &[u8]) -> DataResult<u64> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let mut cursor = GreedyCursor {
        columns: vec!["n".to_string()],
        rows: (0..5).map(|n| vec![Value::from(n)]).collect(),
    };

    let error = fetch_in_chunks(&mut cursor, "SELECT n", "t", 2)
        .await
        .expect_err("cursor broke the batch contract");

    assert!(matches!(
        error,
        DataError::BatchOverflow {
            batch_size: 2,
            returned: 5
        }
    ));
}

#[tokio::test]
async fn test_ragged_row_is_rejected() {
    let mut cursor = GreedyCursor {
        columns: vec!["a".to_string(), "b".to_string()],
        rows: vec![vec![Value::from(1), Value::from(2)], vec![Value::from(3)]],
    };

    let error = fetch_in_chunks(&mut cursor, "SELECT a, b", "t", 10)
        .await
        .expect_err("row width differs from columns");

    assert!(matches!(
        error,
        DataError::RowWidthMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[tokio::test]
async fn test_works_through_trait_object() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["n"], vec![vec![Value::from(7)]]);
    let dynamic: &mut dyn Cursor = &mut cursor;

    let result = fetch_in_chunks(dynamic, "SELECT 7 AS n", "t", 100)
        .await
        .expect("fetch should succeed");
    assert_eq!(result.rows, vec![vec![Value::Int(7)]]);
}
