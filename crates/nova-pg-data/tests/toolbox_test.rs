//! Toolbox SQL and COPY payloads against the in-memory cursor

use nova_pg_data::{
    ColumnType, DEFAULT_INSERT_CHUNK_SIZE, DataError, Decimal, Interval, MockCall, MockCursor,
    Row, Value, create_schema, create_table, fetch_one, fetch_query, insert_rows, schema_exists,
    table_exists,
};

fn exists_result(cursor: &mut MockCursor, exists: bool) {
    cursor.push_result(&["exists"], vec![vec![Value::from(exists)]]);
}

fn queries(cursor: &MockCursor) -> Vec<&str> {
    cursor
        .calls()
        .iter()
        .filter_map(|call| match call {
            MockCall::Query { query } => Some(query.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_create_schema_quotes_identifier() {
    let mut cursor = MockCursor::new();
    create_schema(&mut cursor, "raw").await.expect("create schema");
    assert_eq!(cursor.executed(), vec!["CREATE SCHEMA IF NOT EXISTS \"raw\""]);
}

#[tokio::test]
async fn test_existence_checks_escape_literals() {
    let mut cursor = MockCursor::new();
    exists_result(&mut cursor, true);
    exists_result(&mut cursor, false);

    assert!(schema_exists(&mut cursor, "o'brien").await.expect("lookup"));
    assert!(!table_exists(&mut cursor, "raw", "ohlcv").await.expect("lookup"));

    let sent = queries(&cursor);
    assert!(sent[0].contains("nspname = 'o''brien'"));
    assert!(sent[1].contains("table_schema = 'raw' AND table_name = 'ohlcv'"));
}

#[tokio::test]
async fn test_existence_with_no_rows_is_false() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["exists"], Vec::new());
    assert!(!schema_exists(&mut cursor, "raw").await.expect("lookup"));
}

#[tokio::test]
async fn test_create_table_statement() {
    let mut cursor = MockCursor::new();
    exists_result(&mut cursor, true);
    exists_result(&mut cursor, false);

    create_table(
        &mut cursor,
        "raw",
        "ohlcv",
        &[
            ("symbol", ColumnType::Str),
            ("volume", ColumnType::Int),
            ("ts", ColumnType::DateTime),
        ],
    )
    .await
    .expect("create table");

    assert_eq!(
        cursor.executed(),
        vec!["CREATE TABLE \"raw\".\"ohlcv\" (\"symbol\" TEXT, \"volume\" BIGINT, \"ts\" TIMESTAMPTZ)"]
    );
}

#[tokio::test]
async fn test_create_table_requires_schema() {
    let mut cursor = MockCursor::new();
    exists_result(&mut cursor, false);

    let error = create_table(&mut cursor, "nope", "t", &[("id", ColumnType::Int)])
        .await
        .expect_err("schema is missing");

    assert!(matches!(error, DataError::SchemaNotFound { ref schema } if schema == "nope"));
    assert!(cursor.executed().is_empty());
}

#[tokio::test]
async fn test_create_table_refuses_existing_table() {
    let mut cursor = MockCursor::new();
    exists_result(&mut cursor, true);
    exists_result(&mut cursor, true);

    let error = create_table(&mut cursor, "raw", "ohlcv", &[("id", ColumnType::Int)])
        .await
        .expect_err("table exists");

    assert!(matches!(error, DataError::TableAlreadyExists { .. }));
    assert!(cursor.executed().is_empty());
}

fn sample_rows(count: i64) -> Vec<Row> {
    (0..count)
        .map(|i| vec![Value::from(format!("s{i}")), Value::from(i)])
        .collect()
}

#[tokio::test]
async fn test_insert_rows_copies_in_chunks() {
    let mut cursor = MockCursor::new();

    let copied = insert_rows(&mut cursor, "raw", "ohlcv", &["symbol", "volume"], &sample_rows(12), 5)
        .await
        .expect("insert");

    assert_eq!(copied, 12);
    let copies = cursor.copies();
    assert_eq!(copies.len(), 3);
    for (statement, _) in &copies {
        assert_eq!(
            *statement,
            "COPY \"raw\".\"ohlcv\" (\"symbol\", \"volume\") FROM STDIN WITH CSV"
        );
    }

    let payload_lines: Vec<usize> = copies
        .iter()
        .map(|(_, data)| data.iter().filter(|byte| **byte == b'\n').count())
        .collect();
    assert_eq!(payload_lines, vec![5, 5, 2]);
    assert_eq!(copies[0].1, b"\"s0\",\"0\"\n\"s1\",\"1\"\n\"s2\",\"2\"\n\"s3\",\"3\"\n\"s4\",\"4\"\n");
}

#[tokio::test]
async fn test_insert_rows_default_chunk_is_single_copy() {
    let mut cursor = MockCursor::new();
    insert_rows(
        &mut cursor,
        "raw",
        "ohlcv",
        &["symbol", "volume"],
        &sample_rows(12),
        DEFAULT_INSERT_CHUNK_SIZE,
    )
    .await
    .expect("insert");
    assert_eq!(cursor.copies().len(), 1);
}

#[tokio::test]
async fn test_insert_rows_validation() {
    let mut cursor = MockCursor::new();

    let empty = insert_rows(&mut cursor, "raw", "ohlcv", &["symbol"], &[], 10).await;
    assert!(matches!(empty, Err(DataError::EmptyInsert { .. })));

    let zero = insert_rows(&mut cursor, "raw", "ohlcv", &["symbol", "volume"], &sample_rows(1), 0).await;
    assert!(matches!(zero, Err(DataError::InvalidBatchSize { .. })));

    let ragged = insert_rows(&mut cursor, "raw", "ohlcv", &["symbol"], &sample_rows(1), 10).await;
    assert!(matches!(ragged, Err(DataError::RowWidthMismatch { expected: 1, actual: 2 })));

    assert!(cursor.calls().is_empty());
}

#[tokio::test]
async fn test_copy_failure_propagates() {
    let mut cursor = MockCursor::new();
    cursor.fail_next("COPY rejected");

    let error = insert_rows(&mut cursor, "raw", "ohlcv", &["symbol", "volume"], &sample_rows(3), 2)
        .await
        .expect_err("copy fails");

    assert!(matches!(error, DataError::Driver(_)));
    assert_eq!(cursor.copies().len(), 1, "no further chunks after a failure");
}

#[tokio::test]
async fn test_fetch_helpers() {
    let mut cursor = MockCursor::new();
    cursor.push_result(&["n"], (0..3).map(|n| vec![Value::from(n)]).collect());
    cursor.push_result(&["n"], Vec::new());

    let all = fetch_query(&mut cursor, "SELECT n FROM t").await.expect("fetch");
    assert_eq!(all.rows.len(), 3);

    let first = fetch_one(&mut cursor, "SELECT n FROM t WHERE false").await.expect("fetch");
    assert!(first.is_none());
}

#[tokio::test]
async fn test_decimal_and_interval_rows_copy_as_postgres_literals() {
    let mut cursor = MockCursor::new();
    let rows = vec![vec![
        Value::from(Decimal::new(10125, 2)),
        Value::from(Interval::new(1, 2, 3_000_000)),
    ]];

    insert_rows(&mut cursor, "raw", "quotes", &["price", "age"], &rows, 10)
        .await
        .expect("insert");

    let copies = cursor.copies();
    assert_eq!(
        copies[0].1,
        b"\"101.25\",\"1 months 2 days 3000000 microseconds\"\n"
    );
}
