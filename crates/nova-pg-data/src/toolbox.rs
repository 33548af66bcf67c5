//! Cursor-level helpers for schemas, tables and bulk inserts
//!
//! All helpers run on a caller-supplied [`Cursor`], inside whatever transaction
//! that cursor belongs to. Identifiers are double-quoted and string literals are
//! escaped, since statements are sent as plain SQL text.

use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::chunked::{DEFAULT_FETCH_BATCH_SIZE, FetchResult, fetch_in_chunks};
use crate::cursor::Cursor;
use crate::error::{DataError, DataResult};
use crate::value::{Row, Value, encode_csv};

/// Rows per `COPY` round trip when the caller does not choose
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 5000;

/// Column types accepted by [`create_table`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Decimal,
    Bool,
    Str,
    Bytes,
    DateTime,
    Date,
    Time,
    TimeDelta,
}

impl ColumnType {
    /// PostgreSQL type used in `CREATE TABLE`
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Int => "BIGINT",
            Self::Float => "DOUBLE PRECISION",
            Self::Decimal => "NUMERIC",
            Self::Bool => "BOOLEAN",
            Self::Str => "TEXT",
            Self::Bytes => "BYTEA",
            Self::DateTime => "TIMESTAMPTZ",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::TimeDelta => "INTERVAL",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::TimeDelta => "timedelta",
        }
    }
}

impl FromStr for ColumnType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "decimal" => Ok(Self::Decimal),
            "bool" => Ok(Self::Bool),
            "str" => Ok(Self::Str),
            "bytes" => Ok(Self::Bytes),
            "datetime" => Ok(Self::DateTime),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "timedelta" => Ok(Self::TimeDelta),
            other => Err(DataError::UnsupportedColumnType {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Run a statement that returns no rows
///
/// # Errors
/// Returns `DataError::Driver` if the statement fails
pub async fn execute_query<C: Cursor + ?Sized>(cursor: &mut C, statement: &str) -> DataResult<u64> {
    let affected = cursor.execute(statement).await?;
    debug!(affected, "Executed statement");
    Ok(affected)
}

/// Run a query and return every row, fetched in default-sized chunks
///
/// # Errors
/// Returns `DataError::Driver` if the query or a retrieval fails
pub async fn fetch_query<C: Cursor + ?Sized>(cursor: &mut C, query: &str) -> DataResult<FetchResult> {
    fetch_in_chunks(cursor, query, "query", DEFAULT_FETCH_BATCH_SIZE).await
}

/// Run a query and return its first row, if any
///
/// # Errors
/// Returns `DataError::Driver` if the query or the retrieval fails
pub async fn fetch_one<C: Cursor + ?Sized>(cursor: &mut C, query: &str) -> DataResult<Option<Row>> {
    cursor.query(query).await?;
    let mut rows = cursor.fetch_many(1).await?;
    Ok(rows.pop())
}

/// `CREATE SCHEMA IF NOT EXISTS`
///
/// # Errors
/// Returns `DataError::Driver` if the statement fails
pub async fn create_schema<C: Cursor + ?Sized>(cursor: &mut C, schema: &str) -> DataResult<()> {
    cursor
        .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
        .await?;
    info!(schema, "Ensured schema exists");
    Ok(())
}

async fn exists<C: Cursor + ?Sized>(cursor: &mut C, query: &str) -> DataResult<bool> {
    let row = fetch_one(cursor, query).await?;
    Ok(row
        .as_ref()
        .and_then(|row| row.first())
        .and_then(Value::as_bool)
        .unwrap_or(false))
}

/// Whether a schema with this exact name exists
///
/// # Errors
/// Returns `DataError::Driver` if the lookup fails
pub async fn schema_exists<C: Cursor + ?Sized>(cursor: &mut C, schema: &str) -> DataResult<bool> {
    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = {})",
        quote_literal(schema)
    );
    exists(cursor, &query).await
}

/// Whether `schema.table` exists
///
/// # Errors
/// Returns `DataError::Driver` if the lookup fails
pub async fn table_exists<C: Cursor + ?Sized>(
    cursor: &mut C,
    schema: &str,
    table: &str,
) -> DataResult<bool> {
    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = {} AND table_name = {})",
        quote_literal(schema),
        quote_literal(table)
    );
    exists(cursor, &query).await
}

/// Create `schema.table` with the given typed columns
///
/// # Errors
/// - `DataError::SchemaNotFound` if the schema does not exist
/// - `DataError::TableAlreadyExists` if the table does
/// - `DataError::Driver` if a statement fails
pub async fn create_table<C: Cursor + ?Sized>(
    cursor: &mut C,
    schema: &str,
    table: &str,
    columns: &[(&str, ColumnType)],
) -> DataResult<()> {
    let column_defs = columns
        .iter()
        .map(|(name, column_type)| format!("{} {}", quote_ident(name), column_type.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");

    if !schema_exists(cursor, schema).await? {
        return Err(DataError::SchemaNotFound {
            schema: schema.to_string(),
        });
    }
    if table_exists(cursor, schema, table).await? {
        return Err(DataError::TableAlreadyExists {
            schema: schema.to_string(),
            table: table.to_string(),
        });
    }

    let statement = format!(
        "CREATE TABLE {} ({column_defs})",
        qualified_name(schema, table)
    );
    cursor.execute(&statement).await?;
    info!(schema, table, columns = columns.len(), "Created table");
    Ok(())
}

/// Bulk-insert rows with `COPY ... FROM STDIN WITH CSV`, `chunk_size` rows per copy
///
/// Returns the number of rows copied.
///
/// # Errors
/// - `DataError::EmptyInsert` if `rows` is empty
/// - `DataError::InvalidBatchSize` if `chunk_size` is zero
/// - `DataError::RowWidthMismatch` if a row does not match `columns`
/// - `DataError::Driver` if a copy fails
pub async fn insert_rows<C: Cursor + ?Sized>(
    cursor: &mut C,
    schema: &str,
    table: &str,
    columns: &[&str],
    rows: &[Row],
    chunk_size: usize,
) -> DataResult<u64> {
    if rows.is_empty() {
        return Err(DataError::EmptyInsert {
            table: format!("{schema}.{table}"),
        });
    }
    if chunk_size == 0 {
        return Err(DataError::InvalidBatchSize {
            batch_size: chunk_size,
        });
    }
    if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
        return Err(DataError::RowWidthMismatch {
            expected: columns.len(),
            actual: row.len(),
        });
    }

    let column_list = columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let statement = format!(
        "COPY {} ({column_list}) FROM STDIN WITH CSV",
        qualified_name(schema, table)
    );

    let mut copied = 0_u64;
    for chunk in rows.chunks(chunk_size) {
        let count = cursor.copy_in(&statement, &encode_csv(chunk)).await?;
        copied = copied.saturating_add(count);
        debug!(schema, table, chunk_rows = chunk.len(), "Copied chunk");
    }

    info!(schema, table, rows = copied, "Inserted rows");
    Ok(copied)
}
