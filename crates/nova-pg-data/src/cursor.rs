//! Cursor abstraction and its PostgreSQL implementation
//!
//! A [`Cursor`] executes statements and hands out rows incrementally. [`PgCursor`]
//! implements it on top of a single `sqlx` connection using server-side cursors
//! (`DECLARE ... CURSOR` / `FETCH FORWARD n`), so only one batch of rows is ever
//! held client-side.
//!
//! # Cursor Lifecycle
//! 1. [`get_cursor`] connects and opens a transaction
//! 2. `query` describes the statement and declares a server-side cursor for it
//! 3. `fetch_many(n)` returns the next `n` rows (empty once exhausted)
//! 4. `commit` / `rollback` end the transaction and close the connection
//!
//! Dropping a `PgCursor` without finishing it closes the socket, and the server
//! rolls the transaction back. [`with_cursor`] wraps the whole lifecycle in a
//! scope that commits on success and rolls back on error.

use async_trait::async_trait;
use futures::future::BoxFuture;
use nova_pg_common::redact_connection_string;
use nova_pg_config::{DbCredentials, load_db_config};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, Connection, Executor};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};
use crate::value::{Row, decode_row};

/// Incremental access to query results
///
/// Methods take `&mut self`: a cursor serves one caller at a time.
#[async_trait]
pub trait Cursor: Send {
    /// Run a statement that returns no rows (DDL, INSERT, ...)
    ///
    /// Returns the number of rows affected.
    async fn execute(&mut self, statement: &str) -> DataResult<u64>;

    /// Execute a read query and open its result set
    ///
    /// Column names are available from [`Cursor::columns`] as soon as this
    /// returns, even when the result set is empty.
    async fn query(&mut self, query: &str) -> DataResult<()>;

    /// Column names of the open result set (empty before any query)
    fn columns(&self) -> &[String];

    /// Retrieve up to `size` further rows; an empty batch means end-of-data
    async fn fetch_many(&mut self, size: usize) -> DataResult<Vec<Row>>;

    /// Stream CSV `data` into a `COPY ... FROM STDIN` statement
    ///
    /// Returns the number of rows copied.
    async fn copy_in(&mut self, statement: &str, data: &[u8]) -> DataResult<u64>;
}

/// A [`Cursor`] bound to one PostgreSQL connection and transaction
pub struct PgCursor {
    conn: PgConnection,
    portal: Option<String>,
    columns: Vec<String>,
    portals_opened: u64,
}

impl PgCursor {
    /// Connect with a `postgresql://` URL and open a transaction
    ///
    /// # Errors
    /// Returns `DataError::Driver` if the connection or `BEGIN` fails
    pub async fn connect(connection_url: &str) -> DataResult<Self> {
        debug!(
            target_db = %redact_connection_string(connection_url),
            "Opening cursor connection"
        );
        let conn = PgConnection::connect(connection_url).await?;
        Self::begin(conn).await
    }

    /// Connect with prepared options and open a transaction
    ///
    /// # Errors
    /// Returns `DataError::Driver` if the connection or `BEGIN` fails
    pub async fn connect_with(options: &PgConnectOptions) -> DataResult<Self> {
        let conn = PgConnection::connect_with(options).await?;
        Self::begin(conn).await
    }

    async fn begin(mut conn: PgConnection) -> DataResult<Self> {
        conn.execute("BEGIN").await?;
        Ok(Self {
            conn,
            portal: None,
            columns: Vec::new(),
            portals_opened: 0,
        })
    }

    /// Commit the transaction and close the connection
    ///
    /// # Errors
    /// Returns `DataError::Driver` if `COMMIT` or the close handshake fails
    pub async fn commit(mut self) -> DataResult<()> {
        self.conn.execute("COMMIT").await?;
        self.conn.close().await?;
        debug!("Cursor committed and closed");
        Ok(())
    }

    /// Roll back the transaction and close the connection
    ///
    /// # Errors
    /// Returns `DataError::Driver` if `ROLLBACK` or the close handshake fails
    pub async fn rollback(mut self) -> DataResult<()> {
        self.conn.execute("ROLLBACK").await?;
        self.conn.close().await?;
        debug!("Cursor rolled back and closed");
        Ok(())
    }

    async fn close_portal(&mut self) -> DataResult<()> {
        if let Some(portal) = self.portal.take() {
            self.conn.execute(format!("CLOSE {portal}").as_str()).await?;
        }
        self.columns.clear();
        Ok(())
    }
}

#[async_trait]
impl Cursor for PgCursor {
    async fn execute(&mut self, statement: &str) -> DataResult<u64> {
        self.close_portal().await?;
        let result = self.conn.execute(statement).await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, query: &str) -> DataResult<()> {
        self.close_portal().await?;

        let query = query.trim().trim_end_matches(';').trim_end();
        let description = self.conn.describe(query).await?;
        let columns = description
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect::<Vec<_>>();

        self.portals_opened = self.portals_opened.saturating_add(1);
        let portal = format!("nova_pg_cursor_{}", self.portals_opened);
        self.conn
            .execute(format!("DECLARE {portal} NO SCROLL CURSOR FOR {query}").as_str())
            .await?;

        debug!(portal = %portal, columns = columns.len(), "Declared server-side cursor");
        self.portal = Some(portal);
        self.columns = columns;
        Ok(())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn fetch_many(&mut self, size: usize) -> DataResult<Vec<Row>> {
        let portal = self.portal.as_deref().ok_or(DataError::NoResultSet)?;
        let statement = format!("FETCH FORWARD {size} FROM {portal}");

        let rows = sqlx::query(&statement)
            .persistent(false)
            .fetch_all(&mut self.conn)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn copy_in(&mut self, statement: &str, data: &[u8]) -> DataResult<u64> {
        self.close_portal().await?;
        let mut copy = self.conn.copy_in_raw(statement).await?;
        copy.send(data).await?;
        Ok(copy.finish().await?)
    }
}

/// Open a connection and transaction for `connection_url`
///
/// The caller owns the returned cursor: finish it with [`PgCursor::commit`] or
/// [`PgCursor::rollback`], or prefer [`with_cursor`] for scoped use.
///
/// # Errors
/// Returns `DataError::Driver` if the connection fails
pub async fn get_cursor(connection_url: &str) -> DataResult<PgCursor> {
    PgCursor::connect(connection_url).await
}

/// Open a cursor for one environment of a configuration file
///
/// # Errors
/// - `DataError::Config` if the credentials cannot be loaded
/// - `DataError::Driver` if the connection fails
pub async fn get_cursor_for_env<P: AsRef<Path>>(
    config_file_path: P,
    env_name: &str,
) -> DataResult<PgCursor> {
    let credentials: DbCredentials = load_db_config(config_file_path, env_name)?;
    debug!(
        env = env_name,
        target_db = %credentials.safe_connection_string(),
        "Opening cursor from configuration"
    );
    PgCursor::connect_with(&credentials.connect_options()).await
}

/// Run `f` with a cursor that is released on every exit path
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err`, and closes
/// the connection either way.
///
/// ```no_run
/// # async fn demo() -> nova_pg_data::DataResult<()> {
/// use nova_pg_data::{fetch_in_chunks, with_cursor};
///
/// let result = with_cursor("postgresql://u:p@localhost:5432/nq", |cur| {
///     Box::pin(async move { fetch_in_chunks(cur, "SELECT * FROM raw.ohlcv", "raw.ohlcv", 500).await })
/// })
/// .await?;
/// println!("{} rows", result.rows.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the error from connecting, from `f`, or from `COMMIT`
pub async fn with_cursor<T, F>(connection_url: &str, f: F) -> DataResult<T>
where
    F: for<'c> FnOnce(&'c mut PgCursor) -> BoxFuture<'c, DataResult<T>> + Send,
    T: Send,
{
    let mut cursor = get_cursor(connection_url).await?;
    let outcome = f(&mut cursor).await;

    match outcome {
        Ok(value) => {
            cursor.commit().await?;
            Ok(value)
        }
        Err(error) => {
            warn!(error = %error, "Rolling back cursor transaction");
            if let Err(rollback_error) = cursor.rollback().await {
                warn!(error = %rollback_error, "Rollback failed, connection dropped");
            }
            Err(error)
        }
    }
}
