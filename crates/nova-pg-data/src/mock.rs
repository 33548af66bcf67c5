//! In-memory `Cursor` for testing without a database

use async_trait::async_trait;
use std::collections::VecDeque;

use crate::cursor::Cursor;
use crate::error::{DataError, DataResult};
use crate::value::Row;

/// One recorded interaction with a [`MockCursor`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Execute { statement: String },
    Query { query: String },
    FetchMany { requested: usize, returned: usize },
    CopyIn { statement: String, data: Vec<u8> },
}

#[derive(Debug, Default)]
struct ResultSet {
    columns: Vec<String>,
    rows: VecDeque<Row>,
}

/// Mock cursor for testing
///
/// Each `query` consumes the next result pushed with [`MockCursor::push_result`]
/// (an empty result set with no columns when none is queued). Every call is
/// recorded so tests can assert on the exact SQL and batch sizes.
#[derive(Debug, Default)]
pub struct MockCursor {
    queued: VecDeque<ResultSet>,
    current: Option<ResultSet>,
    calls: Vec<MockCall>,
    affected_rows: u64,

    // Behavior controls for testing
    fail_next: Option<String>,
}

impl MockCursor {
    /// Create a new mock cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result set returned by the next `query`
    pub fn push_result(&mut self, columns: &[&str], rows: Vec<Row>) {
        self.queued.push_back(ResultSet {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows: rows.into(),
        });
    }

    /// Value returned by every subsequent `execute`
    pub const fn set_affected_rows(&mut self, affected_rows: u64) {
        self.affected_rows = affected_rows;
    }

    /// Configure to fail on next operation
    pub fn fail_next(&mut self, message: &str) {
        self.fail_next = Some(message.to_string());
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> &[MockCall] {
        &self.calls
    }

    /// Row counts returned by each `fetch_many`, in order
    pub fn fetch_sizes_returned(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MockCall::FetchMany { returned, .. } => Some(*returned),
                _ => None,
            })
            .collect()
    }

    /// Statements passed to `execute`, in order
    pub fn executed(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Execute { statement } => Some(statement.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `(statement, payload)` of every `copy_in`, in order
    pub fn copies(&self) -> Vec<(&str, &[u8])> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MockCall::CopyIn { statement, data } => Some((statement.as_str(), data.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Check if should fail and reset
    fn check_fail(&mut self) -> DataResult<()> {
        match self.fail_next.take() {
            Some(message) => Err(DataError::Driver(sqlx::Error::Protocol(message))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Cursor for MockCursor {
    async fn execute(&mut self, statement: &str) -> DataResult<u64> {
        self.calls.push(MockCall::Execute {
            statement: statement.to_string(),
        });
        self.check_fail()?;
        self.current = None;
        Ok(self.affected_rows)
    }

    async fn query(&mut self, query: &str) -> DataResult<()> {
        self.calls.push(MockCall::Query {
            query: query.to_string(),
        });
        self.check_fail()?;
        self.current = Some(self.queued.pop_front().unwrap_or_default());
        Ok(())
    }

    fn columns(&self) -> &[String] {
        match &self.current {
            Some(result) => &result.columns,
            None => &[],
        }
    }

    async fn fetch_many(&mut self, size: usize) -> DataResult<Vec<Row>> {
        self.check_fail()?;
        let result = self.current.as_mut().ok_or(DataError::NoResultSet)?;
        let take = size.min(result.rows.len());
        let batch: Vec<Row> = result.rows.drain(..take).collect();

        self.calls.push(MockCall::FetchMany {
            requested: size,
            returned: batch.len(),
        });
        Ok(batch)
    }

    async fn copy_in(&mut self, statement: &str, data: &[u8]) -> DataResult<u64> {
        self.calls.push(MockCall::CopyIn {
            statement: statement.to_string(),
            data: data.to_vec(),
        });
        self.check_fail()?;
        self.current = None;
        let lines = data.iter().filter(|byte| **byte == b'\n').count();
        Ok(u64::try_from(lines).unwrap_or(u64::MAX))
    }
}
