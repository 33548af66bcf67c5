//! Driver-independent cell values and rows
//!
//! Rows coming out of a cursor are `Vec<Value>` so callers (and the mock cursor)
//! never depend on `sqlx` row types. `PgRow`s are decoded by column type name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::postgres::types::PgInterval;
use std::fmt;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::error::{DataError, DataResult};

/// One ordered tuple of column values
pub type Row = Vec<Value>;

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(Interval),
}

/// A PostgreSQL `interval` in its native components
///
/// Months and days are kept apart from the time part because their length in
/// seconds depends on the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl Interval {
    pub const fn new(months: i32, days: i32, microseconds: i64) -> Self {
        Self {
            months,
            days,
            microseconds,
        }
    }
}

impl From<PgInterval> for Interval {
    fn from(interval: PgInterval) -> Self {
        Self::new(interval.months, interval.days, interval.microseconds)
    }
}

/// Renders in PostgreSQL interval input syntax
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} months {} days {} microseconds",
            self.months, self.days, self.microseconds
        )
    }
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Render as one field of PostgreSQL `COPY ... WITH CSV` input
    ///
    /// NULL is the unquoted empty field; every other value is quoted, so an empty
    /// string stays distinguishable from NULL.
    pub fn to_csv_field(&self) -> String {
        let text = match self {
            Self::Null => return String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => float_literal(*value),
            Self::Decimal(value) => value.to_string(),
            Self::Text(text) => text.clone(),
            Self::Bytes(bytes) => bytea_hex(bytes),
            Self::Json(json) => json.to_string(),
            Self::Uuid(id) => id.to_string(),
            Self::Date(date) => date.to_string(),
            Self::Time(time) => time.to_string(),
            Self::Timestamp(ts) => ts.to_string(),
            Self::TimestampTz(ts) => ts.to_rfc3339(),
            Self::Interval(interval) => interval.to_string(),
        };
        format!("\"{}\"", text.replace('"', "\"\""))
    }
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        value.to_string()
    }
}

fn bytea_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2).saturating_add(2));
    out.push_str("\\x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Encode rows as CSV lines for `COPY ... FROM STDIN WITH CSV`
pub fn encode_csv(rows: &[Row]) -> Vec<u8> {
    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .map(Value::to_csv_field)
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out.into_bytes()
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Interval> for Value {
    fn from(value: Interval) -> Self {
        Self::Interval(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Decode every column of a `PgRow`
///
/// # Errors
/// - `DataError::Driver` if a value fails to decode
/// - `DataError::UnsupportedValueType` for types with no `Value` mapping
pub(crate) fn decode_row(row: &PgRow) -> DataResult<Row> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

fn decode_cell(row: &PgRow, index: usize) -> DataResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let column = row.column(index);
    let value = match column.type_info().name() {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => Value::Int(row.try_get(index)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get(index)?),
        "NUMERIC" => Value::Decimal(row.try_get(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::Text(row.try_get(index)?),
        "BYTEA" => Value::Bytes(row.try_get(index)?),
        "JSON" | "JSONB" => Value::Json(row.try_get(index)?),
        "UUID" => Value::Uuid(row.try_get(index)?),
        "DATE" => Value::Date(row.try_get(index)?),
        "TIME" => Value::Time(row.try_get(index)?),
        "TIMESTAMP" => Value::Timestamp(row.try_get(index)?),
        "TIMESTAMPTZ" => Value::TimestampTz(row.try_get(index)?),
        "INTERVAL" => Value::Interval(row.try_get::<PgInterval, _>(index)?.into()),
        other => {
            return Err(DataError::UnsupportedValueType {
                column: column.name().to_string(),
                type_name: other.to_string(),
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_fields_quote_everything_but_null() {
        assert_eq!(Value::Null.to_csv_field(), "");
        assert_eq!(Value::from("").to_csv_field(), "\"\"");
        assert_eq!(Value::from(350).to_csv_field(), "\"350\"");
        assert_eq!(Value::from("say \"hi\", ok").to_csv_field(), "\"say \"\"hi\"\", ok\"");
        assert_eq!(Value::from(true).to_csv_field(), "\"true\"");
    }

    #[test]
    fn test_special_floats_use_postgres_spelling() {
        assert_eq!(Value::Float(f64::NAN).to_csv_field(), "\"NaN\"");
        assert_eq!(Value::Float(f64::INFINITY).to_csv_field(), "\"Infinity\"");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_csv_field(), "\"-Infinity\"");
        assert_eq!(Value::Float(2.5).to_csv_field(), "\"2.5\"");
    }

    #[test]
    fn test_bytes_use_hex_format() {
        assert_eq!(Value::Bytes(vec![0xde, 0xad, 0x01]).to_csv_field(), "\"\\xdead01\"");
    }

    #[test]
    fn test_decimal_and_interval_csv_fields() {
        let price = Value::from(Decimal::new(10125, 2));
        assert_eq!(price.to_csv_field(), "\"101.25\"");

        let age = Value::from(Interval::new(1, 2, 3_000_000));
        assert_eq!(
            age.to_csv_field(),
            "\"1 months 2 days 3000000 microseconds\""
        );
        assert_eq!(
            Interval::new(0, -1, -500).to_string(),
            "0 months -1 days -500 microseconds"
        );
    }

    #[test]
    fn test_decimal_serializes_as_exact_string() {
        let row = vec![Value::from(Decimal::new(15, 1))];
        assert_eq!(serde_json::to_string(&row).unwrap(), "[\"1.5\"]");
    }

    #[test]
    fn test_encode_csv_lines() {
        let rows = vec![
            vec![Value::from("AAPL"), Value::from(350)],
            vec![Value::from("multi\nline"), Value::Null],
        ];
        let encoded = String::from_utf8(encode_csv(&rows)).unwrap();
        assert_eq!(encoded, "\"AAPL\",\"350\"\n\"multi\nline\",\n");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let row = vec![Value::Null, Value::from(1), Value::from("a")];
        assert_eq!(serde_json::to_string(&row).unwrap(), "[null,1,\"a\"]");
    }
}
