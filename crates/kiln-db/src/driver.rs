//! The seam between a session and a physical database driver.
//!
//! A driver hands out a [`PhysicalConnection`], which prepares
//! [`Statement`]s, which produce [`ResultSet`]s. Parameter indexes and
//! column indexes are zero-based.

use crate::error::DriverError;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type DriverResult<T> = Result<T, DriverError>;

/// SQL column and parameter types, as a driver reports or expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Bigint,
    Integer,
    Smallint,
    Tinyint,
    Decimal,
    Numeric,
    Double,
    Float,
    Real,
    Date,
    Time,
    Timestamp,
    Boolean,
    Bit,
    Binary,
    Other,
}

/// A single cell, as read from a result set or an OUT parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Boolean(bool),
    Bytes(Vec<u8>),
}

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL NULL of the given type.
    Null(SqlType),
    String(String),
    /// Large text bound as a character stream.
    CharStream(String),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Boolean(bool),
    Bytes(Vec<u8>),
}

impl SqlParam {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null(_))
    }

    /// The cell a database would store for this parameter.
    pub fn into_value(self) -> SqlValue {
        match self {
            SqlParam::Null(_) => SqlValue::Null,
            SqlParam::String(s) | SqlParam::CharStream(s) => SqlValue::String(s),
            SqlParam::Long(n) => SqlValue::Long(n),
            SqlParam::Double(n) => SqlValue::Double(n),
            SqlParam::Decimal(d) => SqlValue::Decimal(d),
            SqlParam::Date(d) => SqlValue::Date(d),
            SqlParam::Timestamp(t) => SqlValue::Timestamp(t),
            SqlParam::Boolean(b) => SqlValue::Boolean(b),
            SqlParam::Bytes(b) => SqlValue::Bytes(b),
        }
    }
}

/// Result-set column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub sql_type: SqlType,
    /// Total digits for numeric columns, length for character columns.
    pub precision: i32,
    /// Digits after the decimal point.
    pub scale: i32,
    pub display_size: i32,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            precision: 0,
            scale: 0,
            display_size: 0,
        }
    }

    pub fn with_precision(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_display_size(mut self, display_size: i32) -> Self {
        self.display_size = display_size;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

/// Cancels whatever a statement is running. Callable from any thread.
pub trait Cancel: Send + Sync {
    fn cancel(&self) -> DriverResult<()>;
}

/// A shared cancellation flag. Drivers that cannot interrupt the engine
/// check it between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Lower the flag, returning whether it was raised. The statement that
    /// takes a cancellation is the one it stops.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Cancel for CancelFlag {
    fn cancel(&self) -> DriverResult<()> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Forward-only cursor over query results.
///
/// Getters follow the read-then-check protocol: they return a default for
/// SQL NULL, and [`ResultSet::was_null`] reports whether the last cell read
/// was NULL.
pub trait ResultSet: Send {
    fn columns(&self) -> &[ColumnMeta];

    /// Advance to the next row. False once exhausted.
    fn next(&mut self) -> DriverResult<bool>;

    fn get_long(&mut self, column: usize) -> DriverResult<i64>;
    fn get_double(&mut self, column: usize) -> DriverResult<f64>;
    fn get_decimal(&mut self, column: usize) -> DriverResult<Decimal>;
    fn get_string(&mut self, column: usize) -> DriverResult<String>;
    fn get_date(&mut self, column: usize) -> DriverResult<Option<NaiveDate>>;
    fn get_timestamp(&mut self, column: usize) -> DriverResult<Option<NaiveDateTime>>;
    fn get_boolean(&mut self, column: usize) -> DriverResult<bool>;
    fn get_bytes(&mut self, column: usize) -> DriverResult<Vec<u8>>;

    fn was_null(&self) -> bool;

    fn close(&mut self) -> DriverResult<()>;
}

/// A prepared statement.
pub trait Statement: Send {
    fn set_param(&mut self, index: usize, param: SqlParam) -> DriverResult<()>;
    fn clear_params(&mut self);

    /// Run a data-changing statement and return the update count.
    fn execute_update(&mut self) -> DriverResult<u64>;
    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>>;

    /// Queue the current parameters as one batch entry.
    fn add_batch(&mut self) -> DriverResult<()>;
    /// Run every queued entry. A failure part way is reported as
    /// [`DriverError::Batch`] with the counts of the entries that ran.
    fn execute_batch(&mut self) -> DriverResult<Vec<i64>>;
    fn clear_batch(&mut self) -> DriverResult<()>;

    /// Keys generated by the last execution, for statements prepared with
    /// key retrieval.
    fn generated_keys(&mut self) -> DriverResult<Vec<i64>>;

    /// 0 means no limit.
    fn set_max_rows(&mut self, max_rows: usize);
    fn set_fetch_size(&mut self, rows: usize) -> DriverResult<()>;
    fn set_fetch_direction(&mut self, direction: FetchDirection) -> DriverResult<()>;

    fn close(&mut self) -> DriverResult<()>;
}

/// A stored-procedure call.
pub trait CallableStatement: Send {
    fn set_param(&mut self, index: usize, param: SqlParam) -> DriverResult<()>;
    fn register_out_param(&mut self, index: usize, sql_type: SqlType) -> DriverResult<()>;
    fn execute(&mut self) -> DriverResult<()>;
    fn out_value(&mut self, index: usize) -> DriverResult<SqlValue>;
    fn close(&mut self) -> DriverResult<()>;
}

/// One open connection to a database.
pub trait PhysicalConnection: Send {
    fn prepare(&mut self, sql: &str, return_generated_keys: bool) -> DriverResult<Box<dyn Statement>>;

    fn prepare_call(&mut self, _sql: &str) -> DriverResult<Box<dyn CallableStatement>> {
        Err(DriverError::unsupported("callable statements"))
    }

    /// Run a statement without parameters and return the update count.
    fn execute(&mut self, sql: &str) -> DriverResult<u64>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> DriverResult<()>;
    fn auto_commit(&self) -> bool;
    fn commit(&mut self) -> DriverResult<()>;
    fn rollback(&mut self) -> DriverResult<()>;

    /// Whether the driver itself accepts statement batches.
    fn supports_batch_updates(&self) -> bool;

    /// Cancels the statement currently running on this connection.
    fn cancel_handle(&self) -> Arc<dyn Cancel>;

    fn close(&mut self) -> DriverResult<()>;
}

/// Everything a driver needs to open a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectRequest {
    pub url: String,
    /// Set when credentials travel alongside the URL.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Set when credentials travel as properties.
    pub properties: BTreeMap<String, String>,
}

/// A loadable driver, identified by name.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;
    fn connect(&self, request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>>;
}

/// A fully materialized result set.
///
/// Drivers that fetch everything up front can hand one of these back
/// instead of writing their own cursor.
#[derive(Debug, Clone)]
pub struct MemoryResultSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<SqlValue>>,
    position: Option<usize>,
    last_null: bool,
    cancel: Option<CancelFlag>,
    closed: bool,
}

impl MemoryResultSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
            last_null: false,
            cancel: None,
            closed: false,
        }
    }

    /// Stop with [`DriverError::Cancelled`] once `cancel` is raised.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cell(&mut self, column: usize) -> DriverResult<&SqlValue> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| DriverError::sql("No current row"))?;
        let cell = row
            .get(column)
            .ok_or_else(|| DriverError::sql(format!("Column index {} out of range", column)))?;
        self.last_null = matches!(cell, SqlValue::Null);
        Ok(cell)
    }
}

fn conversion_error(cell: &SqlValue, target: &str) -> DriverError {
    DriverError::sql(format!("Cannot convert {:?} to {}", cell, target))
}

impl ResultSet for MemoryResultSet {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        if self.cancel.as_ref().is_some_and(CancelFlag::take) {
            self.closed = true;
            return Err(DriverError::Cancelled);
        }
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn get_long(&mut self, column: usize) -> DriverResult<i64> {
        match self.cell(column)? {
            SqlValue::Null => Ok(0),
            SqlValue::Long(n) => Ok(*n),
            SqlValue::Double(n) => Ok(n.round() as i64),
            SqlValue::Decimal(d) => d.round().to_i64().ok_or_else(|| DriverError::sql("Decimal out of range")),
            SqlValue::Boolean(b) => Ok(i64::from(*b)),
            SqlValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|n| n.round() as i64))
                    .map_err(|_| DriverError::sql(format!("Cannot convert '{}' to a long", s)))
            }
            other => Err(conversion_error(other, "a long")),
        }
    }

    fn get_double(&mut self, column: usize) -> DriverResult<f64> {
        match self.cell(column)? {
            SqlValue::Null => Ok(0.0),
            SqlValue::Long(n) => Ok(*n as f64),
            SqlValue::Double(n) => Ok(*n),
            SqlValue::Decimal(d) => d.to_f64().ok_or_else(|| DriverError::sql("Decimal out of range")),
            SqlValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            SqlValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| DriverError::sql(format!("Cannot convert '{}' to a double", s))),
            other => Err(conversion_error(other, "a double")),
        }
    }

    fn get_decimal(&mut self, column: usize) -> DriverResult<Decimal> {
        match self.cell(column)? {
            SqlValue::Null => Ok(Decimal::ZERO),
            SqlValue::Long(n) => Ok(Decimal::from(*n)),
            SqlValue::Double(n) => {
                Decimal::from_f64(*n).ok_or_else(|| DriverError::sql("Double out of decimal range"))
            }
            SqlValue::Decimal(d) => Ok(*d),
            SqlValue::String(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| DriverError::sql(format!("Cannot convert '{}' to a decimal", s))),
            other => Err(conversion_error(other, "a decimal")),
        }
    }

    fn get_string(&mut self, column: usize) -> DriverResult<String> {
        Ok(match self.cell(column)? {
            SqlValue::Null => String::new(),
            SqlValue::Long(n) => n.to_string(),
            SqlValue::Double(n) => n.to_string(),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::String(s) => s.clone(),
            SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SqlValue::Timestamp(t) => t.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            SqlValue::Boolean(b) => b.to_string(),
            SqlValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        })
    }

    fn get_date(&mut self, column: usize) -> DriverResult<Option<NaiveDate>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Date(d) => Ok(Some(*d)),
            SqlValue::Timestamp(t) => Ok(Some(t.date())),
            other => Err(conversion_error(other, "a date")),
        }
    }

    fn get_timestamp(&mut self, column: usize) -> DriverResult<Option<NaiveDateTime>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Date(d) => Ok(d.and_hms_opt(0, 0, 0)),
            SqlValue::Timestamp(t) => Ok(Some(*t)),
            other => Err(conversion_error(other, "a timestamp")),
        }
    }

    fn get_boolean(&mut self, column: usize) -> DriverResult<bool> {
        match self.cell(column)? {
            SqlValue::Null => Ok(false),
            SqlValue::Boolean(b) => Ok(*b),
            SqlValue::Long(n) => Ok(*n != 0),
            SqlValue::String(s) => Ok(matches!(
                s.trim().to_ascii_uppercase().as_str(),
                "Y" | "YES" | "TRUE" | "1"
            )),
            other => Err(conversion_error(other, "a boolean")),
        }
    }

    fn get_bytes(&mut self, column: usize) -> DriverResult<Vec<u8>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(Vec::new()),
            SqlValue::Bytes(b) => Ok(b.clone()),
            SqlValue::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(conversion_error(other, "bytes")),
        }
    }

    fn was_null(&self) -> bool {
        self.last_null
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        // The statement is done; a late cancellation has nothing left to stop.
        if let Some(cancel) = &self.cancel {
            cancel.reset();
        }
        Ok(())
    }
}
