//! DuckDB driver for kiln sessions.
//!
//! DuckDB is embedded, so a "connection" is a handle on a database opened in
//! this process. Handles on the same file share one database instance; an
//! in-memory URL opens a private database per connection.
//!
//! Statements keep their SQL and bound parameters and are prepared against
//! the connection each time they run. Query results are read fully into a
//! [`MemoryResultSet`]; cancellation is checked between rows. A cancel raised
//! before a statement starts stops that statement, and the flag is lowered
//! once the statement finishes.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime};
use duckdb::arrow::datatypes::DataType;
use duckdb::types::{TimeUnit, Value};
use duckdb::{params_from_iter, Connection};
use kiln_db::driver::{
    Cancel, CancelFlag, ColumnMeta, ConnectRequest, Driver, DriverResult, FetchDirection, MemoryResultSet,
    PhysicalConnection, ResultSet, SqlParam, SqlType, SqlValue, Statement,
};
use kiln_db::{DriverError, DriverManager, EXECUTE_FAILED};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Name the driver registers under, matching the DuckDB dialect's driver name.
pub const DRIVER_NAME: &str = "duckdb";

const URL_PREFIX: &str = "duckdb:";
const MEMORY: &str = ":memory:";

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn sql_error(err: duckdb::Error) -> DriverError {
    DriverError::sql(err.to_string())
}

/// Opens DuckDB databases for `duckdb:<path>` URLs.
///
/// `duckdb::memory:` (or an empty path) gives each connection a fresh
/// in-memory database. A file path is opened once and every later connection
/// to it is a clone of that handle.
#[derive(Default)]
pub struct DuckDbDriver {
    databases: Mutex<HashMap<PathBuf, Connection>>,
}

impl DuckDbDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, location: &str) -> DriverResult<Connection> {
        if location.is_empty() || location == MEMORY {
            return Connection::open_in_memory().map_err(sql_error);
        }

        let path = PathBuf::from(location);
        let mut databases = self.databases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = databases.get(&path) {
            return existing.try_clone().map_err(sql_error);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DriverError::sql(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        let connection = Connection::open(&path).map_err(sql_error)?;
        let handle = connection.try_clone().map_err(sql_error)?;
        debug!(path = %path.display(), "Opened DuckDB database");
        databases.insert(path, connection);
        Ok(handle)
    }
}

impl Driver for DuckDbDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn connect(&self, request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>> {
        let location = request.url.strip_prefix(URL_PREFIX).unwrap_or(&request.url);
        let connection = self.open(location)?;
        Ok(Box::new(DuckDbConnection::new(connection)))
    }
}

/// A driver manager with the DuckDB driver registered.
pub fn driver_manager() -> Arc<DriverManager> {
    let manager = DriverManager::new();
    manager.register(Arc::new(DuckDbDriver::new()));
    Arc::new(manager)
}

/// One handle on a DuckDB database.
///
/// Manual commit mode keeps an explicit transaction open: commit and rollback
/// end it and immediately start the next one.
pub struct DuckDbConnection {
    connection: Arc<Mutex<Connection>>,
    auto_commit: bool,
    cancel: CancelFlag,
    closed: bool,
}

impl DuckDbConnection {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            auto_commit: true,
            cancel: CancelFlag::new(),
            closed: false,
        }
    }

    fn run(&self, sql: &str) -> DriverResult<u64> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = conn.execute(sql, []).map_err(sql_error)?;
        Ok(changed as u64)
    }

    fn end_transaction(&mut self, verb: &str) -> DriverResult<()> {
        if self.auto_commit {
            return Ok(());
        }
        self.run(verb)?;
        self.run("BEGIN TRANSACTION")?;
        Ok(())
    }
}

impl PhysicalConnection for DuckDbConnection {
    fn prepare(&mut self, sql: &str, _return_generated_keys: bool) -> DriverResult<Box<dyn Statement>> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        {
            // Surface syntax and binding errors at prepare time.
            let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
            conn.prepare(sql).map_err(sql_error)?;
        }
        Ok(Box::new(DuckDbStatement {
            connection: Arc::clone(&self.connection),
            sql: sql.to_string(),
            params: Vec::new(),
            batch: Vec::new(),
            max_rows: 0,
            cancel: self.cancel.clone(),
            closed: false,
        }))
    }

    fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        if self.cancel.take() {
            return Err(DriverError::Cancelled);
        }
        let changed = self.run(sql);
        self.cancel.reset();
        changed
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> DriverResult<()> {
        if auto_commit == self.auto_commit {
            return Ok(());
        }
        if auto_commit {
            self.run("COMMIT")?;
        } else {
            self.run("BEGIN TRANSACTION")?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.end_transaction("ROLLBACK")
    }

    fn supports_batch_updates(&self) -> bool {
        true
    }

    fn cancel_handle(&self) -> Arc<dyn Cancel> {
        Arc::new(self.cancel.clone())
    }

    fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        if !self.auto_commit {
            if let Err(e) = self.run("ROLLBACK") {
                warn!(error = %e, "Rollback on close failed");
            }
            self.auto_commit = true;
        }
        self.closed = true;
        Ok(())
    }
}

/// A statement bound to a DuckDB connection.
pub struct DuckDbStatement {
    connection: Arc<Mutex<Connection>>,
    sql: String,
    params: Vec<Value>,
    batch: Vec<Vec<Value>>,
    max_rows: usize,
    cancel: CancelFlag,
    closed: bool,
}

impl DuckDbStatement {
    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn query(&self) -> DriverResult<MemoryResultSet> {
        let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(&self.sql).map_err(sql_error)?;

        let mut data = Vec::new();
        {
            let mut rows = stmt.query(params_from_iter(self.params.iter())).map_err(sql_error)?;
            while let Some(row) = rows.next().map_err(sql_error)? {
                if self.cancel.take() {
                    return Err(DriverError::Cancelled);
                }
                let width = row.as_ref().column_count();
                let mut cells = Vec::with_capacity(width);
                for i in 0..width {
                    let value: Value = row.get(i).map_err(sql_error)?;
                    cells.push(from_duckdb(value));
                }
                data.push(cells);
                if self.max_rows > 0 && data.len() >= self.max_rows {
                    break;
                }
            }
        }

        // Column metadata is only available once the statement has run.
        let columns = (0..stmt.column_count())
            .map(|i| {
                let name = stmt
                    .column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col_{}", i));
                column_meta(name, &stmt.column_type(i))
            })
            .collect();

        Ok(MemoryResultSet::new(columns, data).with_cancel(self.cancel.clone()))
    }

    fn update(&self) -> DriverResult<u64> {
        let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(&self.sql).map_err(sql_error)?;
        let changed = stmt.execute(params_from_iter(self.params.iter())).map_err(sql_error)?;
        Ok(changed as u64)
    }

    fn run_batch(&self, entries: &[Vec<Value>]) -> DriverResult<Vec<i64>> {
        let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(&self.sql).map_err(sql_error)?;
        let mut counts = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.cancel.take() {
                return Err(DriverError::batch("Batch was cancelled", counts));
            }
            match stmt.execute(params_from_iter(entry.iter())) {
                Ok(changed) => counts.push(changed as i64),
                Err(e) => {
                    counts.push(EXECUTE_FAILED);
                    return Err(DriverError::batch(e.to_string(), counts));
                }
            }
        }
        Ok(counts)
    }
}

impl Statement for DuckDbStatement {
    fn set_param(&mut self, index: usize, param: SqlParam) -> DriverResult<()> {
        self.check_open()?;
        if self.params.len() <= index {
            self.params.resize(index + 1, Value::Null);
        }
        self.params[index] = to_duckdb(param);
        Ok(())
    }

    fn clear_params(&mut self) {
        self.params.clear();
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.check_open()?;
        if self.cancel.take() {
            return Err(DriverError::Cancelled);
        }
        let changed = self.update();
        self.cancel.reset();
        changed
    }

    /// The result set carries the cancel flag on and clears it when closed.
    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>> {
        self.check_open()?;
        if self.cancel.take() {
            return Err(DriverError::Cancelled);
        }
        Ok(Box::new(self.query()?))
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        self.check_open()?;
        self.batch.push(self.params.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> DriverResult<Vec<i64>> {
        self.check_open()?;
        let entries = std::mem::take(&mut self.batch);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let counts = self.run_batch(&entries);
        self.cancel.reset();
        counts
    }

    fn clear_batch(&mut self) -> DriverResult<()> {
        self.batch.clear();
        Ok(())
    }

    fn generated_keys(&mut self) -> DriverResult<Vec<i64>> {
        Err(DriverError::unsupported("generated keys"))
    }

    fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    fn set_fetch_size(&mut self, _rows: usize) -> DriverResult<()> {
        Ok(())
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> DriverResult<()> {
        match direction {
            FetchDirection::Forward | FetchDirection::Unknown => Ok(()),
            FetchDirection::Reverse => Err(DriverError::unsupported("reverse fetch direction")),
        }
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.batch.clear();
        Ok(())
    }
}

fn to_duckdb(param: SqlParam) -> Value {
    match param {
        SqlParam::Null(_) => Value::Null,
        SqlParam::String(s) | SqlParam::CharStream(s) => Value::Text(s),
        SqlParam::Long(n) => Value::BigInt(n),
        SqlParam::Double(n) => Value::Double(n),
        // DuckDB casts the text to the column's DECIMAL type.
        SqlParam::Decimal(d) => Value::Text(d.to_string()),
        SqlParam::Date(d) => Value::Date32(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
        SqlParam::Timestamp(t) => Value::Timestamp(TimeUnit::Microsecond, t.and_utc().timestamp_micros()),
        SqlParam::Boolean(b) => Value::Boolean(b),
        SqlParam::Bytes(b) => Value::Blob(b),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn timestamp(micros: i64) -> SqlValue {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| SqlValue::Timestamp(dt.naive_utc()))
        .unwrap_or(SqlValue::Null)
}

fn from_duckdb(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Boolean(b),
        Value::TinyInt(n) => SqlValue::Long(n.into()),
        Value::SmallInt(n) => SqlValue::Long(n.into()),
        Value::Int(n) => SqlValue::Long(n.into()),
        Value::BigInt(n) => SqlValue::Long(n),
        Value::UTinyInt(n) => SqlValue::Long(n.into()),
        Value::USmallInt(n) => SqlValue::Long(n.into()),
        Value::UInt(n) => SqlValue::Long(n.into()),
        Value::UBigInt(n) => i64::try_from(n)
            .map(SqlValue::Long)
            .unwrap_or_else(|_| SqlValue::Decimal(n.into())),
        Value::HugeInt(n) => i64::try_from(n)
            .map(SqlValue::Long)
            .unwrap_or_else(|_| SqlValue::String(n.to_string())),
        Value::Float(n) => SqlValue::Double(n.into()),
        Value::Double(n) => SqlValue::Double(n),
        Value::Decimal(d) => SqlValue::Decimal(d),
        Value::Text(s) | Value::Enum(s) => SqlValue::String(s),
        Value::Blob(b) => SqlValue::Bytes(b),
        Value::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
        Value::Timestamp(unit, n) => timestamp(to_micros(unit, n)),
        Value::Time64(unit, n) => {
            let micros = to_micros(unit, n);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(0);
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(|t| SqlValue::String(t.format("%H:%M:%S%.f").to_string()))
                .unwrap_or(SqlValue::Null)
        }
        other => SqlValue::String(format!("{:?}", other)),
    }
}

fn column_meta(name: String, data_type: &DataType) -> ColumnMeta {
    match data_type {
        DataType::Boolean => ColumnMeta::new(name, SqlType::Boolean),
        DataType::Int8 | DataType::UInt8 => ColumnMeta::new(name, SqlType::Tinyint).with_precision(3, 0),
        DataType::Int16 | DataType::UInt16 => ColumnMeta::new(name, SqlType::Smallint).with_precision(5, 0),
        DataType::Int32 | DataType::UInt32 => ColumnMeta::new(name, SqlType::Integer).with_precision(10, 0),
        DataType::Int64 | DataType::UInt64 => ColumnMeta::new(name, SqlType::Bigint).with_precision(19, 0),
        DataType::Float16 | DataType::Float32 => ColumnMeta::new(name, SqlType::Real),
        DataType::Float64 => ColumnMeta::new(name, SqlType::Double),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            ColumnMeta::new(name, SqlType::Decimal).with_precision(i32::from(*precision), i32::from(*scale))
        }
        DataType::Utf8 | DataType::LargeUtf8 => ColumnMeta::new(name, SqlType::Varchar),
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => {
            ColumnMeta::new(name, SqlType::Binary)
        }
        DataType::Date32 | DataType::Date64 => ColumnMeta::new(name, SqlType::Date),
        DataType::Timestamp(_, _) => ColumnMeta::new(name, SqlType::Timestamp),
        DataType::Time32(_) | DataType::Time64(_) => ColumnMeta::new(name, SqlType::Time),
        _ => ColumnMeta::new(name, SqlType::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory() -> Box<dyn PhysicalConnection> {
        DuckDbDriver::new()
            .connect(&ConnectRequest {
                url: "duckdb::memory:".to_string(),
                ..ConnectRequest::default()
            })
            .unwrap()
    }

    fn file_request(dir: &TempDir) -> ConnectRequest {
        ConnectRequest {
            url: format!("duckdb:{}", dir.path().join("db").join("test.duckdb").display()),
            ..ConnectRequest::default()
        }
    }

    #[test]
    fn test_query_types_and_metadata() {
        let mut conn = memory();
        let mut stmt = conn
            .prepare(
                "SELECT 42::BIGINT AS id, 'abc' AS name, 12.50::DECIMAL(9,2) AS amount, \
                 DATE '2024-03-01' AS day, TRUE AS flag, NULL::VARCHAR AS missing",
                false,
            )
            .unwrap();
        let mut rs = stmt.execute_query().unwrap();

        let columns = rs.columns().to_vec();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].sql_type, SqlType::Bigint);
        assert_eq!(columns[1].sql_type, SqlType::Varchar);
        assert_eq!(columns[2].sql_type, SqlType::Decimal);
        assert_eq!((columns[2].precision, columns[2].scale), (9, 2));
        assert_eq!(columns[3].sql_type, SqlType::Date);
        assert_eq!(columns[4].sql_type, SqlType::Boolean);

        assert!(rs.next().unwrap());
        assert_eq!(rs.get_long(0).unwrap(), 42);
        assert_eq!(rs.get_string(1).unwrap(), "abc");
        assert_eq!(rs.get_decimal(2).unwrap().to_string(), "12.50");
        assert_eq!(rs.get_date(3).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(rs.get_boolean(4).unwrap());
        rs.get_string(5).unwrap();
        assert!(rs.was_null());
        assert!(!rs.next().unwrap());
    }

    #[test]
    fn test_bound_parameters_round_trip() {
        let mut conn = memory();
        conn.execute("CREATE TABLE t (n BIGINT, d DATE, ts TIMESTAMP, amount DECIMAL(12,3), s VARCHAR)")
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let ts = day.and_hms_micro_opt(23, 59, 58, 123_456).unwrap();

        let mut insert = conn.prepare("INSERT INTO t VALUES (?, ?, ?, ?, ?)", false).unwrap();
        insert.set_param(0, SqlParam::Long(-7)).unwrap();
        insert.set_param(1, SqlParam::Date(day)).unwrap();
        insert.set_param(2, SqlParam::Timestamp(ts)).unwrap();
        insert.set_param(3, SqlParam::Decimal("1234.567".parse().unwrap())).unwrap();
        insert.set_param(4, SqlParam::Null(SqlType::Varchar)).unwrap();
        assert_eq!(insert.execute_update().unwrap(), 1);

        let mut select = conn.prepare("SELECT n, d, ts, amount, s FROM t", false).unwrap();
        let mut rs = select.execute_query().unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_long(0).unwrap(), -7);
        assert_eq!(rs.get_date(1).unwrap(), Some(day));
        assert_eq!(rs.get_timestamp(2).unwrap(), Some(ts));
        assert_eq!(rs.get_decimal(3).unwrap().to_string(), "1234.567");
        rs.get_string(4).unwrap();
        assert!(rs.was_null());
    }

    #[test]
    fn test_batch_reports_failing_entry() {
        let mut conn = memory();
        conn.execute("CREATE TABLE k (id INTEGER PRIMARY KEY)").unwrap();
        let mut insert = conn.prepare("INSERT INTO k VALUES (?)", false).unwrap();
        for id in [1, 2, 2, 3] {
            insert.set_param(0, SqlParam::Long(id)).unwrap();
            insert.add_batch().unwrap();
        }
        match insert.execute_batch() {
            Err(DriverError::Batch { update_counts, .. }) => {
                assert_eq!(update_counts, vec![1, 1, EXECUTE_FAILED]);
            }
            other => panic!("expected a batch failure, got {:?}", other),
        }
        assert_eq!(insert.execute_batch().unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_manual_commit_and_rollback() {
        let mut conn = memory();
        conn.execute("CREATE TABLE t (n INTEGER)").unwrap();
        conn.set_auto_commit(false).unwrap();
        conn.execute("INSERT INTO t VALUES (1)").unwrap();
        conn.commit().unwrap();
        conn.execute("INSERT INTO t VALUES (2)").unwrap();
        conn.rollback().unwrap();
        conn.set_auto_commit(true).unwrap();

        let mut count = conn.prepare("SELECT COUNT(*) FROM t", false).unwrap();
        let mut rs = count.execute_query().unwrap();
        rs.next().unwrap();
        assert_eq!(rs.get_long(0).unwrap(), 1);
    }

    #[test]
    fn test_file_database_is_shared() {
        let dir = TempDir::new().unwrap();
        let driver = DuckDbDriver::new();
        let request = file_request(&dir);

        let mut first = driver.connect(&request).unwrap();
        first.execute("CREATE TABLE shared (n INTEGER)").unwrap();
        first.execute("INSERT INTO shared VALUES (5)").unwrap();

        let mut second = driver.connect(&request).unwrap();
        let mut stmt = second.prepare("SELECT n FROM shared", false).unwrap();
        let mut rs = stmt.execute_query().unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_long(0).unwrap(), 5);
        assert!(dir.path().join("db").join("test.duckdb").exists());
    }

    #[test]
    fn test_max_rows_and_cancel() {
        let mut conn = memory();
        let mut stmt = conn.prepare("SELECT * FROM range(10)", false).unwrap();
        stmt.set_max_rows(3);
        let mut rs = stmt.execute_query().unwrap();
        let mut seen = 0;
        while rs.next().unwrap() {
            seen += 1;
        }
        assert_eq!(seen, 3);

        stmt.set_max_rows(0);
        let mut rs = stmt.execute_query().unwrap();
        assert!(rs.next().unwrap());
        conn.cancel_handle().cancel().unwrap();
        assert_eq!(rs.next(), Err(DriverError::Cancelled));
    }

    #[test]
    fn test_cancel_before_start_is_kept() {
        let mut conn = memory();
        conn.execute("CREATE TABLE t (n INTEGER)").unwrap();
        let cancel = conn.cancel_handle();

        cancel.cancel().unwrap();
        assert_eq!(conn.execute("INSERT INTO t VALUES (1)"), Err(DriverError::Cancelled));
        assert_eq!(conn.execute("INSERT INTO t VALUES (2)"), Ok(1));

        let mut stmt = conn.prepare("SELECT n FROM t", false).unwrap();
        cancel.cancel().unwrap();
        assert!(matches!(stmt.execute_query(), Err(DriverError::Cancelled)));
        let mut rs = stmt.execute_query().unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_long(0).unwrap(), 2);
        assert!(!rs.next().unwrap());
        rs.close().unwrap();

        let mut insert = conn.prepare("INSERT INTO t VALUES (3)", false).unwrap();
        cancel.cancel().unwrap();
        assert_eq!(insert.execute_update(), Err(DriverError::Cancelled));
        assert_eq!(insert.execute_update(), Ok(1));
    }

    #[test]
    fn test_prepare_reports_syntax_errors() {
        let mut conn = memory();
        assert!(conn.prepare("SELEC 1", false).is_err());
        let mut stmt = conn.prepare("SELECT 1", false).unwrap();
        assert!(matches!(stmt.generated_keys(), Err(DriverError::Unsupported { .. })));
        stmt.close().unwrap();
        assert_eq!(stmt.execute_update(), Err(DriverError::Closed));
    }

    #[test]
    fn test_registered_under_dialect_driver_name() {
        let manager = driver_manager();
        assert!(manager.is_registered("duckdb"));
        assert_eq!(
            kiln_dialect::DatabaseType::DuckDb.driver_name(kiln_dialect::AccessType::Native),
            DRIVER_NAME
        );
    }
}
