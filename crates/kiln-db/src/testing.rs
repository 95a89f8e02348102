//! A scripted in-memory connection that records what a session asks of it.

use crate::driver::{
    CallableStatement, Cancel, CancelFlag, ColumnMeta, ConnectRequest, DriverResult, FetchDirection,
    MemoryResultSet, PhysicalConnection, ResultSet, SqlParam, SqlType, SqlValue, Statement,
};
use crate::error::{DriverError, EXECUTE_FAILED};
use crate::pool::ConnectionPool;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Prepare(String),
    Execute(String),
    ExecuteUpdate,
    ExecuteQuery,
    AddBatch,
    ExecuteBatch(usize),
    ClearBatch,
    Commit,
    Rollback,
    AutoCommit(bool),
    PrepareCall(String),
    RegisterOut(usize, SqlType),
    CloseStatement,
    CloseResult,
    Close,
}

/// One statement run: its SQL and the parameters bound at the time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Run {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    runs: Vec<Run>,
    fail_commits: bool,
    fail_batch_at: Option<usize>,
    refuse: bool,
    fail_fetches: bool,
    refuse_calls: bool,
    update_count: u64,
    generated_keys: Vec<i64>,
    results: VecDeque<MemoryResultSet>,
    out_values: HashMap<usize, SqlValue>,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingPool {
    state: Arc<Mutex<State>>,
}

impl RecordingPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn fail_commits(&self) {
        self.with(|s| s.fail_commits = true);
    }

    /// Make batches fail at entry `index`.
    pub fn fail_batch_at(&self, index: usize) {
        self.with(|s| s.fail_batch_at = Some(index));
    }

    pub fn refuse_connections(&self) {
        self.with(|s| s.refuse = true);
    }

    /// Make every fetch from a query result fail.
    pub fn fail_fetches(&self) {
        self.with(|s| s.fail_fetches = true);
    }

    /// Make stored procedure calls fail to prepare.
    pub fn refuse_calls(&self) {
        self.with(|s| s.refuse_calls = true);
    }

    pub fn set_update_count(&self, count: u64) {
        self.with(|s| s.update_count = count);
    }

    pub fn set_generated_keys(&self, keys: Vec<i64>) {
        self.with(|s| s.generated_keys = keys);
    }

    pub fn set_out_value(&self, index: usize, value: SqlValue) {
        self.with(|s| {
            s.out_values.insert(index, value);
        });
    }

    /// Queue the result of the next query.
    pub fn push_result(&self, columns: Vec<ColumnMeta>, rows: Vec<Vec<SqlValue>>) {
        self.with(|s| s.results.push_back(MemoryResultSet::new(columns, rows)));
    }

    pub fn events(&self) -> Vec<Event> {
        self.with(|s| s.events.clone())
    }

    pub fn runs(&self) -> Vec<Run> {
        self.with(|s| s.runs.clone())
    }

    pub fn last_run(&self) -> Option<Run> {
        self.with(|s| s.runs.last().cloned())
    }

    pub fn prepared(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Prepare(sql) | Event::PrepareCall(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.with(|s| s.events.iter().filter(|e| *e == event).count())
    }

    /// Statements run directly whose SQL starts with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.with(|s| {
            s.events
                .iter()
                .filter(|e| matches!(e, Event::Execute(sql) if sql.starts_with(prefix)))
                .count()
        })
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.with(|s| {
            s.events
                .iter()
                .filter_map(|e| match e {
                    Event::ExecuteBatch(n) => Some(*n),
                    _ => None,
                })
                .collect()
        })
    }
}

impl ConnectionPool for RecordingPool {
    fn acquire(&self, _driver: &str, _request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>> {
        if self.with(|s| s.refuse) {
            return Err(DriverError::sql("connection refused"));
        }
        Ok(Box::new(RecordingConnection {
            pool: self.clone(),
            auto_commit: true,
            cancel: CancelFlag::new(),
        }))
    }

    fn release(&self, mut connection: Box<dyn PhysicalConnection>) -> DriverResult<()> {
        connection.close()
    }
}

struct RecordingConnection {
    pool: RecordingPool,
    auto_commit: bool,
    cancel: CancelFlag,
}

impl PhysicalConnection for RecordingConnection {
    fn prepare(&mut self, sql: &str, _return_generated_keys: bool) -> DriverResult<Box<dyn Statement>> {
        self.pool.with(|s| s.events.push(Event::Prepare(sql.to_string())));
        Ok(Box::new(RecordingStatement {
            pool: self.pool.clone(),
            sql: sql.to_string(),
            params: Vec::new(),
            queued: 0,
        }))
    }

    fn prepare_call(&mut self, sql: &str) -> DriverResult<Box<dyn CallableStatement>> {
        let refused = self.pool.with(|s| {
            s.events.push(Event::PrepareCall(sql.to_string()));
            s.refuse_calls
        });
        if refused {
            return Err(DriverError::sql("procedure does not exist"));
        }
        Ok(Box::new(RecordingCall {
            pool: self.pool.clone(),
            sql: sql.to_string(),
            params: Vec::new(),
        }))
    }

    fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        self.pool.with(|s| {
            s.events.push(Event::Execute(sql.to_string()));
            Ok(s.update_count)
        })
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::AutoCommit(auto_commit)));
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.pool.with(|s| {
            s.events.push(Event::Commit);
            if s.fail_commits {
                Err(DriverError::sql("no transaction is active"))
            } else {
                Ok(())
            }
        })
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::Rollback));
        Ok(())
    }

    fn supports_batch_updates(&self) -> bool {
        true
    }

    fn cancel_handle(&self) -> Arc<dyn Cancel> {
        Arc::new(self.cancel.clone())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::Close));
        Ok(())
    }
}

fn bound(params: &[Option<SqlParam>]) -> Vec<SqlParam> {
    params
        .iter()
        .map(|p| p.clone().unwrap_or(SqlParam::Null(SqlType::Other)))
        .collect()
}

fn set_at(params: &mut Vec<Option<SqlParam>>, index: usize, param: SqlParam) {
    if params.len() <= index {
        params.resize(index + 1, None);
    }
    params[index] = Some(param);
}

struct RecordingStatement {
    pool: RecordingPool,
    sql: String,
    params: Vec<Option<SqlParam>>,
    queued: usize,
}

impl RecordingStatement {
    fn record(&self, state: &mut State, event: Event) {
        state.events.push(event);
        state.runs.push(Run {
            sql: self.sql.clone(),
            params: bound(&self.params),
        });
    }
}

impl Statement for RecordingStatement {
    fn set_param(&mut self, index: usize, param: SqlParam) -> DriverResult<()> {
        set_at(&mut self.params, index, param);
        Ok(())
    }

    fn clear_params(&mut self) {
        self.params.clear();
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        let pool = self.pool.clone();
        pool.with(|s| {
            self.record(s, Event::ExecuteUpdate);
            Ok(s.update_count)
        })
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>> {
        let pool = self.pool.clone();
        pool.with(|s| {
            self.record(s, Event::ExecuteQuery);
            let inner = s
                .results
                .pop_front()
                .unwrap_or_else(|| MemoryResultSet::new(Vec::new(), Vec::new()));
            Ok(Box::new(RecordingResult {
                pool: self.pool.clone(),
                inner,
                fail_fetches: s.fail_fetches,
            }) as Box<dyn ResultSet>)
        })
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        let pool = self.pool.clone();
        pool.with(|s| self.record(s, Event::AddBatch));
        self.queued += 1;
        Ok(())
    }

    fn execute_batch(&mut self) -> DriverResult<Vec<i64>> {
        let queued = std::mem::take(&mut self.queued);
        self.pool.with(|s| match s.fail_batch_at {
            Some(at) if at < queued => {
                let mut counts = vec![1; at];
                counts.push(EXECUTE_FAILED);
                Err(DriverError::batch("duplicate key", counts))
            }
            _ => {
                s.events.push(Event::ExecuteBatch(queued));
                Ok(vec![1; queued])
            }
        })
    }

    fn clear_batch(&mut self) -> DriverResult<()> {
        self.queued = 0;
        self.pool.with(|s| s.events.push(Event::ClearBatch));
        Ok(())
    }

    fn generated_keys(&mut self) -> DriverResult<Vec<i64>> {
        Ok(self.pool.with(|s| s.generated_keys.clone()))
    }

    fn set_max_rows(&mut self, _max_rows: usize) {}

    fn set_fetch_size(&mut self, _rows: usize) -> DriverResult<()> {
        Ok(())
    }

    fn set_fetch_direction(&mut self, _direction: FetchDirection) -> DriverResult<()> {
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::CloseStatement));
        Ok(())
    }
}

/// A query result that can refuse to fetch and records being closed.
struct RecordingResult {
    pool: RecordingPool,
    inner: MemoryResultSet,
    fail_fetches: bool,
}

impl ResultSet for RecordingResult {
    fn columns(&self) -> &[ColumnMeta] {
        self.inner.columns()
    }

    fn next(&mut self) -> DriverResult<bool> {
        if self.fail_fetches {
            return Err(DriverError::sql("connection reset while fetching"));
        }
        self.inner.next()
    }

    fn get_long(&mut self, column: usize) -> DriverResult<i64> {
        self.inner.get_long(column)
    }

    fn get_double(&mut self, column: usize) -> DriverResult<f64> {
        self.inner.get_double(column)
    }

    fn get_decimal(&mut self, column: usize) -> DriverResult<Decimal> {
        self.inner.get_decimal(column)
    }

    fn get_string(&mut self, column: usize) -> DriverResult<String> {
        self.inner.get_string(column)
    }

    fn get_date(&mut self, column: usize) -> DriverResult<Option<NaiveDate>> {
        self.inner.get_date(column)
    }

    fn get_timestamp(&mut self, column: usize) -> DriverResult<Option<NaiveDateTime>> {
        self.inner.get_timestamp(column)
    }

    fn get_boolean(&mut self, column: usize) -> DriverResult<bool> {
        self.inner.get_boolean(column)
    }

    fn get_bytes(&mut self, column: usize) -> DriverResult<Vec<u8>> {
        self.inner.get_bytes(column)
    }

    fn was_null(&self) -> bool {
        self.inner.was_null()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::CloseResult));
        self.inner.close()
    }
}

struct RecordingCall {
    pool: RecordingPool,
    sql: String,
    params: Vec<Option<SqlParam>>,
}

impl CallableStatement for RecordingCall {
    fn set_param(&mut self, index: usize, param: SqlParam) -> DriverResult<()> {
        set_at(&mut self.params, index, param);
        Ok(())
    }

    fn register_out_param(&mut self, index: usize, sql_type: SqlType) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::RegisterOut(index, sql_type)));
        Ok(())
    }

    fn execute(&mut self) -> DriverResult<()> {
        let run = Run {
            sql: self.sql.clone(),
            params: bound(&self.params),
        };
        self.pool.with(|s| s.runs.push(run));
        Ok(())
    }

    fn out_value(&mut self, index: usize) -> DriverResult<SqlValue> {
        Ok(self
            .pool
            .with(|s| s.out_values.get(&index).cloned().unwrap_or(SqlValue::Null)))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pool.with(|s| s.events.push(Event::CloseStatement));
        Ok(())
    }
}
