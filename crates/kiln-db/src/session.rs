//! A connection session: one physical connection, its prepared statements,
//! its commit and batch counters, and its open query.

use crate::binding::bind_row;
use crate::cache::MetadataCache;
use crate::config::SessionSettings;
use crate::counter::KeyCounters;
use crate::driver::{Cancel, FetchDirection, PhysicalConnection, ResultSet, Statement};
use crate::error::DatabaseError;
use crate::materialize::{read_row, row_shape};
use crate::pool::{connect_request, ConnectionPool};
use crate::result::ExecResult;
use crate::script::split_statements;
use kiln_dialect::{DialectProfile, LockStatement};
use kiln_value::{Row, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Named prepared-statement slots of a session. Preparing into a slot
/// closes whatever statement the slot held before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementSlot {
    Insert,
    Update,
    Lookup,
    DimensionDup,
    DimensionPunch,
    SequenceNext,
}

impl StatementSlot {
    pub const ALL: [StatementSlot; 6] = [
        StatementSlot::Insert,
        StatementSlot::Update,
        StatementSlot::Lookup,
        StatementSlot::DimensionDup,
        StatementSlot::DimensionPunch,
        StatementSlot::SequenceNext,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StatementSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementSlot::Insert => "insert",
            StatementSlot::Update => "update",
            StatementSlot::Lookup => "lookup",
            StatementSlot::DimensionDup => "dimension update",
            StatementSlot::DimensionPunch => "dimension punch-through",
            StatementSlot::SequenceNext => "sequence",
        };
        f.write_str(name)
    }
}

pub(crate) struct Prepared {
    pub(crate) sql: String,
    pub(crate) statement: Box<dyn Statement>,
}

struct OpenQuery {
    sql: String,
    statement: Box<dyn Statement>,
    result: Box<dyn ResultSet>,
}

type Slots = [Option<Prepared>; 6];

/// One logical connection to a database, bound to a dialect profile.
///
/// A session is used by one thread at a time. Parallel work opens one
/// session per worker from the shared [`ConnectionPool`]; the metadata cache
/// and key counters are shared through `Arc`s.
pub struct ConnectionSession {
    pub(crate) profile: DialectProfile,
    pool: Arc<dyn ConnectionPool>,
    pub(crate) cache: Arc<MetadataCache>,
    pub(crate) counters: Arc<KeyCounters>,
    pub(crate) connection: Option<Box<dyn PhysicalConnection>>,

    auto_commit: bool,
    commit_size: i64,
    written: u64,
    batch_counter: u64,
    use_batch: bool,

    row_limit: usize,
    fetch_size: usize,
    fetch_direction: FetchDirection,

    pub(crate) slots: Slots,
    select: Option<OpenQuery>,
    pub(crate) call: Option<crate::lookup::PreparedCall>,
    result_shape: Option<Row>,
}

pub(crate) fn physical<'a>(
    connection: &'a mut Option<Box<dyn PhysicalConnection>>,
    name: &str,
) -> Result<&'a mut Box<dyn PhysicalConnection>, DatabaseError> {
    connection
        .as_mut()
        .ok_or_else(|| DatabaseError::not_connected(name))
}

pub(crate) fn slot_mut<'a>(
    slots: &'a mut Slots,
    slot: StatementSlot,
    dialect: &str,
) -> Result<&'a mut Prepared, DatabaseError> {
    slots[slot.index()].as_mut().ok_or_else(|| {
        DatabaseError::execution(dialect, "", format!("No {} statement has been prepared", slot))
    })
}

impl ConnectionSession {
    /// Create a disconnected session with its own cache and key counters.
    pub fn new(profile: DialectProfile, pool: Arc<dyn ConnectionPool>) -> Self {
        Self {
            profile,
            pool,
            cache: Arc::new(MetadataCache::new()),
            counters: Arc::new(KeyCounters::new()),
            connection: None,
            auto_commit: true,
            commit_size: 0,
            written: 0,
            batch_counter: 0,
            use_batch: true,
            row_limit: 0,
            fetch_size: 0,
            fetch_direction: FetchDirection::Forward,
            slots: Default::default(),
            select: None,
            call: None,
            result_shape: None,
        }
    }

    /// Share a metadata cache with other sessions.
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Share surrogate key counters with the other sessions of a run.
    pub fn with_counters(mut self, counters: Arc<KeyCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_settings(mut self, settings: &SessionSettings) -> Self {
        self.set_commit(settings.commit_size);
        self.row_limit = settings.row_limit;
        self.fetch_size = settings.fetch_size;
        self.use_batch = settings.use_batch;
        self
    }

    pub fn profile(&self) -> &DialectProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        self.profile.name()
    }

    pub(crate) fn dialect(&self) -> &'static str {
        self.profile.database_type().description()
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn counters(&self) -> &Arc<KeyCounters> {
        &self.counters
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn commit_size(&self) -> i64 {
        self.commit_size
    }

    /// Rows passed through [`ConnectionSession::insert_row`] so far.
    pub fn written_count(&self) -> u64 {
        self.written
    }

    /// Rows queued in the current batch.
    pub fn batch_counter(&self) -> u64 {
        self.batch_counter
    }

    pub fn use_batch(&self) -> bool {
        self.use_batch
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Maximum rows returned by queries; 0 means no limit.
    pub fn set_row_limit(&mut self, row_limit: usize) {
        self.row_limit = row_limit;
    }

    pub fn set_fetch_size(&mut self, fetch_size: usize) {
        self.fetch_size = fetch_size;
    }

    pub fn set_fetch_direction(&mut self, direction: FetchDirection) {
        self.fetch_direction = direction;
    }

    /// Open the physical connection through the pool.
    pub fn connect(&mut self) -> Result<(), DatabaseError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let driver = self.profile.driver_name().to_string();
        let request = connect_request(&self.profile);
        let mut connection = self.pool.acquire(&driver, &request).map_err(|e| {
            DatabaseError::connection(
                format!("{}", self.profile),
                driver.as_str(),
                e.to_string(),
            )
        })?;

        let auto = self.commit_size <= 0;
        if let Err(e) = connection.set_auto_commit(auto) {
            warn!(connection = %self.profile.name(), error = %e, "Unable to set auto-commit to {}", auto);
        }
        self.auto_commit = connection.auto_commit();
        self.connection = Some(connection);
        info!(connection = %self.profile.name(), driver = %driver, "Connected to database");
        Ok(())
    }

    /// Set the number of rows per commit. 0 or less switches auto-commit on.
    pub fn set_commit(&mut self, commit_size: i64) {
        self.commit_size = commit_size;
        let auto = commit_size <= 0;
        match self.connection.as_mut() {
            Some(connection) => {
                if let Err(e) = connection.set_auto_commit(auto) {
                    warn!(connection = %self.profile.name(), error = %e, "Unable to set auto-commit to {}", auto);
                }
                self.auto_commit = connection.auto_commit();
            }
            None => self.auto_commit = auto,
        }
        debug!(connection = %self.profile.name(), commit_size, auto_commit = self.auto_commit, "Commit size set");
    }

    /// Commit the running transaction.
    ///
    /// Skipped when the dialect has no transactions. A failing commit is an
    /// error only for dialects that accept empty transactions; the others
    /// reject commits with nothing pending, so their failures are logged.
    pub fn commit(&mut self) -> Result<(), DatabaseError> {
        if !self.profile.supports_transactions() {
            debug!(connection = %self.profile.name(), "No commit possible, transactions are not supported");
            return Ok(());
        }
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;
        match connection.commit() {
            Ok(()) => {
                debug!(connection = %self.profile.name(), "Commit on database connection");
                Ok(())
            }
            Err(e) if self.profile.supports_empty_transactions() => {
                Err(DatabaseError::from_driver(dialect, "COMMIT", e))
            }
            Err(e) => {
                warn!(connection = %self.profile.name(), error = %e, "Ignoring commit failure");
                Ok(())
            }
        }
    }

    pub fn rollback(&mut self) -> Result<(), DatabaseError> {
        if !self.profile.supports_transactions() {
            debug!(connection = %self.profile.name(), "No rollback possible, transactions are not supported");
            return Ok(());
        }
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;
        connection
            .rollback()
            .map_err(|e| DatabaseError::execution(dialect, "ROLLBACK", e.to_string()))?;
        debug!(connection = %self.profile.name(), "Rollback on database connection");
        Ok(())
    }

    /// Commit pending work, close every statement and hand the connection
    /// back to the pool. Never fails; problems are logged. Calling it again
    /// does nothing.
    pub fn disconnect(&mut self) {
        if self.connection.is_none() {
            return;
        }
        if !self.auto_commit {
            if let Err(e) = self.commit() {
                error!(connection = %self.profile.name(), error = %e, "Error committing on disconnect");
            }
        }
        if let Err(e) = self.close_query() {
            error!(connection = %self.profile.name(), error = %e, "Error closing query on disconnect");
        }
        for slot in StatementSlot::ALL {
            if let Err(e) = self.close_slot(slot) {
                error!(connection = %self.profile.name(), %slot, error = %e, "Error closing statement on disconnect");
            }
        }
        if let Some(mut call) = self.call.take() {
            if let Err(e) = call.statement.close() {
                error!(connection = %self.profile.name(), error = %e, "Error closing procedure call on disconnect");
            }
        }
        self.result_shape = None;
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.pool.release(connection) {
                error!(connection = %self.profile.name(), error = %e, "Error closing connection");
            }
        }
        info!(connection = %self.profile.name(), "Disconnected from database");
    }

    /// A handle that cancels the statement running on this session. It can
    /// be used from any thread and leaves the statement slots untouched.
    pub fn cancel_handle(&self) -> Result<Arc<dyn Cancel>, DatabaseError> {
        self.connection
            .as_ref()
            .map(|c| c.cancel_handle())
            .ok_or_else(|| DatabaseError::not_connected(self.profile.name()))
    }

    /// Prepare `sql` into `slot`, closing the statement the slot held.
    pub fn prepare_slot(
        &mut self,
        slot: StatementSlot,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<(), DatabaseError> {
        self.close_slot(slot)?;
        let sql = self.profile.strip_cr(sql);
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;
        let statement = connection
            .prepare(&sql, return_generated_keys)
            .map_err(|e| DatabaseError::preparation(dialect, sql.as_str(), e.to_string()))?;
        debug!(connection = %self.profile.name(), %slot, sql = %sql, "Prepared statement");
        self.slots[slot.index()] = Some(Prepared { sql, statement });
        Ok(())
    }

    /// Prepare `sql` into `slot` unless the slot already holds it.
    pub(crate) fn ensure_prepared(
        &mut self,
        slot: StatementSlot,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<(), DatabaseError> {
        let stripped = self.profile.strip_cr(sql);
        if self.prepared_sql(slot) == Some(stripped.as_str()) {
            return Ok(());
        }
        self.prepare_slot(slot, sql, return_generated_keys)
    }

    pub fn is_prepared(&self, slot: StatementSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// SQL held by `slot`, as sent to the driver.
    pub fn prepared_sql(&self, slot: StatementSlot) -> Option<&str> {
        self.slots[slot.index()].as_ref().map(|p| p.sql.as_str())
    }

    pub fn close_slot(&mut self, slot: StatementSlot) -> Result<(), DatabaseError> {
        if let Some(mut prepared) = self.slots[slot.index()].take() {
            prepared
                .statement
                .close()
                .map_err(|e| DatabaseError::from_driver(self.dialect(), prepared.sql, e))?;
        }
        Ok(())
    }

    /// `INSERT INTO table(...) VALUES (...)` for the fields of `row`.
    pub fn insert_statement(&self, table: &str, row: &Row) -> String {
        let columns: Vec<String> = row
            .iter()
            .map(|v| self.profile.quote_field(v.name()))
            .collect();
        let params = vec!["?"; row.len()].join(", ");
        format!(
            "INSERT INTO {}({}) VALUES ({})",
            self.profile.quote_field(table),
            columns.join(", "),
            params
        )
    }

    pub fn prepare_insert(&mut self, table: &str, row: &Row) -> Result<(), DatabaseError> {
        let sql = self.insert_statement(table, row);
        self.prepare_slot(StatementSlot::Insert, &sql, false)
    }

    /// Bind `row` to the parameters of the statement in `slot`.
    pub fn set_values(&mut self, slot: StatementSlot, row: &Row) -> Result<(), DatabaseError> {
        let dialect = self.dialect();
        let prepared = slot_mut(&mut self.slots, slot, dialect)?;
        bind_row(&self.profile, &mut *prepared.statement, row, 0)
            .map_err(|e| DatabaseError::from_driver(dialect, prepared.sql.as_str(), e))?;
        Ok(())
    }

    pub fn set_values_insert(&mut self, row: &Row) -> Result<(), DatabaseError> {
        self.set_values(StatementSlot::Insert, row)
    }

    pub fn set_values_update(&mut self, row: &Row) -> Result<(), DatabaseError> {
        self.set_values(StatementSlot::Update, row)
    }

    pub fn set_values_lookup(&mut self, row: &Row) -> Result<(), DatabaseError> {
        self.set_values(StatementSlot::Lookup, row)
    }

    /// Execute or queue the statement in `slot` with its bound values.
    ///
    /// Under auto-commit the row runs at once. Otherwise it joins the batch
    /// when `batch` is asked for and both the driver and the dialect take
    /// batches, or runs at once if not. Every `commit_size` rows the batch is
    /// flushed and the transaction committed.
    pub fn insert_row(&mut self, slot: StatementSlot, batch: bool) -> Result<(), DatabaseError> {
        let dialect = self.dialect();
        let use_batch = batch
            && self.profile.supports_batch_updates()
            && self
                .connection
                .as_ref()
                .is_some_and(|c| c.supports_batch_updates());
        let queue = !self.auto_commit && use_batch;

        {
            let prepared = slot_mut(&mut self.slots, slot, dialect)?;
            let outcome = if queue {
                prepared.statement.add_batch()
            } else {
                prepared.statement.execute_update().map(|_| ())
            };
            outcome.map_err(|e| DatabaseError::from_driver(dialect, prepared.sql.as_str(), e))?;
        }
        if queue {
            self.batch_counter += 1;
        }
        self.written += 1;

        if !self.auto_commit
            && self.commit_size > 0
            && self.written % self.commit_size.unsigned_abs() == 0
        {
            if queue {
                self.flush_batch(slot)?;
                self.commit()?;
                self.clear_batch(slot)?;
            } else {
                self.commit()?;
            }
        }
        Ok(())
    }

    /// Bind `row` to the insert statement and insert it, batching when the
    /// session is configured to.
    pub fn write_row(&mut self, row: &Row) -> Result<(), DatabaseError> {
        self.set_values_insert(row)?;
        self.insert_row(StatementSlot::Insert, self.use_batch)
    }

    /// Run the update statement with its bound values.
    pub fn update_row(&mut self) -> Result<(), DatabaseError> {
        self.insert_row(StatementSlot::Update, false)
    }

    /// Insert a single row into `table` with a throwaway insert statement.
    pub fn insert_into(&mut self, table: &str, row: &Row) -> Result<(), DatabaseError> {
        self.prepare_insert(table, row)?;
        self.set_values_insert(row)?;
        self.insert_row(StatementSlot::Insert, false)?;
        self.close_slot(StatementSlot::Insert)
    }

    fn flush_batch(&mut self, slot: StatementSlot) -> Result<(), DatabaseError> {
        let dialect = self.dialect();
        let prepared = slot_mut(&mut self.slots, slot, dialect)?;
        let counts = prepared
            .statement
            .execute_batch()
            .map_err(|e| DatabaseError::from_driver(dialect, prepared.sql.as_str(), e))?;
        debug!(connection = %self.profile.name(), rows = counts.len(), "Executed batch");
        Ok(())
    }

    fn clear_batch(&mut self, slot: StatementSlot) -> Result<(), DatabaseError> {
        let dialect = self.dialect();
        let prepared = slot_mut(&mut self.slots, slot, dialect)?;
        prepared
            .statement
            .clear_batch()
            .map_err(|e| DatabaseError::from_driver(dialect, prepared.sql.as_str(), e))?;
        self.batch_counter = 0;
        Ok(())
    }

    /// End of the insert stream: flush what is left of the batch, commit,
    /// and close the insert statement.
    pub fn insert_finished(&mut self, batch: bool) -> Result<(), DatabaseError> {
        self.finish_slot(StatementSlot::Insert, batch)
    }

    /// End of a write stream on `slot`.
    pub fn finish_slot(&mut self, slot: StatementSlot, batch: bool) -> Result<(), DatabaseError> {
        if !self.auto_commit {
            let driver_batch = self
                .connection
                .as_ref()
                .is_some_and(|c| c.supports_batch_updates());
            if batch && driver_batch && self.batch_counter > 0 {
                self.flush_batch(slot)?;
                self.commit()?;
                self.clear_batch(slot)?;
            } else {
                self.commit()?;
            }
        }
        self.close_slot(slot)
    }

    /// Run one statement. With `params` it is prepared and bound first.
    /// Returns the rows it touched by statement kind. Altering a table drops
    /// the cached shapes of this connection.
    pub fn exec_statement(&mut self, sql: &str, params: Option<&Row>) -> Result<ExecResult, DatabaseError> {
        let sql = self.profile.strip_cr(sql);
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;

        let count = match params {
            Some(row) => {
                let mut statement = connection
                    .prepare(&sql, false)
                    .map_err(|e| DatabaseError::preparation(dialect, sql.as_str(), e.to_string()))?;
                bind_row(&self.profile, &mut *statement, row, 0)
                    .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?;
                let count = statement
                    .execute_update()
                    .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?;
                if let Err(e) = statement.close() {
                    warn!(connection = %self.profile.name(), error = %e, "Error closing statement");
                }
                count
            }
            None => connection
                .execute(&sql)
                .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?,
        };
        debug!(connection = %self.profile.name(), sql = %sql, rows = count, "Executed statement");

        if sql.trim_start().to_uppercase().starts_with("ALTER TABLE") {
            self.cache.clear_connection(self.profile.name());
        }
        Ok(ExecResult::for_statement(&sql, count))
    }

    /// Run a `;` separated script. Queries are read to the end and counted
    /// as rows read.
    pub fn exec_statements(&mut self, script: &str) -> Result<ExecResult, DatabaseError> {
        let mut total = ExecResult::default();
        for statement in split_statements(script) {
            if statement.to_uppercase().starts_with("SELECT") {
                self.open_query(&statement, None)?;
                let mut read = 0;
                while self.get_row()?.is_some() {
                    read += 1;
                }
                self.close_query()?;
                total.lines_read += read;
            } else {
                total += self.exec_statement(&statement, None)?;
            }
        }
        Ok(total)
    }

    /// Open a query, closing any query still open. Returns the shape of its
    /// rows, which [`ConnectionSession::get_row`] reuses for every row.
    pub fn open_query(&mut self, sql: &str, params: Option<&Row>) -> Result<Row, DatabaseError> {
        self.close_query()?;
        let sql = self.profile.strip_cr(sql);
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;

        let mut statement = connection
            .prepare(&sql, false)
            .map_err(|e| DatabaseError::preparation(dialect, sql.as_str(), e.to_string()))?;
        if let Some(row) = params {
            bind_row(&self.profile, &mut *statement, row, 0)
                .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?;
        }
        if self.profile.is_fetch_size_supported() {
            let fetch_size = self.fetch_size.max(self.row_limit);
            if fetch_size > 0 {
                if let Err(e) = statement.set_fetch_size(fetch_size) {
                    warn!(connection = %self.profile.name(), error = %e, "Unable to set fetch size");
                }
            }
            if let Err(e) = statement.set_fetch_direction(self.fetch_direction) {
                warn!(connection = %self.profile.name(), error = %e, "Unable to set fetch direction");
            }
        }
        if self.row_limit > 0 {
            statement.set_max_rows(self.row_limit);
        }

        let result = statement
            .execute_query()
            .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?;
        let shape = row_shape(&self.profile, result.columns());
        debug!(connection = %self.profile.name(), sql = %sql, "Opened query");

        self.result_shape = Some(shape.clone());
        self.select = Some(OpenQuery {
            sql,
            statement,
            result,
        });
        Ok(shape)
    }

    /// Shape of the rows of the current query.
    pub fn result_shape(&self) -> Option<&Row> {
        self.result_shape.as_ref()
    }

    /// Next row of the open query, `None` once exhausted.
    pub fn get_row(&mut self) -> Result<Option<Row>, DatabaseError> {
        let dialect = self.dialect();
        let query = self
            .select
            .as_mut()
            .ok_or_else(|| DatabaseError::execution(dialect, "", "No query is open"))?;
        let shape = self
            .result_shape
            .as_ref()
            .ok_or_else(|| DatabaseError::execution(dialect, query.sql.as_str(), "No result shape"))?;

        let has_row = query
            .result
            .next()
            .map_err(|e| DatabaseError::from_driver(dialect, query.sql.as_str(), e))?;
        if !has_row {
            return Ok(None);
        }
        read_row(&self.profile, shape, &mut *query.result)
            .map(Some)
            .map_err(|e| DatabaseError::from_driver(dialect, query.sql.as_str(), e))
    }

    /// Close the open query, if any.
    pub fn close_query(&mut self) -> Result<(), DatabaseError> {
        if let Some(mut query) = self.select.take() {
            let dialect = self.dialect();
            query
                .result
                .close()
                .map_err(|e| DatabaseError::from_driver(dialect, query.sql.as_str(), e))?;
            query
                .statement
                .close()
                .map_err(|e| DatabaseError::from_driver(dialect, query.sql.as_str(), e))?;
        }
        Ok(())
    }

    /// First row of `sql`, or `None` when it returns nothing.
    pub fn get_one_row(&mut self, sql: &str) -> Result<Option<Row>, DatabaseError> {
        self.get_one_row_with(sql, None)
    }

    pub fn get_one_row_with(&mut self, sql: &str, params: Option<&Row>) -> Result<Option<Row>, DatabaseError> {
        self.open_query(sql, params)?;
        let row = self.get_row();
        let closed = self.close_query();
        let row = row?;
        closed?;
        Ok(row)
    }

    /// Up to `limit` rows of `sql`; 0 reads them all.
    pub fn get_rows(&mut self, sql: &str, limit: usize) -> Result<Vec<Row>, DatabaseError> {
        self.open_query(sql, None)?;
        let mut rows = Vec::new();
        while limit == 0 || rows.len() < limit {
            match self.get_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break,
                Err(e) => {
                    if let Err(close) = self.close_query() {
                        warn!(connection = %self.profile.name(), error = %close, "Error closing query");
                    }
                    return Err(e);
                }
            }
        }
        self.close_query()?;
        Ok(rows)
    }

    /// Up to `limit` rows of `table`; 0 reads them all.
    pub fn get_first_rows(&mut self, table: &str, limit: usize) -> Result<Vec<Row>, DatabaseError> {
        let mut sql = format!("SELECT * FROM {}", self.profile.quote_field(table));
        if limit > 0 {
            sql.push_str(&self.profile.limit_clause(limit));
        }
        self.get_rows(&sql, limit)
    }

    /// Shape of the rows `sql` returns. Needs an open connection even when
    /// the shape is cached.
    pub fn query_fields(&mut self, sql: &str) -> Result<Row, DatabaseError> {
        if self.connection.is_none() {
            return Err(DatabaseError::not_connected(self.profile.name()));
        }
        if let Some(shape) = self.cache.lookup(self.profile.name(), sql) {
            return Ok(shape);
        }
        let shape = self.probe_shape(sql)?;
        self.cache.store(self.profile.name(), sql, shape.clone());
        Ok(shape)
    }

    /// Cached shape of `sql`, without touching the database.
    pub fn cached_query_fields(&self, sql: &str) -> Option<Row> {
        self.cache.lookup(self.profile.name(), sql)
    }

    /// Columns of `table`.
    pub fn table_fields(&mut self, table: &str) -> Result<Row, DatabaseError> {
        let sql = self.profile.sql_query_fields(table);
        self.query_fields(&sql)
    }

    /// Run `sql` for at most one row to learn its shape. The open query is
    /// left alone.
    fn probe_shape(&mut self, sql: &str) -> Result<Row, DatabaseError> {
        let sql = self.profile.strip_cr(sql);
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;
        let mut statement = connection
            .prepare(&sql, false)
            .map_err(|e| DatabaseError::preparation(dialect, sql.as_str(), e.to_string()))?;
        statement.set_max_rows(1);
        let mut result = statement
            .execute_query()
            .map_err(|e| DatabaseError::from_driver(dialect, sql.as_str(), e))?;
        let shape = row_shape(&self.profile, result.columns());
        if let Err(e) = result.close().and_then(|_| statement.close()) {
            warn!(connection = %self.profile.name(), error = %e, "Error closing metadata probe");
        }
        Ok(shape)
    }

    /// Whether `table` can be queried.
    pub fn check_table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
        if self.connection.is_none() {
            return Err(DatabaseError::not_connected(self.profile.name()));
        }
        let sql = self.profile.sql_table_exists(table);
        match self.get_one_row(&sql) {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(connection = %self.profile.name(), table, error = %e, "Table does not exist");
                Ok(false)
            }
        }
    }

    pub fn check_sequence_exists(&mut self, sequence: &str) -> Result<bool, DatabaseError> {
        let sql = self
            .profile
            .sql_sequence_exists(sequence)
            .ok_or_else(|| DatabaseError::unsupported(self.dialect(), "sequences"))?;
        Ok(self.get_one_row(&sql)?.is_some())
    }

    /// DDL bringing `table` to `fields`: a CREATE TABLE when it does not
    /// exist, otherwise the ALTER TABLE statements needed.
    pub fn ddl(
        &mut self,
        table: &str,
        fields: &Row,
        tk: Option<&str>,
        use_autoinc: bool,
        pk: Option<&str>,
        semicolon: bool,
    ) -> Result<String, DatabaseError> {
        if self.check_table_exists(table)? {
            let current = self.table_fields(table)?;
            Ok(self
                .profile
                .alter_table_statement(table, fields, &current, tk, use_autoinc, pk, semicolon))
        } else {
            Ok(self
                .profile
                .create_table_statement(table, fields, tk, use_autoinc, pk, semicolon))
        }
    }

    pub fn lock_tables(&mut self, tables: &[&str]) -> Result<(), DatabaseError> {
        match self.profile.sql_lock_tables(tables) {
            LockStatement::Sql(sql) => self.exec_statements(&sql).map(|_| ()),
            LockStatement::ImplicitOnCommit => Ok(()),
            LockStatement::Unsupported => Err(DatabaseError::unsupported(self.dialect(), "table locking")),
        }
    }

    pub fn unlock_tables(&mut self, tables: &[&str]) -> Result<(), DatabaseError> {
        match self.profile.sql_unlock_tables(tables) {
            LockStatement::Sql(sql) => self.exec_statements(&sql).map(|_| ()),
            LockStatement::ImplicitOnCommit => Ok(()),
            LockStatement::Unsupported => Err(DatabaseError::unsupported(self.dialect(), "table locking")),
        }
    }

    pub fn truncate_table(&mut self, table: &str) -> Result<ExecResult, DatabaseError> {
        let sql = self.profile.truncate_table_statement(table);
        self.exec_statement(&sql, None)
    }

    /// Next value of `sequence`, as an integer value named `keyfield`.
    pub fn next_sequence_value(&mut self, sequence: &str, keyfield: &str) -> Result<Value, DatabaseError> {
        let dialect = self.dialect();
        let sql = self
            .profile
            .sql_next_sequence_value(sequence)
            .ok_or_else(|| DatabaseError::unsupported(dialect, "sequences"))?;
        self.ensure_prepared(StatementSlot::SequenceNext, &sql, false)?;

        let prepared = slot_mut(&mut self.slots, StatementSlot::SequenceNext, dialect)?;
        let sql = prepared.sql.as_str();
        let mut result = prepared
            .statement
            .execute_query()
            .map_err(|e| DatabaseError::from_driver(dialect, sql, e))?;
        let next = match result.next() {
            Ok(true) => result.get_long(0).map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };
        if let Err(e) = result.close() {
            warn!(connection = %self.profile.name(), error = %e, "Error closing sequence result");
        }
        let next = next
            .map_err(|e| DatabaseError::from_driver(dialect, sql, e))?
            .ok_or_else(|| DatabaseError::execution(dialect, sql, "Sequence returned no value"))?;
        Ok(Value::from_integer(keyfield, next).with_length(9, 0))
    }

    /// Current value of `sequence`, `None` when the database reports none.
    pub fn current_sequence_value(&mut self, sequence: &str) -> Result<Option<Value>, DatabaseError> {
        let sql = self
            .profile
            .sql_current_sequence_value(sequence)
            .ok_or_else(|| DatabaseError::unsupported(self.dialect(), "sequences"))?;
        Ok(self.get_one_row(&sql)?.and_then(|row| row.get(0).cloned()))
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("profile", &self.profile.name())
            .field("connected", &self.connection.is_some())
            .field("auto_commit", &self.auto_commit)
            .field("commit_size", &self.commit_size)
            .field("written", &self.written)
            .field("batch_counter", &self.batch_counter)
            .finish()
    }
}
