//! Slowly changing dimension maintenance: versioned (type 2) inserts,
//! in-place (type 1) updates, punch-through updates, junk dimension
//! combinations and surrogate key generation.

use crate::error::DatabaseError;
use crate::lookup::ReturnColumn;
use crate::session::{slot_mut, ConnectionSession, StatementSlot};
use chrono::{Local, NaiveDateTime};
use kiln_dialect::DatabaseType;
use kiln_value::{Row, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Column layout of a type 2 dimension table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionTable {
    pub table: String,
    pub technical_key: String,
    pub version: String,
    pub date_from: String,
    pub date_to: String,
    /// Natural key columns.
    pub keys: Vec<String>,
    /// Attribute columns written with every new version.
    pub fields: Vec<String>,
    /// The database generates the technical key on insert.
    pub autoinc: bool,
    /// Set to the insert time of each version.
    pub date_inserted: Option<String>,
    /// Set on insert and again when the version is closed.
    pub date_updated: Option<String>,
    /// True for the newest version of an entry only.
    pub last_version: Option<String>,
}

impl DimensionTable {
    pub fn new(table: impl Into<String>, technical_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            technical_key: technical_key.into(),
            version: "version".to_string(),
            date_from: "date_from".to_string(),
            date_to: "date_to".to_string(),
            keys: Vec::new(),
            fields: Vec::new(),
            autoinc: false,
            date_inserted: None,
            date_updated: None,
            last_version: None,
        }
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_version_columns(
        mut self,
        version: impl Into<String>,
        date_from: impl Into<String>,
        date_to: impl Into<String>,
    ) -> Self {
        self.version = version.into();
        self.date_from = date_from.into();
        self.date_to = date_to.into();
        self
    }

    pub fn with_autoinc(mut self, autoinc: bool) -> Self {
        self.autoinc = autoinc;
        self
    }

    pub fn with_date_inserted(mut self, column: impl Into<String>) -> Self {
        self.date_inserted = Some(column.into());
        self
    }

    pub fn with_date_updated(mut self, column: impl Into<String>) -> Self {
        self.date_updated = Some(column.into());
        self
    }

    pub fn with_last_version(mut self, column: impl Into<String>) -> Self {
        self.last_version = Some(column.into());
        self
    }

    /// Audit columns written on insert, in binding order.
    fn insert_stamps(&self) -> impl Iterator<Item = &String> {
        self.date_inserted
            .iter()
            .chain(&self.date_updated)
            .chain(&self.last_version)
    }

    /// Columns set when a version is closed, after the end date.
    fn close_stamps(&self) -> impl Iterator<Item = &String> {
        self.date_updated.iter().chain(&self.last_version)
    }
}

/// A new version of a dimension entry.
#[derive(Debug, Clone, Copy)]
pub struct DimensionVersion<'a> {
    /// Natural key values, in [`DimensionTable::keys`] order.
    pub keys: &'a Row,
    /// Attribute values, in [`DimensionTable::fields`] order.
    pub fields: &'a Row,
    /// Key to insert with; ignored when the database generates it.
    pub technical_key: Option<i64>,
    /// Version being superseded. `None` inserts a brand new entry at
    /// version 1; otherwise the new row gets the next version and the
    /// superseded row is closed at `date_from`.
    pub previous_version: Option<i64>,
    pub date_from: NaiveDateTime,
    pub date_to: NaiveDateTime,
}

/// Outcome of [`ConnectionSession::dim_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedVersion {
    pub technical_key: i64,
    pub version: i64,
}

/// Column layout of a junk dimension: a technical key per distinct
/// combination of key values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationTable {
    pub table: String,
    pub technical_key: String,
    pub keys: Vec<String>,
    /// Column holding a checksum of the key values, searched first.
    pub crc_field: Option<String>,
    pub autoinc: bool,
}

impl CombinationTable {
    pub fn new<I, S>(table: impl Into<String>, technical_key: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            technical_key: technical_key.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            crc_field: None,
            autoinc: false,
        }
    }

    pub fn with_crc_field(mut self, crc_field: impl Into<String>) -> Self {
        self.crc_field = Some(crc_field.into());
        self
    }

    pub fn with_autoinc(mut self, autoinc: bool) -> Self {
        self.autoinc = autoinc;
        self
    }
}

/// CRC-32 of the key values' text, null values counting as empty text.
pub fn natural_key_crc(keys: &Row) -> i64 {
    let mut hasher = crc32fast::Hasher::new();
    for value in keys.iter().filter(|v| !v.is_null()) {
        hasher.update(value.as_string().as_bytes());
    }
    i64::from(hasher.finalize())
}

/// Append every value of `other`, duplicate names included.
fn append(row: &mut Row, other: &Row) {
    for value in other.iter() {
        row.push(value.clone());
    }
}

impl ConnectionSession {
    fn quoted(&self, columns: &[String]) -> Vec<String> {
        columns.iter().map(|c| self.profile.quote_field(c)).collect()
    }

    /// Technical key column and its VALUES entry, if the insert carries one.
    fn key_column(&self, column: &str, autoinc: bool) -> Option<(String, &'static str)> {
        if !autoinc {
            Some((self.profile.quote_field(column), "?"))
        } else if self.profile.database_type() == DatabaseType::Informix {
            // A zero makes the serial column generate the next value.
            Some((self.profile.quote_field(column), "0"))
        } else {
            None
        }
    }

    fn generated_key(&mut self, slot: StatementSlot, table: &str) -> Result<i64, DatabaseError> {
        let dialect = self.dialect();
        let prepared = slot_mut(&mut self.slots, slot, dialect)?;
        let keys = prepared
            .statement
            .generated_keys()
            .map_err(|e| DatabaseError::from_driver(dialect, prepared.sql.as_str(), e))?;
        keys.first()
            .copied()
            .ok_or_else(|| DatabaseError::key_retrieval(dialect, table))
    }

    pub fn dim_insert_statement(&self, dim: &DimensionTable) -> String {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        if let Some((column, value)) = self.key_column(&dim.technical_key, dim.autoinc) {
            columns.push(column);
            values.push(value);
        }
        for column in [&dim.version, &dim.date_from, &dim.date_to] {
            columns.push(self.profile.quote_field(column));
            values.push("?");
        }
        for column in self.quoted(&dim.keys).into_iter().chain(self.quoted(&dim.fields)) {
            columns.push(column);
            values.push("?");
        }
        for column in dim.insert_stamps() {
            columns.push(self.profile.quote_field(column));
            values.push("?");
        }
        format!(
            "INSERT INTO {}( {}) VALUES({})",
            self.profile.quote_field(&dim.table),
            columns.join(", "),
            values.join(", ")
        )
    }

    pub fn dim_close_statement(&self, dim: &DimensionTable) -> String {
        let keys: Vec<String> = self
            .quoted(&dim.keys)
            .into_iter()
            .map(|k| format!("{} = ?", k))
            .collect();
        let mut sql = format!(
            "UPDATE {}\nSET {} = ?",
            self.profile.quote_field(&dim.table),
            self.profile.quote_field(&dim.date_to)
        );
        for column in dim.close_stamps() {
            sql.push_str(&format!(", {} = ?", self.profile.quote_field(column)));
        }
        sql.push_str("\nWHERE ");
        for key in &keys {
            sql.push_str(key);
            sql.push_str("\nAND   ");
        }
        sql.push_str(&format!("{} = ? ", self.profile.quote_field(&dim.version)));
        sql
    }

    /// Insert a new version of a dimension entry. A correction of an
    /// existing entry also closes the superseded version by setting its end
    /// date to the new version's start date. The audit columns of
    /// [`DimensionTable`] are stamped with the current time, and the last
    /// version flag moves from the closed version to the new one.
    pub fn dim_insert(
        &mut self,
        dim: &DimensionTable,
        entry: &DimensionVersion<'_>,
    ) -> Result<InsertedVersion, DatabaseError> {
        let insert_sql = self.dim_insert_statement(dim);
        let close_sql = self.dim_close_statement(dim);
        self.ensure_prepared(StatementSlot::Insert, &insert_sql, dim.autoinc)?;
        self.ensure_prepared(StatementSlot::Update, &close_sql, false)?;

        let version = entry.previous_version.map_or(1, |previous| previous + 1);
        let mut row = Row::with_capacity(7 + entry.keys.len() + entry.fields.len());
        if !dim.autoinc {
            let technical_key = entry.technical_key.ok_or_else(|| {
                DatabaseError::configuration(format!(
                    "No technical key given for '{}' and it is not generated",
                    dim.table
                ))
            })?;
            row.push(Value::from_integer(dim.technical_key.as_str(), technical_key));
        }
        row.push(Value::from_integer(dim.version.as_str(), version));
        row.push(Value::from_date(dim.date_from.as_str(), entry.date_from));
        row.push(Value::from_date(dim.date_to.as_str(), entry.date_to));
        append(&mut row, entry.keys);
        append(&mut row, entry.fields);
        let now = Local::now().naive_local();
        if let Some(column) = &dim.date_inserted {
            row.push(Value::from_date(column.as_str(), now));
        }
        if let Some(column) = &dim.date_updated {
            row.push(Value::from_date(column.as_str(), now));
        }
        if let Some(column) = &dim.last_version {
            row.push(Value::from_boolean(column.as_str(), true));
        }

        self.set_values(StatementSlot::Insert, &row)?;
        self.insert_row(StatementSlot::Insert, false)?;

        let technical_key = match entry.technical_key {
            Some(key) if !dim.autoinc => key,
            _ => self.generated_key(StatementSlot::Insert, &dim.table)?,
        };

        if let Some(previous) = entry.previous_version {
            let mut close = Row::with_capacity(entry.keys.len() + 4);
            close.push(Value::from_date(dim.date_to.as_str(), entry.date_from));
            if let Some(column) = &dim.date_updated {
                close.push(Value::from_date(column.as_str(), now));
            }
            if let Some(column) = &dim.last_version {
                close.push(Value::from_boolean(column.as_str(), false));
            }
            append(&mut close, entry.keys);
            close.push(Value::from_integer(dim.version.as_str(), previous));
            self.set_values(StatementSlot::Update, &close)?;
            self.insert_row(StatementSlot::Update, false)?;
        }

        debug!(connection = %self.profile.name(), table = %dim.table, technical_key, version, "Inserted dimension version");
        Ok(InsertedVersion {
            technical_key,
            version,
        })
    }

    /// Overwrite `columns` of the row with key `technical_key`.
    pub fn dim_update(
        &mut self,
        dim: &DimensionTable,
        columns: &[&str],
        values: &Row,
        technical_key: i64,
    ) -> Result<(), DatabaseError> {
        let mut sql = format!("UPDATE {}\nSET ", self.profile.quote_field(&dim.table));
        for (i, column) in columns.iter().enumerate() {
            sql.push_str(if i == 0 { "  " } else { ", " });
            sql.push_str(&format!("{} = ?\n", self.profile.quote_field(column)));
        }
        sql.push_str(&format!(
            "WHERE  {} = ?",
            self.profile.quote_field(&dim.technical_key)
        ));
        self.ensure_prepared(StatementSlot::DimensionDup, &sql, false)?;

        let mut row = values.clone();
        row.push(Value::from_integer(dim.technical_key.as_str(), technical_key));
        self.set_values(StatementSlot::DimensionDup, &row)?;
        self.insert_row(StatementSlot::DimensionDup, false)
    }

    /// Overwrite `columns` in every version of the entry with natural key
    /// `keys`.
    pub fn dim_punch_through(
        &mut self,
        dim: &DimensionTable,
        columns: &[&str],
        values: &Row,
        keys: &Row,
    ) -> Result<(), DatabaseError> {
        let mut sql = format!("UPDATE {}\nSET ", self.profile.quote_field(&dim.table));
        for (i, column) in columns.iter().enumerate() {
            sql.push_str(if i == 0 { "  " } else { ", " });
            sql.push_str(&format!("{} = ?\n", self.profile.quote_field(column)));
        }
        for (i, key) in self.quoted(&dim.keys).iter().enumerate() {
            sql.push_str(if i == 0 { "WHERE " } else { "AND   " });
            sql.push_str(&format!("{} = ?\n", key));
        }
        self.ensure_prepared(StatementSlot::DimensionPunch, &sql, false)?;

        let mut row = values.clone();
        append(&mut row, keys);
        self.set_values(StatementSlot::DimensionPunch, &row)?;
        self.insert_row(StatementSlot::DimensionPunch, false)
    }

    /// Prepare the lookup of a dimension entry valid at a date: its
    /// technical key, version and `extra` columns.
    pub fn set_dim_lookup(&mut self, dim: &DimensionTable, extra: &[ReturnColumn]) -> Result<(), DatabaseError> {
        let mut sql = format!(
            "SELECT {}, {}",
            self.profile.quote_field(&dim.technical_key),
            self.profile.quote_field(&dim.version)
        );
        for column in extra {
            sql.push_str(", ");
            sql.push_str(&self.profile.quote_field(&column.column));
            if let Some(rename) = column.rename.as_deref().filter(|r| !r.is_empty()) {
                sql.push_str(" AS ");
                sql.push_str(&self.profile.quote_field(rename));
            }
        }
        let keys: Vec<String> = self
            .quoted(&dim.keys)
            .into_iter()
            .map(|k| format!("{} = ? ", k))
            .collect();
        sql.push_str(&format!(
            " FROM {} WHERE {} AND ? >= {} AND ? < {}",
            self.profile.quote_field(&dim.table),
            keys.join(" AND "),
            self.profile.quote_field(&dim.date_from),
            self.profile.quote_field(&dim.date_to)
        ));
        self.prepare_slot(StatementSlot::Lookup, &sql, false)?;
        let dialect = self.dialect();
        slot_mut(&mut self.slots, StatementSlot::Lookup, dialect)?
            .statement
            .set_max_rows(1);
        Ok(())
    }

    /// Entry with natural key `keys` valid at `date`, now when `None`.
    pub fn dim_lookup(&mut self, keys: &Row, date: Option<NaiveDateTime>) -> Result<Option<Row>, DatabaseError> {
        let date = date.unwrap_or_else(|| Local::now().naive_local());
        let mut row = keys.clone();
        row.push(Value::from_date("date", date));
        row.push(Value::from_date("date", date));
        self.set_values(StatementSlot::Lookup, &row)?;
        self.get_lookup(false)
    }

    pub fn combi_insert_statement(&self, combi: &CombinationTable) -> String {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        if let Some((column, value)) = self.key_column(&combi.technical_key, combi.autoinc) {
            columns.push(column);
            values.push(value);
        }
        if let Some(crc) = &combi.crc_field {
            columns.push(self.profile.quote_field(crc));
            values.push("?");
        }
        for column in self.quoted(&combi.keys) {
            columns.push(column);
            values.push("?");
        }
        format!(
            "INSERT INTO {}( {}) VALUES ({})",
            self.profile.quote_field(&combi.table),
            columns.join(", "),
            values.join(", ")
        )
    }

    /// Insert a new key combination. Returns its technical key, generated by
    /// the database when the table is autoincremented.
    pub fn combi_insert(
        &mut self,
        combi: &CombinationTable,
        keys: &Row,
        technical_key: Option<i64>,
        crc: Option<i64>,
    ) -> Result<i64, DatabaseError> {
        let sql = self.combi_insert_statement(combi);
        self.ensure_prepared(StatementSlot::Insert, &sql, combi.autoinc)?;

        let mut row = Row::with_capacity(keys.len() + 2);
        if !combi.autoinc {
            let key = technical_key.ok_or_else(|| {
                DatabaseError::configuration(format!(
                    "No technical key given for '{}' and it is not generated",
                    combi.table
                ))
            })?;
            row.push(Value::from_integer(combi.technical_key.as_str(), key));
        }
        if let Some(column) = &combi.crc_field {
            let crc = crc.unwrap_or_else(|| natural_key_crc(keys));
            row.push(Value::from_integer(column.as_str(), crc));
        }
        append(&mut row, keys);

        self.set_values(StatementSlot::Insert, &row)?;
        self.insert_row(StatementSlot::Insert, false)?;
        match technical_key {
            Some(key) if !combi.autoinc => Ok(key),
            _ => self.generated_key(StatementSlot::Insert, &combi.table),
        }
    }

    /// Prepare the lookup of a key combination. Null keys match null
    /// columns.
    pub fn set_combi_lookup(&mut self, combi: &CombinationTable) -> Result<(), DatabaseError> {
        let mut sql = format!(
            "SELECT {}\nFROM {}\nWHERE ",
            self.profile.quote_field(&combi.technical_key),
            self.profile.quote_field(&combi.table)
        );
        let mut first = true;
        if let Some(crc) = &combi.crc_field {
            sql.push_str(&format!("{} = ? \n", self.profile.quote_field(crc)));
            first = false;
        }
        for key in self.quoted(&combi.keys) {
            if !first {
                sql.push_str(" AND ");
            }
            sql.push_str(&format!("( ( {0} = ? ) OR ( {0} IS NULL AND ? IS NULL ) )\n", key));
            first = false;
        }
        self.prepare_slot(StatementSlot::Lookup, &sql, false)?;
        let dialect = self.dialect();
        slot_mut(&mut self.slots, StatementSlot::Lookup, dialect)?
            .statement
            .set_max_rows(1);
        Ok(())
    }

    /// Technical key of the combination `keys`, if it is known.
    pub fn combi_lookup(
        &mut self,
        combi: &CombinationTable,
        keys: &Row,
        crc: Option<i64>,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut row = Row::with_capacity(keys.len() * 2 + 1);
        if let Some(column) = &combi.crc_field {
            let crc = crc.unwrap_or_else(|| natural_key_crc(keys));
            row.push(Value::from_integer(column.as_str(), crc));
        }
        for key in keys.iter() {
            row.push(key.clone());
            row.push(key.clone());
        }
        self.set_values(StatementSlot::Lookup, &row)?;
        Ok(self
            .get_lookup(false)?
            .and_then(|found| found.get(0).filter(|v| !v.is_null()).map(Value::as_integer)))
    }

    /// Make sure the dimension holds the "unknown" row that facts without a
    /// matching entry point to.
    pub fn check_dim_zero(&mut self, dim: &DimensionTable, use_autoinc: bool) -> Result<(), DatabaseError> {
        let table = self.profile.quote_field(&dim.table);
        let technical_key = self.profile.quote_field(&dim.technical_key);
        let version = self.profile.quote_field(&dim.version);
        let start_tk = self.profile.not_found_tk(use_autoinc);

        let sql = format!(
            "SELECT count(*) FROM {} WHERE {} = {}",
            table, technical_key, start_tk
        );
        let count = self
            .get_one_row(&sql)?
            .and_then(|row| row.get(0).map(Value::as_integer))
            .unwrap_or(0);
        if count > 0 {
            return Ok(());
        }

        let insert = if !self.profile.supports_autoinc() || !use_autoinc {
            format!("insert into {}({}, {}) values (0, 1)", table, technical_key, version)
        } else {
            match self.profile.database_type() {
                DatabaseType::Informix | DatabaseType::MySql => {
                    format!("insert into {}({}, {}) values (1, 1)", table, technical_key, version)
                }
                DatabaseType::MsSql
                | DatabaseType::Db2
                | DatabaseType::DBase
                | DatabaseType::Generic
                | DatabaseType::Sybase
                | DatabaseType::Access => format!("insert into {}({}) values (1)", table, version),
                _ => format!("insert into {}({}, {}) values (0, 1)", table, technical_key, version),
            }
        };
        self.exec_statement(&insert, None)?;
        if !self.is_auto_commit() {
            self.commit()?;
        }
        info!(connection = %self.profile.name(), table = %dim.table, "Inserted the unknown dimension row");
        Ok(())
    }

    /// Next value of `table.column` from the shared key counters. The first
    /// request for a pair reads its current maximum.
    pub fn next_counter_value(&mut self, table: &str, column: &str) -> Result<i64, DatabaseError> {
        let counters = Arc::clone(&self.counters);
        counters.next_value(table, column, || {
            let sql = format!(
                "SELECT MAX({}) FROM {}",
                self.profile.quote_field(column),
                self.profile.quote_field(table)
            );
            Ok(self
                .get_one_row(&sql)?
                .and_then(|row| row.get(0).filter(|v| !v.is_null()).map(Value::as_integer))
                .unwrap_or(0))
        })
    }
}
