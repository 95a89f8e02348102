//! Statement shapes that vary per family: limits, locks, sequences,
//! indexes and probes.

use crate::database_type::DatabaseType;
use crate::profile::DialectProfile;
use chrono::{NaiveDate, NaiveDateTime};

/// How a family locks or unlocks tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatement {
    /// Run this SQL.
    Sql(String),
    /// Nothing to run; locks are released when the transaction ends.
    ImplicitOnCommit,
    /// The family has no table locking.
    Unsupported,
}

impl DialectProfile {
    /// Schema-qualified table reference. An empty schema yields the bare table.
    pub fn schema_table_combination(&self, schema: &str, table: &str) -> String {
        if schema.is_empty() || !self.supports_schemas() {
            table.to_string()
        } else {
            format!("{}.{}", schema, table)
        }
    }

    pub fn truncate_table_statement(&self, table: &str) -> String {
        match self.database_type() {
            DatabaseType::Access
            | DatabaseType::DBase
            | DatabaseType::Firebird
            | DatabaseType::Interbase
            | DatabaseType::Informix => format!("DELETE FROM {}", self.quote_field(table)),
            _ => format!("TRUNCATE TABLE {}", self.quote_field(table)),
        }
    }

    /// Query returning no rows whose result describes the table's columns.
    pub fn sql_query_fields(&self, table: &str) -> String {
        let table = self.quote_field(table);
        match self.database_type() {
            DatabaseType::MySql
            | DatabaseType::PostgreSql
            | DatabaseType::H2
            | DatabaseType::Hypersonic
            | DatabaseType::DuckDb => format!("SELECT * FROM {} LIMIT 0", table),
            DatabaseType::Oracle
            | DatabaseType::Db2
            | DatabaseType::As400
            | DatabaseType::MsSql
            | DatabaseType::Sybase
            | DatabaseType::Informix => format!("SELECT * FROM {} WHERE 1=0", table),
            _ => format!("SELECT * FROM {}", table),
        }
    }

    /// Probe that fails when the table does not exist.
    pub fn sql_table_exists(&self, table: &str) -> String {
        format!("SELECT 1 FROM {} WHERE 1=0", self.quote_field(table))
    }

    /// Clause appended to a query to limit it to `rows` rows. Empty when the
    /// family cannot limit by appending.
    pub fn limit_clause(&self, rows: usize) -> String {
        match self.database_type() {
            DatabaseType::Oracle => format!(" WHERE ROWNUM <= {}", rows),
            DatabaseType::MySql
            | DatabaseType::PostgreSql
            | DatabaseType::H2
            | DatabaseType::Hypersonic
            | DatabaseType::DuckDb
            | DatabaseType::Generic => format!(" LIMIT {}", rows),
            DatabaseType::Db2 | DatabaseType::As400 => {
                format!(" FETCH FIRST {} ROWS ONLY", rows)
            }
            _ => String::new(),
        }
    }

    pub fn sql_lock_tables(&self, tables: &[&str]) -> LockStatement {
        let quoted: Vec<String> = tables.iter().map(|t| self.quote_field(t)).collect();
        match self.database_type() {
            DatabaseType::MySql => LockStatement::Sql(format!(
                "LOCK TABLES {};",
                quoted
                    .iter()
                    .map(|t| format!("{} WRITE", t))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            DatabaseType::PostgreSql => LockStatement::Sql(format!(
                "LOCK TABLE {} IN ACCESS EXCLUSIVE MODE;",
                quoted.join(", ")
            )),
            DatabaseType::Oracle
            | DatabaseType::Db2
            | DatabaseType::As400
            | DatabaseType::Informix => LockStatement::Sql(
                quoted
                    .iter()
                    .map(|t| format!("LOCK TABLE {} IN EXCLUSIVE MODE;", t))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            DatabaseType::MsSql | DatabaseType::Sybase => LockStatement::Sql(
                quoted
                    .iter()
                    .map(|t| format!("SELECT top 0 * FROM {} WITH (UPDLOCK, HOLDLOCK);", t))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => LockStatement::Unsupported,
        }
    }

    pub fn sql_unlock_tables(&self, tables: &[&str]) -> LockStatement {
        match self.database_type() {
            DatabaseType::MySql => LockStatement::Sql("UNLOCK TABLES".to_string()),
            DatabaseType::Informix => LockStatement::Sql(
                tables
                    .iter()
                    .map(|t| format!("UNLOCK TABLE {};", self.quote_field(t)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            DatabaseType::PostgreSql
            | DatabaseType::Oracle
            | DatabaseType::Db2
            | DatabaseType::As400
            | DatabaseType::MsSql
            | DatabaseType::Sybase => LockStatement::ImplicitOnCommit,
            _ => LockStatement::Unsupported,
        }
    }

    /// Query returning the next value of a sequence, if the family has sequences.
    pub fn sql_next_sequence_value(&self, sequence: &str) -> Option<String> {
        if !self.supports_sequences() {
            return None;
        }
        let seq = self.quote_field(sequence);
        let sql = match self.database_type() {
            DatabaseType::Oracle | DatabaseType::SapDb => {
                format!("SELECT {}.nextval FROM dual", seq)
            }
            DatabaseType::PostgreSql | DatabaseType::DuckDb => {
                format!("SELECT nextval('{}')", sequence)
            }
            DatabaseType::Db2 | DatabaseType::As400 => {
                format!("SELECT NEXT VALUE FOR {} FROM SYSIBM.SYSDUMMY1", seq)
            }
            DatabaseType::Firebird | DatabaseType::Interbase => {
                format!("SELECT GEN_ID({}, 1) FROM RDB$DATABASE", seq)
            }
            DatabaseType::Ingres => format!("SELECT {}.nextval", seq),
            _ => format!("SELECT NEXT VALUE FOR {}", seq),
        };
        Some(sql)
    }

    /// Query returning the current value of a sequence.
    pub fn sql_current_sequence_value(&self, sequence: &str) -> Option<String> {
        if !self.supports_sequences() {
            return None;
        }
        let seq = self.quote_field(sequence);
        let sql = match self.database_type() {
            DatabaseType::Oracle | DatabaseType::SapDb => {
                format!("SELECT {}.currval FROM dual", seq)
            }
            DatabaseType::PostgreSql | DatabaseType::DuckDb => {
                format!("SELECT currval('{}')", sequence)
            }
            DatabaseType::Db2 | DatabaseType::As400 => {
                format!("SELECT PREVIOUS VALUE FOR {} FROM SYSIBM.SYSDUMMY1", seq)
            }
            DatabaseType::Firebird | DatabaseType::Interbase => {
                format!("SELECT GEN_ID({}, 0) FROM RDB$DATABASE", seq)
            }
            DatabaseType::Ingres => format!("SELECT {}.currval", seq),
            _ => format!("SELECT CURRENT VALUE FOR {}", seq),
        };
        Some(sql)
    }

    /// Query returning a row when the sequence exists.
    pub fn sql_sequence_exists(&self, sequence: &str) -> Option<String> {
        if !self.supports_sequences() {
            return None;
        }
        let upper = sequence.to_uppercase();
        let lower = sequence.to_lowercase();
        let sql = match self.database_type() {
            DatabaseType::Oracle => format!(
                "SELECT * FROM USER_SEQUENCES WHERE SEQUENCE_NAME = '{}'",
                upper
            ),
            DatabaseType::SapDb => format!(
                "SELECT SEQUENCE_NAME FROM DOMAIN.SEQUENCES WHERE SEQUENCE_NAME = '{}'",
                upper
            ),
            DatabaseType::PostgreSql => format!(
                "SELECT relname AS sequence_name FROM pg_class WHERE relkind = 'S' AND relname = '{}'",
                lower
            ),
            DatabaseType::DuckDb => format!(
                "SELECT sequence_name FROM duckdb_sequences() WHERE lower(sequence_name) = '{}'",
                lower
            ),
            DatabaseType::Db2 | DatabaseType::As400 => {
                format!("SELECT * FROM SYSCAT.SEQUENCES WHERE SEQNAME = '{}'", upper)
            }
            DatabaseType::Firebird | DatabaseType::Interbase => format!(
                "SELECT RDB$GENERATOR_NAME FROM RDB$GENERATORS WHERE RDB$GENERATOR_NAME = '{}'",
                upper
            ),
            DatabaseType::Ingres => format!(
                "SELECT seq_name FROM iisequences WHERE seq_name = '{}'",
                lower
            ),
            _ => format!(
                "SELECT * FROM INFORMATION_SCHEMA.SEQUENCES WHERE SEQUENCE_NAME = '{}'",
                upper
            ),
        };
        Some(sql)
    }

    /// CREATE SEQUENCE statement. A `max_value` of 0 or less leaves it unbounded.
    pub fn create_sequence_statement(
        &self,
        sequence: &str,
        start_at: i64,
        increment_by: i64,
        max_value: i64,
        semicolon: bool,
    ) -> Option<String> {
        if sequence.is_empty() || !self.supports_sequences() {
            return None;
        }
        let mut sql = format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {}",
            self.quote_field(sequence),
            start_at,
            increment_by
        );
        if max_value > 0 {
            sql.push_str(&format!(" MAXVALUE {}", max_value));
        }
        if semicolon {
            sql.push(';');
        }
        Some(sql)
    }

    /// CREATE INDEX statement. Technical-key indexes are unique on Sybase;
    /// BITMAP is only emitted where supported.
    pub fn create_index_statement(
        &self,
        table: &str,
        index: &str,
        fields: &[&str],
        tk: bool,
        unique: bool,
        bitmap: bool,
        semicolon: bool,
    ) -> String {
        let mut sql = String::from("CREATE ");
        if unique || (tk && self.database_type() == DatabaseType::Sybase) {
            sql.push_str("UNIQUE ");
        }
        if bitmap && self.supports_bitmap_index() {
            sql.push_str("BITMAP ");
        }
        sql.push_str(&format!(
            "INDEX {}\nON {}\n(\n",
            self.quote_field(index),
            self.quote_field(table)
        ));
        for (i, field) in fields.iter().enumerate() {
            sql.push_str(if i > 0 { ", " } else { "  " });
            sql.push_str(&self.quote_field(field));
            sql.push('\n');
        }
        sql.push(')');

        if self.database_type() == DatabaseType::Oracle {
            if let Some(ts) = self.index_tablespace().filter(|ts| !ts.is_empty()) {
                sql.push_str(&format!("\nTABLESPACE {}", self.quote_field(ts)));
            }
        }
        if semicolon {
            sql.push(';');
        }
        sql
    }

    /// The "infinite future" closing an open dimension version.
    pub fn open_end_date(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2199, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Lower bound of the first dimension version.
    pub fn min_date(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1900, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN)
    }
}
