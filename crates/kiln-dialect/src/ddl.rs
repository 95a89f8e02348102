//! Column and table DDL.

use crate::database_type::DatabaseType;
use crate::profile::DialectProfile;
use kiln_value::{Row, Value, ValueKind, CLOB_LENGTH};

/// How a numeric column should be declared, derived from a value's
/// declared length and precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericShape {
    /// Whole numbers with this many digits.
    Integer(i32),
    /// Fixed point with length digits, precision of them after the point.
    Fixed { length: i32, precision: i32 },
    /// Double precision floating point.
    Floating,
    /// No declared size: arbitrary precision.
    Arbitrary,
}

fn numeric_shape(v: &Value) -> NumericShape {
    let (length, precision) = (v.length(), v.precision());
    match v.kind() {
        ValueKind::Integer if length > 0 => NumericShape::Integer(length),
        ValueKind::Integer => NumericShape::Integer(18),
        _ if length > 0 && precision == 0 => NumericShape::Integer(length),
        _ if length > 0 && precision > 0 => NumericShape::Fixed { length, precision },
        ValueKind::BigNumber if length > 0 => NumericShape::Fixed {
            length,
            precision: 0,
        },
        ValueKind::BigNumber => NumericShape::Arbitrary,
        _ => NumericShape::Floating,
    }
}

/// Integer type tiers shared by most families: (small, regular, big).
fn integer_tier(digits: i32, small: &str, regular: &str, big: &str, wide: String) -> String {
    if digits > 18 {
        wide
    } else if digits > 9 {
        big.to_string()
    } else if digits < 5 {
        small.to_string()
    } else {
        regular.to_string()
    }
}

impl DialectProfile {
    fn is_key(&self, name: &str, tk: Option<&str>, pk: Option<&str>) -> bool {
        tk.is_some_and(|tk| tk.eq_ignore_ascii_case(name))
            || pk.is_some_and(|pk| pk.eq_ignore_ascii_case(name))
    }

    fn key_type(&self, autoinc: bool) -> &'static str {
        match (self.database_type(), autoinc) {
            (DatabaseType::MySql, true) => "BIGINT AUTO_INCREMENT NOT NULL PRIMARY KEY",
            (DatabaseType::MySql, false) => "BIGINT NOT NULL PRIMARY KEY",
            (DatabaseType::PostgreSql, true) => "BIGSERIAL",
            (DatabaseType::PostgreSql, false) => "BIGINT NOT NULL PRIMARY KEY",
            (DatabaseType::MsSql, true) => "BIGINT PRIMARY KEY IDENTITY(0,1)",
            (DatabaseType::MsSql, false) => "BIGINT PRIMARY KEY",
            (DatabaseType::Sybase, true) => "NUMERIC(9,0) IDENTITY",
            (DatabaseType::Sybase, false) => "INTEGER NOT NULL PRIMARY KEY",
            (DatabaseType::Db2 | DatabaseType::As400, true) => {
                "BIGINT NOT NULL PRIMARY KEY GENERATED ALWAYS AS IDENTITY (START WITH 0, INCREMENT BY 1)"
            }
            (DatabaseType::Informix, true) => "SERIAL8",
            (DatabaseType::Informix, false) => "INTEGER PRIMARY KEY",
            (DatabaseType::H2, true) => "IDENTITY",
            (DatabaseType::Hypersonic, true) => {
                "BIGINT GENERATED BY DEFAULT AS IDENTITY (START WITH 0, INCREMENT BY 1) PRIMARY KEY"
            }
            (DatabaseType::H2 | DatabaseType::Hypersonic | DatabaseType::DuckDb, _) => {
                "BIGINT PRIMARY KEY"
            }
            (DatabaseType::Access, true) => "COUNTER PRIMARY KEY",
            (DatabaseType::Access, false) => "LONG PRIMARY KEY",
            (DatabaseType::Ingres, true) => {
                "INTEGER8 GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"
            }
            (DatabaseType::Ingres, false) => "INTEGER8 NOT NULL PRIMARY KEY",
            // Primary key constraints are added by CREATE TABLE on these.
            (DatabaseType::Oracle, _) => "NUMBER(15) NOT NULL",
            (DatabaseType::Cache, _) => "INT NOT NULL",
            (DatabaseType::Gupta, _) => "INTEGER NOT NULL",
            (DatabaseType::Interbase | DatabaseType::SapDb, _) => "INTEGER NOT NULL PRIMARY KEY",
            (DatabaseType::DBase, _) => "INTEGER",
            _ => "BIGINT NOT NULL PRIMARY KEY",
        }
    }

    fn numeric_type(&self, shape: NumericShape) -> String {
        use DatabaseType as T;
        let db = self.database_type();
        match shape {
            NumericShape::Integer(d) => match db {
                T::Oracle => format!("NUMBER({})", d),
                T::SapDb => format!("FIXED({})", d),
                T::DBase => format!("NUMERIC({}, 0)", d),
                T::Access => if d > 9 { "DOUBLE" } else { "LONG" }.to_string(),
                T::MySql => integer_tier(d, "INT", "INT", "BIGINT", format!("DECIMAL({})", d)),
                T::MsSql | T::Sybase => {
                    integer_tier(d, "INT", "INT", "BIGINT", format!("DECIMAL({},0)", d))
                }
                T::Informix => {
                    integer_tier(d, "INTEGER", "INTEGER", "INT8", format!("DECIMAL({})", d))
                }
                T::Db2 | T::As400 => {
                    integer_tier(d, "INTEGER", "INTEGER", "BIGINT", format!("DECIMAL({})", d))
                }
                T::Firebird => integer_tier(
                    d,
                    "INTEGER",
                    "INTEGER",
                    "BIGINT",
                    "NUMERIC(18, 0)".to_string(),
                ),
                T::Interbase => integer_tier(
                    d,
                    "INTEGER",
                    "INTEGER",
                    "NUMERIC(18, 0)",
                    "NUMERIC(18, 0)".to_string(),
                ),
                T::Ingres => {
                    integer_tier(d, "INTEGER2", "INTEGER4", "INTEGER8", format!("DECIMAL({})", d))
                }
                T::PostgreSql | T::Generic => {
                    integer_tier(d, "SMALLINT", "INTEGER", "BIGINT", format!("NUMERIC({}, 0)", d))
                }
                T::DuckDb => integer_tier(
                    d,
                    "SMALLINT",
                    "INTEGER",
                    "BIGINT",
                    format!("DECIMAL({}, 0)", d.min(38)),
                ),
                _ => integer_tier(d, "SMALLINT", "INTEGER", "BIGINT", format!("DECIMAL({}, 0)", d)),
            },
            NumericShape::Fixed { length, precision } => match db {
                T::Oracle => format!("NUMBER({}, {})", length, precision),
                T::SapDb => format!("FIXED({}, {})", length, precision),
                T::Access => "DOUBLE".to_string(),
                T::Firebird | T::Interbase => {
                    format!("NUMERIC({}, {})", length.min(18), precision.min(18))
                }
                T::PostgreSql | T::Generic | T::DBase => {
                    format!("NUMERIC({}, {})", length, precision)
                }
                T::DuckDb => format!("DECIMAL({}, {})", length.min(38), precision.min(38)),
                _ => format!("DECIMAL({}, {})", length, precision),
            },
            NumericShape::Arbitrary => match db {
                T::Oracle => "NUMBER".to_string(),
                T::PostgreSql | T::Generic => "NUMERIC".to_string(),
                T::MySql => "DECIMAL(65, 30)".to_string(),
                T::MsSql | T::Sybase | T::DuckDb => "DECIMAL(38, 10)".to_string(),
                T::Db2 | T::As400 => "DECIMAL(31, 10)".to_string(),
                _ => self.numeric_type(NumericShape::Floating),
            },
            NumericShape::Floating => match db {
                T::Oracle => "NUMBER",
                T::MySql | T::H2 | T::Hypersonic | T::DuckDb | T::Access | T::DBase | T::Cache => {
                    "DOUBLE"
                }
                T::MsSql => "FLOAT(53)",
                T::Db2 | T::As400 | T::Informix => "FLOAT",
                T::Ingres => "FLOAT8",
                T::SapDb => "FLOAT(38)",
                _ => "DOUBLE PRECISION",
            }
            .to_string(),
        }
    }

    fn string_type(&self, length: i32) -> String {
        use DatabaseType as T;
        let clob = length >= CLOB_LENGTH;
        let unbounded = clob || length <= 0;
        match self.database_type() {
            T::MySql => {
                if unbounded {
                    if clob { "LONGTEXT" } else { "TEXT" }.to_string()
                } else if length < 256 {
                    format!("VARCHAR({})", length)
                } else if length < 65_536 {
                    "TEXT".to_string()
                } else if length < 16_777_216 {
                    "MEDIUMTEXT".to_string()
                } else {
                    "LONGTEXT".to_string()
                }
            }
            T::Oracle => {
                if unbounded || length > 4000 {
                    "CLOB".to_string()
                } else {
                    format!("VARCHAR2({})", length)
                }
            }
            T::PostgreSql | T::Generic | T::SapR3 => {
                if unbounded {
                    "TEXT".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::DuckDb => {
                if unbounded {
                    "VARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::MsSql | T::Sybase => {
                if unbounded || length > 8000 {
                    "TEXT".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Db2 | T::As400 => {
                if unbounded || length > 32_672 {
                    "CLOB".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Informix => {
                if clob {
                    "TEXT".to_string()
                } else if unbounded || length > 255 {
                    "LVARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Access => {
                if unbounded || length > 255 {
                    "MEMO".to_string()
                } else {
                    format!("TEXT({})", length)
                }
            }
            T::DBase => {
                if unbounded || length > 254 {
                    "MEMO".to_string()
                } else {
                    format!("CHAR({})", length)
                }
            }
            T::Firebird | T::Interbase => {
                if unbounded || length > 32_720 {
                    "BLOB SUB_TYPE TEXT".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::H2 => {
                if clob {
                    "CLOB".to_string()
                } else if unbounded {
                    "VARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Hypersonic | T::Cache => {
                if unbounded {
                    "LONGVARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Gupta => {
                if unbounded || length > 254 {
                    "LONG VARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::SapDb => {
                if unbounded || length > 8000 {
                    "LONG".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            T::Ingres => {
                if unbounded || length > 32_000 {
                    "LONG VARCHAR".to_string()
                } else {
                    format!("VARCHAR({})", length)
                }
            }
        }
    }

    fn date_type(&self) -> &'static str {
        match self.database_type() {
            DatabaseType::MySql
            | DatabaseType::MsSql
            | DatabaseType::Sybase
            | DatabaseType::Access => "DATETIME",
            DatabaseType::Oracle | DatabaseType::DBase | DatabaseType::Ingres => "DATE",
            DatabaseType::Informix => "DATETIME YEAR TO FRACTION",
            _ => "TIMESTAMP",
        }
    }

    fn binary_type(&self) -> &'static str {
        match self.database_type() {
            DatabaseType::MySql => "LONGBLOB",
            DatabaseType::PostgreSql => "BYTEA",
            DatabaseType::MsSql | DatabaseType::Sybase => "IMAGE",
            DatabaseType::Informix => "BYTE",
            DatabaseType::Access => "LONGBINARY",
            DatabaseType::DBase => "MEMO",
            DatabaseType::Hypersonic | DatabaseType::Cache => "LONGVARBINARY",
            DatabaseType::Gupta => "LONG BINARY",
            DatabaseType::SapDb | DatabaseType::Ingres => "LONG BYTE",
            _ => "BLOB",
        }
    }

    /// Column type for a value, ignoring its name.
    fn column_type(
        &self,
        v: &Value,
        tk: Option<&str>,
        pk: Option<&str>,
        use_autoinc: bool,
    ) -> String {
        match v.kind() {
            ValueKind::Integer | ValueKind::Number | ValueKind::BigNumber => {
                if self.is_key(v.name(), tk, pk) {
                    self.key_type(use_autoinc && self.supports_autoinc())
                        .to_string()
                } else {
                    self.numeric_type(numeric_shape(v))
                }
            }
            ValueKind::String => self.string_type(v.length()),
            ValueKind::Date => self.date_type().to_string(),
            ValueKind::Boolean => {
                if self.supports_boolean_data_type() {
                    "BOOLEAN".to_string()
                } else {
                    "CHAR(1)".to_string()
                }
            }
            ValueKind::Binary => self.binary_type().to_string(),
            ValueKind::None => "UNKNOWN".to_string(),
        }
    }

    /// Column DDL fragment for `v`.
    ///
    /// A value named like the technical key `tk` or the primary key `pk` is
    /// declared as a key column, with identity/serial semantics when
    /// `use_autoinc` is requested and the family supports it.
    pub fn field_definition(
        &self,
        v: &Value,
        tk: Option<&str>,
        pk: Option<&str>,
        use_autoinc: bool,
        add_fieldname: bool,
    ) -> String {
        let column_type = self.column_type(v, tk, pk, use_autoinc);
        if add_fieldname {
            format!("{} {}", self.quote_field(v.name()), column_type)
        } else {
            column_type
        }
    }

    pub fn add_column_statement(
        &self,
        table: &str,
        v: &Value,
        tk: Option<&str>,
        use_autoinc: bool,
        pk: Option<&str>,
        semicolon: bool,
    ) -> String {
        use DatabaseType as T;
        let table = self.quote_field(table);
        let def = self.field_definition(v, tk, pk, use_autoinc, true);
        let sql = match self.database_type() {
            T::Oracle => format!("ALTER TABLE {} ADD ( {} )", table, def),
            T::MySql
            | T::MsSql
            | T::Sybase
            | T::Informix
            | T::Firebird
            | T::Interbase
            | T::Cache
            | T::Gupta
            | T::SapDb => format!("ALTER TABLE {} ADD {}", table, def),
            _ => format!("ALTER TABLE {} ADD COLUMN {}", table, def),
        };
        terminate(sql, semicolon)
    }

    pub fn drop_column_statement(&self, table: &str, v: &Value, semicolon: bool) -> String {
        use DatabaseType as T;
        let table = self.quote_field(table);
        let column = self.quote_field(v.name());
        let sql = match self.database_type() {
            T::MySql | T::Informix | T::Firebird | T::Interbase => {
                format!("ALTER TABLE {} DROP {}", table, column)
            }
            _ => format!("ALTER TABLE {} DROP COLUMN {}", table, column),
        };
        terminate(sql, semicolon)
    }

    pub fn modify_column_statement(
        &self,
        table: &str,
        v: &Value,
        tk: Option<&str>,
        use_autoinc: bool,
        pk: Option<&str>,
        semicolon: bool,
    ) -> String {
        use DatabaseType as T;
        let table = self.quote_field(table);
        let column = self.quote_field(v.name());
        let def = self.field_definition(v, tk, pk, use_autoinc, true);
        let column_type = self.column_type(v, tk, pk, use_autoinc);
        let sql = match self.database_type() {
            T::Oracle => format!("ALTER TABLE {} MODIFY ( {} )", table, def),
            T::MySql | T::Informix | T::Sybase => format!("ALTER TABLE {} MODIFY {}", table, def),
            T::Db2 | T::As400 => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
                table, column, column_type
            ),
            T::DuckDb => format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table, column, column_type
            ),
            T::Firebird | T::Interbase => {
                format!("ALTER TABLE {} ALTER {} TYPE {}", table, column, column_type)
            }
            T::PostgreSql => {
                // Copy through a temporary column so existing data survives the type change.
                let tmp = format!("{}_KTL", v.name());
                [
                    format!("ALTER TABLE {} ADD COLUMN {} {}", table, tmp, column_type),
                    format!("UPDATE {} SET {}={}", table, tmp, column),
                    format!("ALTER TABLE {} DROP COLUMN {}", table, column),
                    format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, tmp, column),
                ]
                .join(";\n")
            }
            _ => format!("ALTER TABLE {} ALTER COLUMN {}", table, def),
        };
        terminate(sql, semicolon)
    }

    /// CREATE TABLE for `fields`, in field order.
    pub fn create_table_statement(
        &self,
        table: &str,
        fields: &Row,
        tk: Option<&str>,
        use_autoinc: bool,
        pk: Option<&str>,
        semicolon: bool,
    ) -> String {
        let mut sql = format!("CREATE TABLE {}\n(\n", self.quote_field(table));
        for (i, v) in fields.iter().enumerate() {
            sql.push_str(if i > 0 { ", " } else { "  " });
            sql.push_str(&self.field_definition(v, tk, pk, use_autoinc, true));
            sql.push('\n');
        }

        match (self.database_type(), tk, pk) {
            (DatabaseType::Cache, Some(tk), _) => {
                sql.push_str(&format!(", PRIMARY KEY ({})\n", self.quote_field(tk)));
            }
            (DatabaseType::Oracle, _, Some(pk)) => {
                sql.push_str(&format!(", PRIMARY KEY ({})\n", self.quote_field(pk)));
            }
            _ => {}
        }
        sql.push(')');

        if self.database_type() == DatabaseType::Oracle {
            if let Some(ts) = self.data_tablespace().filter(|ts| !ts.is_empty()) {
                sql.push_str(&format!("\nTABLESPACE {}", ts));
            }
        }
        terminate(sql, semicolon)
    }

    /// Statements turning a table with columns `current` into one with
    /// columns `desired`: add what is missing, drop what is surplus, and
    /// modify columns that grew or changed between numeric and non-numeric.
    /// Empty when nothing differs.
    #[allow(clippy::too_many_arguments)]
    pub fn alter_table_statement(
        &self,
        table: &str,
        desired: &Row,
        current: &Row,
        tk: Option<&str>,
        use_autoinc: bool,
        pk: Option<&str>,
        semicolon: bool,
    ) -> String {
        let mut statements = Vec::new();

        for v in desired.iter() {
            if current.search_value(v.name()).is_none() {
                statements.push(self.add_column_statement(table, v, tk, use_autoinc, pk, semicolon));
            }
        }

        for v in current.iter() {
            if desired.search_value(v.name()).is_none() {
                statements.push(self.drop_column_statement(table, v, semicolon));
            }
        }

        for wanted in desired.iter() {
            let Some(existing) = current.search_value(wanted.name()) else {
                continue;
            };
            let grown = (existing.length() < wanted.length() && wanted.length() > 0)
                || (existing.precision() < wanted.precision() && wanted.precision() > 0);
            let numeric_changed = existing.kind() != wanted.kind()
                && existing.is_numeric() != wanted.is_numeric();
            if grown || numeric_changed {
                statements.push(self.modify_column_statement(
                    table,
                    wanted,
                    tk,
                    use_autoinc,
                    pk,
                    semicolon,
                ));
            }
        }

        statements.join("\n")
    }
}

fn terminate(mut sql: String, semicolon: bool) -> String {
    if semicolon {
        sql.push(';');
    }
    sql
}
