//! Keyed lookups, keyed updates and deletes, and stored procedure calls.

use crate::binding::to_param;
use crate::driver::{CallableStatement, DriverResult, ResultSet, SqlType, SqlValue};
use crate::error::DatabaseError;
use crate::materialize::{read_row, row_shape};
use crate::session::{physical, slot_mut, ConnectionSession, StatementSlot};
use kiln_dialect::DialectProfile;
use kiln_value::{Row, Value, ValueKind};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Comparison between a key column and its parameter(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Like,
    Between,
    IsNull,
    IsNotNull,
}

impl Condition {
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Equal => "=",
            Condition::NotEqual => "<>",
            Condition::Less => "<",
            Condition::LessOrEqual => "<=",
            Condition::Greater => ">",
            Condition::GreaterOrEqual => ">=",
            Condition::Like => "LIKE",
            Condition::Between => "BETWEEN",
            Condition::IsNull => "IS NULL",
            Condition::IsNotNull => "IS NOT NULL",
        }
    }

    /// Parameters this condition binds.
    pub fn parameter_count(&self) -> usize {
        match self {
            Condition::Between => 2,
            Condition::IsNull | Condition::IsNotNull => 0,
            _ => 1,
        }
    }

    fn clause(&self, column: &str) -> String {
        match self {
            Condition::Between => format!("{} BETWEEN ? AND ? ", column),
            Condition::IsNull | Condition::IsNotNull => format!("{} {} ", column, self.operator()),
            _ => format!("{} {} ? ", column, self.operator()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

impl FromStr for Condition {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let condition = match s.trim().to_uppercase().as_str() {
            "=" => Condition::Equal,
            "<>" | "!=" => Condition::NotEqual,
            "<" => Condition::Less,
            "<=" => Condition::LessOrEqual,
            ">" => Condition::Greater,
            ">=" => Condition::GreaterOrEqual,
            "LIKE" => Condition::Like,
            "BETWEEN" => Condition::Between,
            "IS NULL" => Condition::IsNull,
            "IS NOT NULL" => Condition::IsNotNull,
            other => {
                return Err(DatabaseError::configuration(format!(
                    "Unknown lookup condition '{}'",
                    other
                )))
            }
        };
        Ok(condition)
    }
}

/// A key column and how it is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    pub column: String,
    pub condition: Condition,
}

impl LookupKey {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    pub fn equal(column: impl Into<String>) -> Self {
        Self::new(column, Condition::Equal)
    }
}

/// A column returned by a lookup, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnColumn {
    pub column: String,
    pub rename: Option<String>,
}

impl ReturnColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            rename: None,
        }
    }

    pub fn renamed(column: impl Into<String>, rename: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            rename: Some(rename.into()),
        }
    }
}

/// Direction of a stored procedure argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

impl ParamDirection {
    fn is_input(self) -> bool {
        matches!(self, ParamDirection::In | ParamDirection::InOut)
    }

    fn is_output(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureArgument {
    pub name: String,
    pub direction: ParamDirection,
    pub kind: ValueKind,
}

impl ProcedureArgument {
    pub fn new(name: impl Into<String>, direction: ParamDirection, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            direction,
            kind,
        }
    }
}

pub(crate) struct PreparedCall {
    pub(crate) sql: String,
    pub(crate) statement: Box<dyn CallableStatement>,
    arguments: Vec<ProcedureArgument>,
    result: Option<(String, ValueKind)>,
}

impl PreparedCall {
    /// Parameter index of argument `i`; the return value takes index 0.
    fn position(&self, i: usize) -> usize {
        i + usize::from(self.result.is_some())
    }
}

/// Type an OUT parameter of `kind` is registered with.
fn out_type(kind: ValueKind) -> Option<SqlType> {
    match kind {
        ValueKind::Number => Some(SqlType::Double),
        ValueKind::BigNumber => Some(SqlType::Decimal),
        ValueKind::Integer => Some(SqlType::Bigint),
        ValueKind::String => Some(SqlType::Varchar),
        ValueKind::Date => Some(SqlType::Timestamp),
        ValueKind::Boolean => Some(SqlType::Boolean),
        ValueKind::Binary | ValueKind::None => None,
    }
}

/// Convert an OUT parameter cell to a value of `kind`.
fn out_value(name: &str, kind: ValueKind, cell: SqlValue) -> Value {
    let source = match cell {
        SqlValue::Null => return Value::new(name, kind),
        SqlValue::Long(n) => Value::from_integer(name, n),
        SqlValue::Double(n) => Value::from_number(name, n),
        SqlValue::Decimal(d) => Value::from_big_number(name, d),
        SqlValue::String(s) => Value::from_string(name, s),
        SqlValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
            Some(d) => Value::from_date(name, d),
            None => return Value::new(name, kind),
        },
        SqlValue::Timestamp(t) => Value::from_date(name, t),
        SqlValue::Boolean(b) => Value::from_boolean(name, b),
        SqlValue::Bytes(b) => Value::from_binary(name, b),
    };
    let mut value = Value::new(name, kind);
    match kind {
        ValueKind::Integer => value.set_integer(source.as_integer()),
        ValueKind::Number => value.set_number(source.as_number()),
        ValueKind::BigNumber => value.set_big_number(source.as_big_number()),
        ValueKind::String | ValueKind::None => value.set_string(source.as_string()),
        ValueKind::Date => {
            if let Some(d) = source.as_date() {
                value.set_date(d);
            }
        }
        ValueKind::Boolean => value.set_boolean(source.as_boolean()),
        ValueKind::Binary => value.set_binary(source.as_binary()),
    }
    value
}

fn where_clause(keys: &[LookupKey], separator: &str) -> String {
    keys.iter()
        .map(|k| k.condition.clause(&k.column))
        .collect::<Vec<_>>()
        .join(separator)
}

impl ConnectionSession {
    /// `SELECT` statement of a keyed lookup.
    pub fn lookup_statement(
        &self,
        table: &str,
        keys: &[LookupKey],
        returns: &[ReturnColumn],
        order_by: Option<&str>,
    ) -> String {
        let columns: Vec<String> = returns
            .iter()
            .map(|r| {
                let column = self.profile.quote_field(&r.column);
                match &r.rename {
                    Some(rename) if !rename.is_empty() => {
                        format!("{} AS {}", column, self.profile.quote_field(rename))
                    }
                    _ => column,
                }
            })
            .collect();
        let keys: Vec<LookupKey> = keys
            .iter()
            .map(|k| LookupKey::new(self.profile.quote_field(&k.column), k.condition))
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            columns.join(", "),
            self.profile.quote_field(table),
            where_clause(&keys, " AND ")
        );
        if let Some(order) = order_by.filter(|o| !o.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        sql
    }

    /// Prepare a keyed lookup into the lookup slot. Unless `check_multiple`
    /// is set the database is asked for one row only.
    pub fn set_lookup(
        &mut self,
        table: &str,
        keys: &[LookupKey],
        returns: &[ReturnColumn],
        order_by: Option<&str>,
        check_multiple: bool,
    ) -> Result<(), DatabaseError> {
        let sql = self.lookup_statement(table, keys, returns, order_by);
        self.prepare_slot(StatementSlot::Lookup, &sql, false)?;
        if !check_multiple {
            let dialect = self.dialect();
            slot_mut(&mut self.slots, StatementSlot::Lookup, dialect)?
                .statement
                .set_max_rows(1);
        }
        Ok(())
    }

    /// Run the lookup with its bound keys. `None` when nothing matches. With
    /// `fail_on_multiple` a second matching row is an error.
    pub fn get_lookup(&mut self, fail_on_multiple: bool) -> Result<Option<Row>, DatabaseError> {
        self.fetch_single(StatementSlot::Lookup, fail_on_multiple)
    }

    /// Run the query in `slot` and read its first row.
    pub(crate) fn fetch_single(
        &mut self,
        slot: StatementSlot,
        fail_on_multiple: bool,
    ) -> Result<Option<Row>, DatabaseError> {
        let dialect = self.dialect();
        let prepared = slot_mut(&mut self.slots, slot, dialect)?;
        let sql = prepared.sql.as_str();
        let mut result = prepared
            .statement
            .execute_query()
            .map_err(|e| DatabaseError::from_driver(dialect, sql, e))?;
        let shape = row_shape(&self.profile, result.columns());

        let outcome = first_row(&self.profile, &shape, &mut *result, fail_on_multiple);
        let closed = result.close();
        let (first, more) = outcome.map_err(|e| {
            if let Err(close) = &closed {
                warn!(connection = %self.profile.name(), error = %close, "Error closing lookup result");
            }
            DatabaseError::from_driver(dialect, sql, e)
        })?;
        closed.map_err(|e| DatabaseError::from_driver(dialect, sql, e))?;
        if more {
            return Err(DatabaseError::execution(
                dialect,
                sql,
                "Only 1 row was expected as a result of a lookup, and at least 2 were found",
            ));
        }
        Ok(first)
    }

    /// Prepare `UPDATE table SET sets... WHERE keys...` into the update slot.
    /// Bind the set values first, then the keys.
    pub fn prepare_update(&mut self, table: &str, keys: &[LookupKey], sets: &[&str]) -> Result<(), DatabaseError> {
        let mut sql = format!("UPDATE {}\nSET ", self.profile.quote_field(table));
        for (i, column) in sets.iter().enumerate() {
            if i > 0 {
                sql.push_str(",   ");
            }
            sql.push_str(&format!("{} = ?\n", self.profile.quote_field(column)));
        }
        sql.push_str("WHERE ");
        sql.push_str(&self.quoted_where(keys));
        self.prepare_slot(StatementSlot::Update, &sql, false)
    }

    /// Prepare `DELETE FROM table WHERE keys...` into the update slot.
    pub fn prepare_delete(&mut self, table: &str, keys: &[LookupKey]) -> Result<(), DatabaseError> {
        let sql = format!(
            "DELETE FROM {}\nWHERE {}",
            self.profile.quote_field(table),
            self.quoted_where(keys)
        );
        self.prepare_slot(StatementSlot::Update, &sql, false)
    }

    fn quoted_where(&self, keys: &[LookupKey]) -> String {
        let keys: Vec<LookupKey> = keys
            .iter()
            .map(|k| LookupKey::new(self.profile.quote_field(&k.column), k.condition))
            .collect();
        where_clause(&keys, "AND   ")
    }

    /// Prepare a stored procedure call. OUT and INOUT arguments, and the
    /// return value when `result` names one, are registered by kind.
    pub fn set_proc_lookup(
        &mut self,
        procedure: &str,
        arguments: &[ProcedureArgument],
        result: Option<(&str, ValueKind)>,
    ) -> Result<(), DatabaseError> {
        if let Some(mut previous) = self.call.take() {
            previous
                .statement
                .close()
                .map_err(|e| DatabaseError::from_driver(self.dialect(), previous.sql, e))?;
        }

        let placeholders = vec!["?"; arguments.len()].join(", ");
        let sql = format!(
            "{{ {}call {} ({})}}",
            if result.is_some() { "? = " } else { "" },
            procedure,
            placeholders
        );
        let dialect = self.dialect();
        let connection = physical(&mut self.connection, self.profile.name())?;
        let statement = connection
            .prepare_call(&sql)
            .map_err(|e| DatabaseError::from_preparation(dialect, sql.as_str(), e))?;

        let mut call = PreparedCall {
            sql,
            statement,
            arguments: arguments.to_vec(),
            result: result.map(|(name, kind)| (name.to_string(), kind)),
        };
        if let Some(sql_type) = call.result.as_ref().and_then(|(_, kind)| out_type(*kind)) {
            call.statement
                .register_out_param(0, sql_type)
                .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;
        }
        for (i, argument) in call.arguments.iter().enumerate() {
            if !argument.direction.is_output() {
                continue;
            }
            let position = call.position(i);
            if let Some(sql_type) = out_type(argument.kind) {
                call.statement
                    .register_out_param(position, sql_type)
                    .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;
            }
        }
        debug!(connection = %self.profile.name(), sql = %call.sql, "Prepared procedure call");
        self.call = Some(call);
        Ok(())
    }

    /// Call the prepared procedure. `inputs` holds one value per IN or INOUT
    /// argument, in argument order. Returns the return value followed by
    /// every OUT and INOUT argument.
    pub fn call_procedure(&mut self, inputs: &Row) -> Result<Row, DatabaseError> {
        let dialect = self.dialect();
        let call = self
            .call
            .as_mut()
            .ok_or_else(|| DatabaseError::execution(dialect, "", "No procedure call has been prepared"))?;

        let mut next_input = inputs.iter();
        for i in 0..call.arguments.len() {
            if !call.arguments[i].direction.is_input() {
                continue;
            }
            let value = next_input.next().ok_or_else(|| {
                DatabaseError::execution(
                    dialect,
                    call.sql.as_str(),
                    format!("No value for procedure argument '{}'", call.arguments[i].name),
                )
            })?;
            let position = call.position(i);
            call.statement
                .set_param(position, to_param(&self.profile, value))
                .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;
        }

        call.statement
            .execute()
            .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;

        let mut row = Row::new();
        if let Some((name, kind)) = call.result.clone() {
            let cell = call
                .statement
                .out_value(0)
                .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;
            row.push(out_value(&name, kind, cell));
        }
        for i in 0..call.arguments.len() {
            if !call.arguments[i].direction.is_output() {
                continue;
            }
            let position = call.position(i);
            let cell = call
                .statement
                .out_value(position)
                .map_err(|e| DatabaseError::from_driver(dialect, call.sql.as_str(), e))?;
            let argument = &call.arguments[i];
            row.push(out_value(&argument.name, argument.kind, cell));
        }
        Ok(row)
    }
}

/// First row of `result`, and whether a second one follows when `check_more`
/// asks for it.
fn first_row(
    profile: &DialectProfile,
    shape: &Row,
    result: &mut dyn ResultSet,
    check_more: bool,
) -> DriverResult<(Option<Row>, bool)> {
    if !result.next()? {
        return Ok((None, false));
    }
    let row = read_row(profile, shape, result)?;
    let more = check_more && result.next()?;
    Ok((Some(row), more))
}
