//! Result-set shapes and row materialization.

use crate::binding::date_only;
use crate::driver::{ColumnMeta, DriverResult, ResultSet, SqlType};
use kiln_dialect::{DatabaseType, DialectProfile};
use kiln_value::{round, Row, Value, ValueKind, CLOB_LENGTH};

/// Describe a result set as a row of typed, null values.
///
/// Column precision and scale become the value's length and precision.
/// Numerics without scale narrow to integers, and very wide ones widen to
/// big numbers.
pub fn row_shape(profile: &DialectProfile, columns: &[ColumnMeta]) -> Row {
    columns.iter().map(|c| column_value(profile, c)).collect()
}

fn column_value(profile: &DialectProfile, column: &ColumnMeta) -> Value {
    let (kind, length, precision) = match column.sql_type {
        SqlType::Char | SqlType::Varchar | SqlType::LongVarchar => {
            (ValueKind::String, column.display_size, -1)
        }
        SqlType::Clob => (ValueKind::String, CLOB_LENGTH, -1),
        SqlType::Bigint => (ValueKind::Integer, 15, 0),
        SqlType::Integer => (ValueKind::Integer, 9, 0),
        SqlType::Smallint => (ValueKind::Integer, 4, 0),
        SqlType::Tinyint => (ValueKind::Integer, 2, 0),
        SqlType::Decimal
        | SqlType::Numeric
        | SqlType::Double
        | SqlType::Float
        | SqlType::Real => numeric_shape(profile, column),
        SqlType::Date => (ValueKind::Date, -1, 1),
        SqlType::Time | SqlType::Timestamp => (ValueKind::Date, -1, -1),
        SqlType::Boolean | SqlType::Bit => (ValueKind::Boolean, -1, -1),
        SqlType::Binary => (ValueKind::Binary, -1, -1),
        SqlType::Other => (ValueKind::String, column.precision, column.scale),
    };
    Value::new(column.name.clone(), kind).with_length(length, precision)
}

fn numeric_shape(profile: &DialectProfile, column: &ColumnMeta) -> (ValueKind, i32, i32) {
    let mut length = column.precision;
    let mut precision = column.scale;
    if length >= 126 {
        length = -1;
    }
    if precision >= 126 {
        precision = -1;
    }

    let floating = matches!(
        column.sql_type,
        SqlType::Double | SqlType::Float | SqlType::Real
    );
    let mut kind = ValueKind::Number;
    if floating {
        if precision == 0 {
            precision = -1;
        }
        if profile.database_type() == DatabaseType::PostgreSql && length == 16 && precision == 16 {
            length = -1;
            precision = -1;
        }
    } else if precision == 0 && length > 0 && length < 18 {
        kind = ValueKind::Integer;
    }

    if length > 18 || precision > 18 {
        kind = ValueKind::BigNumber;
    }

    if profile.database_type() == DatabaseType::Oracle
        && kind == ValueKind::Number
        && precision <= 0
        && length <= 0
    {
        kind = ValueKind::BigNumber;
        length = -1;
        precision = -1;
    }

    (kind, length, precision)
}

/// Read the current row of `rs` into a copy of `shape`.
///
/// Each column is read with the getter for its kind, then checked for SQL
/// NULL. A null column keeps the getter's default payload and is flagged null.
pub fn read_row(
    profile: &DialectProfile,
    shape: &Row,
    rs: &mut dyn ResultSet,
) -> DriverResult<Row> {
    let mut row = shape.clone();
    for (i, value) in row.iter_mut().enumerate() {
        read_value(profile, value, rs, i)?;
        if rs.was_null() {
            value.set_null();
        }
    }
    Ok(row)
}

fn read_value(
    profile: &DialectProfile,
    value: &mut Value,
    rs: &mut dyn ResultSet,
    column: usize,
) -> DriverResult<()> {
    match value.kind() {
        ValueKind::Integer => value.set_integer(rs.get_long(column)?),
        ValueKind::Number => {
            let n = rs.get_double(column)?;
            if profile.supports_float_rounding_on_update() && value.precision() >= 0 {
                value.set_number(round(n, value.precision()));
            } else {
                value.set_number(n);
            }
        }
        ValueKind::BigNumber => value.set_big_number(rs.get_decimal(column)?),
        ValueKind::String | ValueKind::None => value.set_string(rs.get_string(column)?),
        ValueKind::Date => {
            let read = if !date_only(profile, value) {
                rs.get_timestamp(column)?
            } else {
                rs.get_date(column)?.and_then(|d| d.and_hms_opt(0, 0, 0))
            };
            match read {
                Some(d) => value.set_date(d),
                None => value.set_null(),
            }
        }
        ValueKind::Boolean => {
            if profile.supports_boolean_data_type() {
                value.set_boolean(rs.get_boolean(column)?);
            } else {
                let text = rs.get_string(column)?;
                value.set_boolean(text.trim().eq_ignore_ascii_case("Y"));
            }
        }
        ValueKind::Binary => value.set_binary(rs.get_bytes(column)?),
    }
    Ok(())
}
