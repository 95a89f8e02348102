//! Value to parameter binding, shared by every write path.

use crate::driver::{DriverResult, SqlParam, SqlType, Statement};
use kiln_dialect::DialectProfile;
use kiln_value::{round, Row, Value, ValueKind, CLOB_LENGTH};

/// Whether a date value is bound and read as a date without time of day.
pub(crate) fn date_only(profile: &DialectProfile, value: &Value) -> bool {
    value.precision() == 1 || !profile.supports_timestamp_to_date_conversion()
}

/// Keep the last `max` characters of `text`.
pub fn clob_tail(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let skip = count - max;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

/// Convert `value` into the parameter the dialect expects.
///
/// Null values are bound as SQL NULL of the kind's type, whatever payload
/// they carry.
pub fn to_param(profile: &DialectProfile, value: &Value) -> SqlParam {
    match value.kind() {
        ValueKind::BigNumber => {
            if value.is_null() {
                SqlParam::Null(SqlType::Decimal)
            } else {
                SqlParam::Decimal(value.as_big_number())
            }
        }
        ValueKind::Number => {
            if value.is_null() {
                return SqlParam::Null(SqlType::Double);
            }
            let n = value.as_number();
            if profile.supports_float_rounding_on_update() && value.precision() >= 0 {
                SqlParam::Double(round(n, value.precision()))
            } else {
                SqlParam::Double(n)
            }
        }
        ValueKind::Integer => {
            if value.is_null() {
                SqlParam::Null(SqlType::Bigint)
            } else if profile.supports_set_long() {
                SqlParam::Long(value.as_integer())
            } else {
                SqlParam::Double(round(value.as_number(), 0))
            }
        }
        ValueKind::String => {
            if value.is_null() {
                return SqlParam::Null(SqlType::Varchar);
            }
            let text = value.as_string();
            if value.length() < CLOB_LENGTH {
                return SqlParam::String(text);
            }
            let max = usize::try_from(profile.max_text_field_length()).unwrap_or(0);
            let tail = clob_tail(&text, max).to_string();
            if profile.supports_set_character_stream() {
                SqlParam::CharStream(tail)
            } else {
                SqlParam::String(tail)
            }
        }
        ValueKind::Date => {
            let date_only = date_only(profile, value);
            match value.as_date().filter(|_| !value.is_null()) {
                Some(d) if date_only => SqlParam::Date(d.date()),
                Some(d) => SqlParam::Timestamp(d),
                None if date_only => SqlParam::Null(SqlType::Date),
                None => SqlParam::Null(SqlType::Timestamp),
            }
        }
        ValueKind::Boolean => {
            if profile.supports_boolean_data_type() {
                if value.is_null() {
                    SqlParam::Null(SqlType::Boolean)
                } else {
                    SqlParam::Boolean(value.as_boolean())
                }
            } else if value.is_null() {
                SqlParam::Null(SqlType::Char)
            } else {
                SqlParam::String(if value.as_boolean() { "Y" } else { "N" }.to_string())
            }
        }
        ValueKind::Binary => {
            if value.is_null() {
                SqlParam::Null(SqlType::Binary)
            } else {
                SqlParam::Bytes(value.as_binary())
            }
        }
        ValueKind::None => SqlParam::Null(SqlType::Varchar),
    }
}

/// Bind every value of `row` to consecutive parameters starting at `offset`.
/// Returns the index of the next free parameter.
pub fn bind_row(
    profile: &DialectProfile,
    statement: &mut dyn Statement,
    row: &Row,
    offset: usize,
) -> DriverResult<usize> {
    let mut index = offset;
    for value in row.iter() {
        statement.set_param(index, to_param(profile, value))?;
        index += 1;
    }
    Ok(index)
}
