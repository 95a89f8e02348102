//! The engine's dynamically typed scalar.

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt;

/// String length marking a value as a large object rather than a bounded column.
pub const CLOB_LENGTH: i32 = 9_999_999;

/// Kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    #[default]
    None,
    String,
    /// 64-bit signed integer.
    Integer,
    /// Double precision floating point.
    Number,
    /// Arbitrary precision decimal.
    BigNumber,
    /// Instant, optionally truncated to a date (precision 1).
    Date,
    Boolean,
    Binary,
}

impl ValueKind {
    /// Get a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::None => "None",
            ValueKind::String => "String",
            ValueKind::Integer => "Integer",
            ValueKind::Number => "Number",
            ValueKind::BigNumber => "BigNumber",
            ValueKind::Date => "Date",
            ValueKind::Boolean => "Boolean",
            ValueKind::Binary => "Binary",
        }
    }

    /// True for Integer, Number and BigNumber.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueKind::Integer | ValueKind::Number | ValueKind::BigNumber
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ValueKind::None),
            "string" => Ok(ValueKind::String),
            "integer" => Ok(ValueKind::Integer),
            "number" => Ok(ValueKind::Number),
            "bignumber" => Ok(ValueKind::BigNumber),
            "date" => Ok(ValueKind::Date),
            "boolean" => Ok(ValueKind::Boolean),
            "binary" => Ok(ValueKind::Binary),
            _ => Err(format!("Unknown value kind: {}", s)),
        }
    }
}

/// Payload of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    None,
    String(String),
    Integer(i64),
    Number(f64),
    BigNumber(Decimal),
    Date(NaiveDateTime),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl Data {
    /// The zero payload for a kind.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::None => Data::None,
            ValueKind::String => Data::String(String::new()),
            ValueKind::Integer => Data::Integer(0),
            ValueKind::Number => Data::Number(0.0),
            ValueKind::BigNumber => Data::BigNumber(Decimal::ZERO),
            ValueKind::Date => Data::Date(NaiveDateTime::default()),
            ValueKind::Boolean => Data::Boolean(false),
            ValueKind::Binary => Data::Binary(Vec::new()),
        }
    }
}

/// A named, typed scalar.
///
/// The null flag is independent of the payload: a value can hold a default
/// payload and still be logically null. Copies preserve both.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    name: String,
    kind: ValueKind,
    data: Data,
    length: i32,
    precision: i32,
    null: bool,
}

impl Value {
    /// Create a null value of the given kind holding the kind's zero payload.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            data: Data::default_for(kind),
            length: -1,
            precision: -1,
            null: true,
        }
    }

    pub fn from_string(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut v = Self::new(name, ValueKind::String);
        v.set_string(value);
        v
    }

    pub fn from_integer(name: impl Into<String>, value: i64) -> Self {
        let mut v = Self::new(name, ValueKind::Integer);
        v.set_integer(value);
        v
    }

    pub fn from_number(name: impl Into<String>, value: f64) -> Self {
        let mut v = Self::new(name, ValueKind::Number);
        v.set_number(value);
        v
    }

    pub fn from_big_number(name: impl Into<String>, value: Decimal) -> Self {
        let mut v = Self::new(name, ValueKind::BigNumber);
        v.set_big_number(value);
        v
    }

    pub fn from_date(name: impl Into<String>, value: NaiveDateTime) -> Self {
        let mut v = Self::new(name, ValueKind::Date);
        v.set_date(value);
        v
    }

    pub fn from_boolean(name: impl Into<String>, value: bool) -> Self {
        let mut v = Self::new(name, ValueKind::Boolean);
        v.set_boolean(value);
        v
    }

    pub fn from_binary(name: impl Into<String>, value: Vec<u8>) -> Self {
        let mut v = Self::new(name, ValueKind::Binary);
        v.set_binary(value);
        v
    }

    /// Builder form of [`Value::set_length`].
    pub fn with_length(mut self, length: i32, precision: i32) -> Self {
        self.set_length(length, precision);
        self
    }

    /// Builder form of [`Value::set_name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Declared length: string max length (or [`CLOB_LENGTH`]) or numeric digit count.
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Declared precision: numeric scale, or 1 on a date that is date-only.
    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn set_length(&mut self, length: i32, precision: i32) {
        self.length = length;
        self.precision = precision;
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Mark the value as null. The payload is kept.
    pub fn set_null(&mut self) {
        self.null = true;
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    /// True for a date whose precision flags it as date-only.
    pub fn is_date_only(&self) -> bool {
        self.kind == ValueKind::Date && self.precision == 1
    }

    /// True when the declared length marks a large object.
    pub fn is_large_object(&self) -> bool {
        self.kind == ValueKind::String && self.length >= CLOB_LENGTH
    }

    fn set_data(&mut self, kind: ValueKind, data: Data) {
        self.kind = kind;
        self.data = data;
        self.null = false;
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        self.set_data(ValueKind::String, Data::String(value.into()));
    }

    pub fn set_integer(&mut self, value: i64) {
        self.set_data(ValueKind::Integer, Data::Integer(value));
    }

    pub fn set_number(&mut self, value: f64) {
        self.set_data(ValueKind::Number, Data::Number(value));
    }

    pub fn set_big_number(&mut self, value: Decimal) {
        self.set_data(ValueKind::BigNumber, Data::BigNumber(value));
    }

    pub fn set_date(&mut self, value: NaiveDateTime) {
        self.set_data(ValueKind::Date, Data::Date(value));
    }

    pub fn set_boolean(&mut self, value: bool) {
        self.set_data(ValueKind::Boolean, Data::Boolean(value));
    }

    pub fn set_binary(&mut self, value: Vec<u8>) {
        self.set_data(ValueKind::Binary, Data::Binary(value));
    }

    /// Payload as a 64-bit integer. Conversions never fail; unparsable
    /// strings and non-numeric payloads yield 0.
    pub fn as_integer(&self) -> i64 {
        match &self.data {
            Data::Integer(i) => *i,
            Data::Number(n) => n.round() as i64,
            Data::BigNumber(d) => d.round().to_i64().unwrap_or_default(),
            Data::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|n| n.round() as i64))
                    .unwrap_or_default()
            }
            Data::Date(d) => d.and_utc().timestamp_millis(),
            Data::Boolean(b) => i64::from(*b),
            Data::None | Data::Binary(_) => 0,
        }
    }

    /// Payload as a double.
    pub fn as_number(&self) -> f64 {
        match &self.data {
            Data::Integer(i) => *i as f64,
            Data::Number(n) => *n,
            Data::BigNumber(d) => d.to_f64().unwrap_or_default(),
            Data::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
            Data::Date(d) => d.and_utc().timestamp_millis() as f64,
            Data::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Data::None | Data::Binary(_) => 0.0,
        }
    }

    /// Payload as an arbitrary precision decimal.
    pub fn as_big_number(&self) -> Decimal {
        match &self.data {
            Data::BigNumber(d) => *d,
            Data::Integer(i) => Decimal::from(*i),
            Data::Number(n) => Decimal::from_f64(*n).unwrap_or_default(),
            Data::String(s) => s.trim().parse::<Decimal>().unwrap_or_default(),
            _ => Decimal::from_f64(self.as_number()).unwrap_or_default(),
        }
    }

    /// Payload as text, the way it is written to logs and string columns.
    pub fn as_string(&self) -> String {
        match &self.data {
            Data::None => String::new(),
            Data::String(s) => s.clone(),
            Data::Integer(i) => i.to_string(),
            Data::Number(n) => n.to_string(),
            Data::BigNumber(d) => d.to_string(),
            Data::Date(d) => {
                if self.is_date_only() {
                    d.format("%Y/%m/%d").to_string()
                } else {
                    d.format("%Y/%m/%d %H:%M:%S%.3f").to_string()
                }
            }
            Data::Boolean(b) => if *b { "Y" } else { "N" }.to_string(),
            Data::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Payload as an instant. Integers are read as epoch milliseconds.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match &self.data {
            Data::Date(d) => Some(*d),
            Data::Integer(ms) => DateTime::from_timestamp_millis(*ms).map(|d| d.naive_utc()),
            Data::String(s) => {
                let s = s.trim();
                NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
            }
            _ => None,
        }
    }

    /// Payload as a boolean. Strings use the Y/N convention.
    pub fn as_boolean(&self) -> bool {
        match &self.data {
            Data::Boolean(b) => *b,
            Data::String(s) => matches!(
                s.trim().to_uppercase().as_str(),
                "Y" | "YES" | "TRUE" | "1"
            ),
            Data::Integer(i) => *i != 0,
            Data::Number(n) => *n != 0.0,
            Data::BigNumber(d) => !d.is_zero(),
            _ => false,
        }
    }

    /// Payload as bytes.
    pub fn as_binary(&self) -> Vec<u8> {
        match &self.data {
            Data::Binary(b) => b.clone(),
            _ => self.as_string().into_bytes(),
        }
    }

    /// Number of characters in the string form of the payload.
    pub fn string_length(&self) -> usize {
        match &self.data {
            Data::String(s) => s.chars().count(),
            _ => self.as_string().chars().count(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            f.write_str("<null>")
        } else {
            f.write_str(&self.as_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_value_is_null_with_zero_payload() {
        let v = Value::new("amount", ValueKind::Integer);
        assert!(v.is_null());
        assert_eq!(v.data(), &Data::Integer(0));
        assert_eq!(v.length(), -1);
        assert_eq!(v.precision(), -1);
    }

    #[test]
    fn test_null_flag_survives_copy_with_payload() {
        let mut v = Value::from_integer("id", 42);
        v.set_null();

        let copy = v.clone();
        assert!(copy.is_null());
        assert_eq!(copy.as_integer(), 42);
    }

    #[test]
    fn test_setters_clear_null() {
        let mut v = Value::new("name", ValueKind::String);
        v.set_string("abc");
        assert!(!v.is_null());
        assert_eq!(v.as_string(), "abc");
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(Value::from_number("n", 2.6).as_integer(), 3);
        assert_eq!(Value::from_string("s", " 17 ").as_integer(), 17);
        assert_eq!(Value::from_string("s", "4.5").as_integer(), 5);
        assert_eq!(Value::from_string("s", "abc").as_integer(), 0);
        assert_eq!(Value::from_boolean("b", true).as_integer(), 1);
        assert_eq!(
            Value::from_big_number("d", Decimal::new(12345, 2)).as_integer(),
            123
        );
    }

    #[test]
    fn test_boolean_string_convention() {
        assert!(Value::from_string("b", "Y").as_boolean());
        assert!(Value::from_string("b", "true").as_boolean());
        assert!(!Value::from_string("b", "N").as_boolean());
        assert_eq!(Value::from_boolean("b", false).as_string(), "N");
    }

    #[test]
    fn test_date_only_formatting() {
        let v = Value::from_date("d", ts(2024, 3, 1)).with_length(-1, 1);
        assert!(v.is_date_only());
        assert_eq!(v.as_string(), "2024/03/01");

        let v = Value::from_date("d", ts(2024, 3, 1));
        assert_eq!(v.as_string(), "2024/03/01 00:00:00.000");
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let v = Value::from_integer("d", 0);
        assert_eq!(v.as_date(), Some(ts(1970, 1, 1)));
    }

    #[test]
    fn test_large_object_sentinel() {
        let v = Value::from_string("log", "x").with_length(CLOB_LENGTH, -1);
        assert!(v.is_large_object());
        let v = Value::from_string("name", "x").with_length(50, -1);
        assert!(!v.is_large_object());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("BigNumber".parse::<ValueKind>(), Ok(ValueKind::BigNumber));
        assert!("decimal".parse::<ValueKind>().is_err());
    }

    #[test]
    fn test_display_marks_null() {
        let mut v = Value::from_string("s", "hidden");
        v.set_null();
        assert_eq!(v.to_string(), "<null>");
    }
}
