//! Dynamically typed values and rows for kiln.
//!
//! A [`Value`] is a named, tagged scalar that carries an explicit null flag
//! independent of its payload. A [`Row`] is an ordered list of values whose
//! order matches the column order of generated SQL.

mod numeric;
mod row;
mod value;

pub use numeric::round;
pub use row::Row;
pub use value::{Data, Value, ValueKind, CLOB_LENGTH};
