//! Connection sessions for kiln.
//!
//! A [`ConnectionSession`] wraps one physical connection obtained from a
//! [`ConnectionPool`] and drives it through a [`DialectProfile`]: values are
//! bound and read back according to the family's capabilities, inserts are
//! batched and committed every `commit_size` rows, and result shapes are kept
//! in a shared [`MetadataCache`].
//!
//! On top of the session sit keyed lookups and stored procedure calls
//! ([`lookup`]) and slowly changing dimension maintenance ([`scd`]). Sessions
//! also list the database catalog and check for indexes and columns.
//!
//! Physical drivers implement the traits in [`driver`]; `kiln-duckdb`
//! provides one backed by DuckDB.
//!
//! [`DialectProfile`]: kiln_dialect::DialectProfile

mod binding;
mod cache;
mod catalog;
mod config;
mod counter;
pub mod driver;
mod error;
pub mod lookup;
mod materialize;
mod pool;
mod result;
pub mod scd;
mod script;
mod session;

#[cfg(test)]
mod testing;

pub use binding::{bind_row, clob_tail, to_param};
pub use cache::MetadataCache;
pub use config::{substitute, ConnectionConfig, ConnectionsFile, SessionSettings};
pub use counter::KeyCounters;
pub use error::{DatabaseError, DriverError, EXECUTE_FAILED};
pub use lookup::{Condition, LookupKey, ParamDirection, ProcedureArgument, ReturnColumn};
pub use materialize::{read_row, row_shape};
pub use pool::{connect_request, ConnectionPool, DriverManager};
pub use result::ExecResult;
pub use scd::{natural_key_crc, CombinationTable, DimensionTable, DimensionVersion, InsertedVersion};
pub use script::split_statements;
pub use session::{ConnectionSession, StatementSlot};
