//! Database family descriptors for kiln.
//!
//! A [`DialectProfile`] names a database family and how to reach it, carries
//! the family's [`Capabilities`], and renders the SQL shapes that differ
//! between families: identifier quoting, column types, DDL, limits, locks,
//! sequences and catalog queries.

mod capabilities;
mod catalog;
mod database_type;
mod ddl;
mod error;
mod profile;
mod reserved;
mod sql;

pub use capabilities::Capabilities;
pub use catalog::CatalogObject;
pub use database_type::{AccessType, DatabaseType};
pub use error::DialectError;
pub use profile::DialectProfile;
pub use reserved::reserved_words;
pub use sql::LockStatement;
