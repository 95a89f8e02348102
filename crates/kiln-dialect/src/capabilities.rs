//! Feature flags per database family.

use crate::database_type::DatabaseType;
use kiln_value::CLOB_LENGTH;

/// Capabilities of a database family.
///
/// Used to decide which statement shapes and bindings a session may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Supports COMMIT / ROLLBACK
    pub supports_transactions: bool,

    /// Committing with nothing pending is accepted without error
    pub supports_empty_transactions: bool,

    /// Supports autoincrement / identity columns
    pub supports_autoinc: bool,

    /// Supports SEQUENCE objects
    pub supports_sequences: bool,

    /// Table names can be qualified with a schema
    pub supports_schemas: bool,

    /// Has a native BOOLEAN column type (otherwise Y/N in CHAR(1))
    pub supports_boolean_data_type: bool,

    /// Prepared statements accept batches
    pub supports_batch_updates: bool,

    /// Large strings can be bound as character streams
    pub supports_set_character_stream: bool,

    /// Integers can be bound as 64-bit longs
    pub supports_set_long: bool,

    /// Supports CREATE BITMAP INDEX
    pub supports_bitmap_index: bool,

    /// Doubles are rounded to the declared precision before binding
    pub supports_float_rounding_on_update: bool,

    /// Date columns are read and written as timestamps
    pub supports_timestamp_to_date_conversion: bool,

    /// Supports views
    pub supports_views: bool,

    /// Supports synonyms
    pub supports_synonyms: bool,

    /// Statement fetch size can be tuned
    pub fetch_size_supported: bool,

    /// Serial columns need a literal placeholder in INSERT column lists
    pub needs_placeholder: bool,

    /// Reserved words used as identifiers are quoted
    pub quote_reserved_words: bool,

    /// Credentials may travel alongside the URL instead of as properties
    pub supports_options_in_url: bool,

    /// Longest string bound to a large-object column
    pub max_text_field_length: i32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_transactions: true,
            supports_empty_transactions: true,
            supports_autoinc: true,
            supports_sequences: false,
            supports_schemas: true,
            supports_boolean_data_type: false,
            supports_batch_updates: true,
            supports_set_character_stream: true,
            supports_set_long: true,
            supports_bitmap_index: false,
            supports_float_rounding_on_update: true,
            supports_timestamp_to_date_conversion: true,
            supports_views: true,
            supports_synonyms: false,
            fetch_size_supported: true,
            needs_placeholder: false,
            quote_reserved_words: true,
            supports_options_in_url: true,
            max_text_field_length: CLOB_LENGTH,
        }
    }
}

impl Capabilities {
    /// Capabilities for a database family.
    pub fn for_type(db_type: DatabaseType) -> Self {
        let base = Self::default();
        match db_type {
            DatabaseType::MySql => Self {
                supports_schemas: false,
                ..base
            },
            DatabaseType::Oracle => Self {
                supports_autoinc: false,
                supports_sequences: true,
                supports_bitmap_index: true,
                supports_synonyms: true,
                ..base
            },
            DatabaseType::As400 | DatabaseType::Db2 => Self {
                supports_sequences: true,
                supports_synonyms: true,
                ..base
            },
            DatabaseType::Access => Self {
                supports_empty_transactions: false,
                supports_schemas: false,
                supports_batch_updates: false,
                supports_set_long: false,
                supports_set_character_stream: false,
                supports_float_rounding_on_update: false,
                fetch_size_supported: false,
                supports_options_in_url: false,
                max_text_field_length: 65_536,
                ..base
            },
            DatabaseType::MsSql | DatabaseType::Sybase => Self {
                supports_options_in_url: false,
                ..base
            },
            DatabaseType::PostgreSql => Self {
                supports_sequences: true,
                supports_boolean_data_type: true,
                supports_set_character_stream: false,
                ..base
            },
            DatabaseType::Cache => Self {
                supports_batch_updates: false,
                ..base
            },
            DatabaseType::Informix => Self {
                supports_empty_transactions: false,
                supports_timestamp_to_date_conversion: false,
                needs_placeholder: true,
                max_text_field_length: 32_000,
                ..base
            },
            DatabaseType::Gupta => Self {
                supports_batch_updates: false,
                supports_schemas: false,
                ..base
            },
            DatabaseType::DBase => Self {
                supports_transactions: false,
                supports_autoinc: false,
                supports_schemas: false,
                supports_batch_updates: false,
                supports_set_long: false,
                supports_set_character_stream: false,
                supports_views: false,
                fetch_size_supported: false,
                max_text_field_length: 254,
                ..base
            },
            DatabaseType::Firebird | DatabaseType::Interbase => Self {
                supports_autoinc: false,
                supports_sequences: true,
                supports_schemas: false,
                ..base
            },
            DatabaseType::SapDb => Self {
                supports_empty_transactions: false,
                supports_sequences: true,
                ..base
            },
            DatabaseType::Hypersonic => Self {
                supports_sequences: true,
                supports_boolean_data_type: true,
                supports_set_character_stream: false,
                ..base
            },
            DatabaseType::Generic => Self {
                supports_autoinc: false,
                ..base
            },
            DatabaseType::SapR3 => Self {
                supports_transactions: false,
                supports_autoinc: false,
                supports_batch_updates: false,
                supports_views: false,
                quote_reserved_words: false,
                ..base
            },
            DatabaseType::Ingres => Self {
                supports_sequences: true,
                supports_batch_updates: false,
                ..base
            },
            DatabaseType::H2 => Self {
                supports_sequences: true,
                supports_boolean_data_type: true,
                ..base
            },
            DatabaseType::DuckDb => Self {
                supports_autoinc: false,
                supports_sequences: true,
                supports_boolean_data_type: true,
                supports_set_character_stream: false,
                ..base
            },
        }
    }
}
