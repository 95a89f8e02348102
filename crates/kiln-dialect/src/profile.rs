//! The per-connection dialect descriptor.

use crate::capabilities::Capabilities;
use crate::database_type::{AccessType, DatabaseType};
use crate::error::DialectError;
use crate::reserved;
use kiln_value::{Row, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Everything a session needs to know about the database it talks to:
/// the family, how to reach it, its capabilities and its SQL-shape rules.
///
/// Profiles are not mutated once a session is bound to one. The `with_*`
/// methods consume the profile and return an edited copy.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectProfile {
    name: String,
    db_type: DatabaseType,
    access: AccessType,
    host: String,
    database: String,
    port: Option<u16>,
    servername: Option<String>,
    username: String,
    password: String,
    data_tablespace: Option<String>,
    index_tablespace: Option<String>,
    custom_url: Option<String>,
    custom_driver: Option<String>,
    attributes: BTreeMap<String, String>,
    capabilities: Capabilities,
}

impl DialectProfile {
    /// Create a profile for a family using its default access type and port.
    pub fn new(name: impl Into<String>, db_type: DatabaseType) -> Self {
        let access = db_type.access_types()[0];
        Self {
            name: name.into(),
            db_type,
            access,
            host: String::new(),
            database: String::new(),
            port: db_type.default_port(access),
            servername: None,
            username: String::new(),
            password: String::new(),
            data_tablespace: None,
            index_tablespace: None,
            custom_url: None,
            custom_driver: None,
            attributes: BTreeMap::new(),
            capabilities: Capabilities::for_type(db_type),
        }
    }

    /// Create a profile from a family code and an access code.
    pub fn from_codes(
        name: impl Into<String>,
        type_code: &str,
        access_code: &str,
    ) -> Result<Self, DialectError> {
        let db_type: DatabaseType = type_code.parse()?;
        let access: AccessType = access_code.parse()?;
        Self::new(name, db_type).with_access(access)
    }

    /// Switch the access type. The port is reset to the access type's default.
    pub fn with_access(mut self, access: AccessType) -> Result<Self, DialectError> {
        if !self.db_type.supports_access(access) {
            return Err(DialectError::unsupported_access(
                self.db_type.description(),
                access.code(),
            ));
        }
        self.access = access;
        self.port = self.db_type.default_port(access);
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_servername(mut self, servername: impl Into<String>) -> Self {
        self.servername = Some(servername.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_tablespaces(mut self, data: Option<String>, index: Option<String>) -> Self {
        self.data_tablespace = data;
        self.index_tablespace = index;
        self
    }

    /// URL and driver used by the generic family.
    pub fn with_custom_driver(
        mut self,
        url: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        self.custom_url = Some(url.into());
        self.custom_driver = Some(driver.into());
        self
    }

    /// Extra key/value pairs handed to the driver untouched.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Override the family's capability set, e.g. a connection whose
    /// tables use a native boolean column.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn access_type(&self) -> AccessType {
        self.access
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn servername(&self) -> Option<&str> {
        self.servername.as_deref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn data_tablespace(&self) -> Option<&str> {
        self.data_tablespace.as_deref()
    }

    pub fn index_tablespace(&self) -> Option<&str> {
        self.index_tablespace.as_deref()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Driver identity used to obtain a physical connection.
    pub fn driver_name(&self) -> &str {
        match (&self.custom_driver, self.db_type) {
            (Some(driver), DatabaseType::Generic) => driver.as_str(),
            _ => self.db_type.driver_name(self.access),
        }
    }

    /// Connection URL for the driver.
    pub fn url(&self) -> String {
        let host_port = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };

        match (self.access, self.db_type) {
            (AccessType::Odbc, _) => format!("odbc:{}", self.database),
            (AccessType::Oci, _) => format!("oracle-oci:{}", self.database),
            (_, DatabaseType::Generic) => self.custom_url.clone().unwrap_or_default(),
            (_, DatabaseType::DuckDb) => {
                if self.database.is_empty() {
                    "duckdb::memory:".to_string()
                } else {
                    format!("duckdb:{}", self.database)
                }
            }
            (_, DatabaseType::Informix) => format!(
                "informix://{}/{}:INFORMIXSERVER={}",
                host_port,
                self.database,
                self.servername.as_deref().unwrap_or_default()
            ),
            (_, DatabaseType::SapR3) => format!("sapr3://{}", self.host),
            (_, DatabaseType::H2) | (_, DatabaseType::Hypersonic) if self.host.is_empty() => {
                format!("{}:file:{}", self.driver_name(), self.database)
            }
            _ => format!("{}://{}/{}", self.driver_name(), host_port, self.database),
        }
    }

    /// Whether credentials are passed next to the URL rather than as properties.
    pub fn supports_options_in_url(&self) -> bool {
        self.capabilities.supports_options_in_url
    }

    pub fn supports_transactions(&self) -> bool {
        self.capabilities.supports_transactions
    }

    pub fn supports_empty_transactions(&self) -> bool {
        self.capabilities.supports_empty_transactions
    }

    pub fn supports_autoinc(&self) -> bool {
        self.capabilities.supports_autoinc
    }

    pub fn supports_sequences(&self) -> bool {
        self.capabilities.supports_sequences
    }

    pub fn supports_schemas(&self) -> bool {
        self.capabilities.supports_schemas
    }

    pub fn supports_boolean_data_type(&self) -> bool {
        self.capabilities.supports_boolean_data_type
    }

    pub fn supports_batch_updates(&self) -> bool {
        self.capabilities.supports_batch_updates
    }

    pub fn supports_set_character_stream(&self) -> bool {
        self.capabilities.supports_set_character_stream
    }

    pub fn supports_set_long(&self) -> bool {
        self.capabilities.supports_set_long
    }

    pub fn supports_bitmap_index(&self) -> bool {
        self.capabilities.supports_bitmap_index
    }

    pub fn supports_float_rounding_on_update(&self) -> bool {
        self.capabilities.supports_float_rounding_on_update
    }

    pub fn supports_timestamp_to_date_conversion(&self) -> bool {
        self.capabilities.supports_timestamp_to_date_conversion
    }

    pub fn supports_views(&self) -> bool {
        self.capabilities.supports_views
    }

    pub fn supports_synonyms(&self) -> bool {
        self.capabilities.supports_synonyms
    }

    pub fn is_fetch_size_supported(&self) -> bool {
        self.capabilities.fetch_size_supported
    }

    pub fn needs_placeholder(&self) -> bool {
        self.capabilities.needs_placeholder
    }

    pub fn max_text_field_length(&self) -> i32 {
        self.capabilities.max_text_field_length
    }

    pub fn quotes_reserved_words(&self) -> bool {
        self.capabilities.quote_reserved_words
    }

    pub fn start_quote(&self) -> &'static str {
        reserved::quotes(self.db_type).0
    }

    pub fn end_quote(&self) -> &'static str {
        reserved::quotes(self.db_type).1
    }

    pub fn reserved_words(&self) -> impl Iterator<Item = &'static str> {
        reserved::reserved_words(self.db_type)
    }

    pub fn is_reserved_word(&self, word: &str) -> bool {
        reserved::is_reserved(self.db_type, word)
    }

    /// Quote `field` iff it is a reserved word and this family quotes reserved words.
    pub fn quote_field(&self, field: &str) -> String {
        if self.quotes_reserved_words() && self.is_reserved_word(field) {
            format!("{}{}{}", self.start_quote(), field, self.end_quote())
        } else {
            field.to_string()
        }
    }

    /// Rename every reserved-word field of `row` to its quoted form.
    /// Returns true when at least one field was a reserved word.
    pub fn quote_reserved_words(&self, row: &mut Row) -> bool {
        let mut found = false;
        for value in row.iter_mut() {
            if self.is_reserved_word(value.name()) {
                found = true;
                let quoted = self.quote_field(value.name());
                value.set_name(quoted);
            }
        }
        found
    }

    /// Number of fields of `row` named after a reserved word.
    pub fn reserved_word_count(&self, row: &Row) -> usize {
        row.iter()
            .filter(|v| self.is_reserved_word(v.name()))
            .count()
    }

    /// Value of the technical key used for the "unknown" dimension row.
    pub fn not_found_tk(&self, use_autoinc: bool) -> i64 {
        match self.db_type {
            DatabaseType::MySql | DatabaseType::Informix
                if self.supports_autoinc() && use_autoinc =>
            {
                1
            }
            _ => 0,
        }
    }

    /// Replace line breaks for families whose drivers reject them.
    pub fn strip_cr(&self, sql: &str) -> String {
        match self.db_type {
            DatabaseType::Db2 | DatabaseType::Cache => sql.replace(['\n', '\r'], " "),
            _ => sql.to_string(),
        }
    }

    /// Describe this profile as (parameter, value) pairs. The password never appears.
    pub fn feature_summary(&self) -> Vec<(&'static str, String)> {
        let probe = Value::new("FIELD", kiln_value::ValueKind::String).with_length(30, -1);
        let masked = self.clone().with_credentials(self.username.clone(), "password");
        let yes_no = |b: bool| if b { "Y" } else { "N" }.to_string();

        let mut summary = vec![
            ("Database type", self.db_type.description().to_string()),
            ("Access type", self.access.code().to_string()),
            ("Database name", self.database.clone()),
            ("Server hostname", self.host.clone()),
            (
                "Service port",
                self.port.map(|p| p.to_string()).unwrap_or_default(),
            ),
            ("Username", self.username.clone()),
            ("Driver", self.driver_name().to_string()),
            ("URL", masked.url()),
            (
                "SQL: next sequence value",
                self.sql_next_sequence_value("SEQUENCE").unwrap_or_default(),
            ),
            ("supported: set fetch size", yes_no(self.is_fetch_size_supported())),
            ("auto increment field needs placeholder", yes_no(self.needs_placeholder())),
            (
                "Schema / Table combination",
                self.schema_table_combination("SCHEMA", "TABLE"),
            ),
            ("LIMIT clause for 100 rows", self.limit_clause(100)),
            (
                "Add column statement",
                self.add_column_statement("TABLE", &probe, None, false, None, false),
            ),
            (
                "Drop column statement",
                self.drop_column_statement("TABLE", &probe, false),
            ),
            (
                "Modify column statement",
                self.modify_column_statement("TABLE", &probe, None, false, None, false),
            ),
            ("Quote reserved words?", yes_no(self.quotes_reserved_words())),
            ("Start quote for reserved words", self.start_quote().to_string()),
            ("End quote for reserved words", self.end_quote().to_string()),
            ("supports views?", yes_no(self.supports_views())),
            ("supports synonyms?", yes_no(self.supports_synonyms())),
            ("SQL: truncate table", self.truncate_table_statement("TABLE")),
            (
                "supports floating point rounding on update/insert",
                yes_no(self.supports_float_rounding_on_update()),
            ),
            (
                "supports timestamp-date conversion",
                yes_no(self.supports_timestamp_to_date_conversion()),
            ),
            ("supports batch updates", yes_no(self.supports_batch_updates())),
            ("supports boolean data type", yes_no(self.supports_boolean_data_type())),
        ];
        for (key, value) in &self.attributes {
            summary.push(("Extra attribute", format!("{}={}", key, value)));
        }
        summary
    }
}

impl fmt::Display for DialectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.db_type.description())
    }
}
