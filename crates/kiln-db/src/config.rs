//! Connection definitions loaded from YAML.
//!
//! ```yaml
//! connections:
//!   - name: dwh
//!     dialect: POSTGRESQL
//!     host: ${DWH_HOST}
//!     database: warehouse
//!     username: etl
//!     password: ${DWH_PASSWORD}
//!     commit_size: 1000
//! ```

use crate::error::DatabaseError;
use kiln_dialect::{AccessType, DatabaseType, DialectProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A file holding any number of connection definitions.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectionsFile {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl ConnectionsFile {
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatabaseError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, DatabaseError> {
        serde_yaml::from_str(content)
            .map_err(|e| DatabaseError::configuration(format!("Invalid connection file: {}", e)))
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// One logical connection: which dialect, where, as whom, and how its
/// sessions commit and fetch.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub name: String,
    /// Dialect code, e.g. `ORACLE` or `DUCKDB`.
    pub dialect: String,
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub host: String,
    /// Kept as text so it may reference an environment variable.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub servername: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub data_tablespace: Option<String>,
    #[serde(default)]
    pub index_tablespace: Option<String>,
    /// Passed to the driver untouched.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub session: SessionSettings,
}

fn default_access() -> String {
    AccessType::Native.code().to_string()
}

/// Session tuning applied when a session is opened for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Rows per commit; 0 or less means autocommit.
    #[serde(default)]
    pub commit_size: i64,
    /// Maximum rows returned per query; 0 means no limit.
    #[serde(default)]
    pub row_limit: usize,
    #[serde(default)]
    pub fetch_size: usize,
    #[serde(default = "default_use_batch")]
    pub use_batch: bool,
}

fn default_use_batch() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            commit_size: 0,
            row_limit: 0,
            fetch_size: 0,
            use_batch: true,
        }
    }
}

impl ConnectionConfig {
    /// Build the dialect profile, with `${VAR}` references resolved from the
    /// process environment.
    pub fn to_profile(&self) -> Result<DialectProfile, DatabaseError> {
        self.to_profile_with(|name| std::env::var(name).ok())
    }

    /// Build the dialect profile, resolving `${VAR}` references with `lookup`.
    pub fn to_profile_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<DialectProfile, DatabaseError> {
        let db_type: DatabaseType = self
            .dialect
            .parse()
            .map_err(|e| DatabaseError::configuration(format!("Connection '{}': {}", self.name, e)))?;
        let access: AccessType = self
            .access
            .parse()
            .map_err(|e| DatabaseError::configuration(format!("Connection '{}': {}", self.name, e)))?;

        let mut profile = DialectProfile::new(self.name.clone(), db_type)
            .with_access(access)
            .map_err(|e| DatabaseError::configuration(e.to_string()))?
            .with_host(substitute(&self.host, &lookup))
            .with_database(substitute(&self.database, &lookup))
            .with_credentials(
                substitute(&self.username, &lookup),
                substitute(&self.password, &lookup),
            )
            .with_tablespaces(self.data_tablespace.clone(), self.index_tablespace.clone())
            .with_attributes(self.attributes.clone());

        if let Some(port) = &self.port {
            let port = substitute(port, &lookup);
            let port = port.trim();
            let parsed = if port.is_empty() {
                None
            } else {
                Some(port.parse::<u16>().map_err(|_| {
                    DatabaseError::configuration(format!(
                        "Connection '{}': invalid port '{}'",
                        self.name, port
                    ))
                })?)
            };
            profile = profile.with_port(parsed);
        }
        if let Some(servername) = &self.servername {
            profile = profile.with_servername(substitute(servername, &lookup));
        }
        Ok(profile)
    }
}

/// Replace each `${NAME}` in `text` with `lookup(NAME)`. Unknown variables
/// are left as written.
pub fn substitute(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
