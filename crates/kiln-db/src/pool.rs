//! Where sessions get their physical connections from.

use crate::driver::{ConnectRequest, Driver, DriverResult, PhysicalConnection};
use crate::error::DriverError;
use kiln_dialect::DialectProfile;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Supplies and reclaims physical connections. Shared between sessions, so
/// implementations synchronize internally.
pub trait ConnectionPool: Send + Sync {
    /// Open (or hand out) a connection through the driver named `driver`.
    fn acquire(&self, driver: &str, request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>>;

    /// Take back a connection the session no longer needs.
    fn release(&self, connection: Box<dyn PhysicalConnection>) -> DriverResult<()>;
}

/// Build the connect request for `profile`. Credentials travel next to the
/// URL when the dialect allows it, otherwise as properties alongside the
/// profile's extra attributes.
pub fn connect_request(profile: &DialectProfile) -> ConnectRequest {
    let mut request = ConnectRequest {
        url: profile.url(),
        ..ConnectRequest::default()
    };

    if profile.supports_options_in_url() {
        if !profile.username().is_empty() {
            request.username = Some(profile.username().to_string());
            request.password = Some(profile.password().to_string());
        }
    } else {
        request.properties = profile.attributes().clone();
        if !profile.username().is_empty() {
            request
                .properties
                .insert("user".to_string(), profile.username().to_string());
        }
        if !profile.password().is_empty() {
            request
                .properties
                .insert("password".to_string(), profile.password().to_string());
        }
    }
    request
}

/// A pool without pooling: every acquire opens a fresh connection through a
/// registered driver and every release closes it.
#[derive(Default)]
pub struct DriverManager {
    drivers: Mutex<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` under its name. Registering a name twice keeps the
    /// first driver.
    pub fn register(&self, driver: Arc<dyn Driver>) {
        let mut drivers = self.drivers.lock().unwrap_or_else(PoisonError::into_inner);
        let name = driver.name().to_string();
        if drivers.contains_key(&name) {
            return;
        }
        debug!(driver = %name, "Registered driver");
        drivers.insert(name, driver);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl ConnectionPool for DriverManager {
    fn acquire(&self, driver: &str, request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>> {
        let found = self
            .driver(driver)
            .ok_or_else(|| DriverError::sql(format!("No driver registered as '{}'", driver)))?;
        found.connect(request)
    }

    fn release(&self, mut connection: Box<dyn PhysicalConnection>) -> DriverResult<()> {
        connection.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_dialect::DatabaseType;

    struct NoopDriver(&'static str);

    impl Driver for NoopDriver {
        fn name(&self) -> &str {
            self.0
        }

        fn connect(&self, _request: &ConnectRequest) -> DriverResult<Box<dyn PhysicalConnection>> {
            Err(DriverError::sql("unreachable host"))
        }
    }

    #[test]
    fn test_credentials_in_url() {
        let profile = DialectProfile::new("pg", DatabaseType::PostgreSql)
            .with_host("db")
            .with_database("dwh")
            .with_credentials("etl", "secret")
            .with_attribute("ssl", "true");
        let request = connect_request(&profile);
        assert_eq!(request.username.as_deref(), Some("etl"));
        assert_eq!(request.password.as_deref(), Some("secret"));
        assert!(request.properties.is_empty());
    }

    #[test]
    fn test_credentials_as_properties() {
        let profile = DialectProfile::new("ms", DatabaseType::MsSql)
            .with_credentials("etl", "secret")
            .with_attribute("instance", "SQLEXPRESS");
        let request = connect_request(&profile);
        assert!(request.username.is_none());
        assert_eq!(request.properties.get("user").map(String::as_str), Some("etl"));
        assert_eq!(request.properties.get("password").map(String::as_str), Some("secret"));
        assert_eq!(request.properties.get("instance").map(String::as_str), Some("SQLEXPRESS"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let manager = DriverManager::new();
        manager.register(Arc::new(NoopDriver("pg")));
        manager.register(Arc::new(NoopDriver("pg")));
        assert!(manager.is_registered("pg"));
        assert!(!manager.is_registered("mysql"));
    }

    #[test]
    fn test_missing_driver() {
        let manager = DriverManager::new();
        let err = manager
            .acquire("oracle", &ConnectRequest::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("oracle"));
    }
}
