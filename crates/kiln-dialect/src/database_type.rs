//! Database families and the access methods used to reach them.

use crate::error::DialectError;
use std::fmt;
use std::str::FromStr;

/// A database family. The set is closed; every family has one entry in the
/// registry below, selected by code at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    MySql,
    Oracle,
    As400,
    Access,
    MsSql,
    Db2,
    PostgreSql,
    Cache,
    Informix,
    Sybase,
    Gupta,
    DBase,
    Firebird,
    SapDb,
    Hypersonic,
    Generic,
    SapR3,
    Ingres,
    Interbase,
    H2,
    DuckDb,
}

/// How a connection reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// The family's own wire driver.
    Native,
    /// Through an ODBC data source name.
    Odbc,
    /// Oracle Call Interface.
    Oci,
    /// A family-specific plugin (SAP R/3).
    Plugin,
}

impl AccessType {
    pub const ALL: [AccessType; 4] = [
        AccessType::Native,
        AccessType::Odbc,
        AccessType::Oci,
        AccessType::Plugin,
    ];

    /// Short code used in configuration files.
    pub fn code(&self) -> &'static str {
        match self {
            AccessType::Native => "Native",
            AccessType::Odbc => "ODBC",
            AccessType::Oci => "OCI",
            AccessType::Plugin => "Plugin",
        }
    }

    /// Longer description for user interaction.
    pub fn description(&self) -> &'static str {
        match self {
            AccessType::Native => "Native driver",
            AccessType::Odbc => "ODBC",
            AccessType::Oci => "OCI",
            AccessType::Plugin => "Plugin specific access method",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AccessType {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessType::ALL
            .iter()
            .find(|a| a.code().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| DialectError::unknown_access_type(s))
    }
}

/// Static description of one family.
#[derive(Debug)]
pub(crate) struct DialectEntry {
    pub db_type: DatabaseType,
    pub code: &'static str,
    pub description: &'static str,
    pub access: &'static [AccessType],
    pub native_port: Option<u16>,
    pub native_driver: &'static str,
}

const NATIVE_ODBC: &[AccessType] = &[AccessType::Native, AccessType::Odbc];

// Indexed by `DatabaseType as usize`; keep in declaration order.
static REGISTRY: [DialectEntry; 21] = [
    DialectEntry {
        db_type: DatabaseType::MySql,
        code: "MYSQL",
        description: "MySQL",
        access: NATIVE_ODBC,
        native_port: Some(3306),
        native_driver: "mysql",
    },
    DialectEntry {
        db_type: DatabaseType::Oracle,
        code: "ORACLE",
        description: "Oracle",
        access: &[AccessType::Native, AccessType::Odbc, AccessType::Oci],
        native_port: Some(1521),
        native_driver: "oracle",
    },
    DialectEntry {
        db_type: DatabaseType::As400,
        code: "AS/400",
        description: "AS/400",
        access: NATIVE_ODBC,
        native_port: None,
        native_driver: "as400",
    },
    DialectEntry {
        db_type: DatabaseType::Access,
        code: "MS ACCESS",
        description: "MS Access",
        access: &[AccessType::Odbc],
        native_port: None,
        native_driver: "odbc",
    },
    DialectEntry {
        db_type: DatabaseType::MsSql,
        code: "MSSQL",
        description: "MS SQL Server",
        access: NATIVE_ODBC,
        native_port: Some(1433),
        native_driver: "mssql",
    },
    DialectEntry {
        db_type: DatabaseType::Db2,
        code: "DB2",
        description: "IBM DB2",
        access: NATIVE_ODBC,
        native_port: Some(50000),
        native_driver: "db2",
    },
    DialectEntry {
        db_type: DatabaseType::PostgreSql,
        code: "POSTGRESQL",
        description: "PostgreSQL",
        access: NATIVE_ODBC,
        native_port: Some(5432),
        native_driver: "postgresql",
    },
    DialectEntry {
        db_type: DatabaseType::Cache,
        code: "CACHE",
        description: "Intersystems Cache",
        access: NATIVE_ODBC,
        native_port: Some(1972),
        native_driver: "cache",
    },
    DialectEntry {
        db_type: DatabaseType::Informix,
        code: "INFORMIX",
        description: "Informix",
        access: NATIVE_ODBC,
        native_port: Some(1526),
        native_driver: "informix",
    },
    DialectEntry {
        db_type: DatabaseType::Sybase,
        code: "SYBASE",
        description: "Sybase",
        access: NATIVE_ODBC,
        native_port: Some(5001),
        native_driver: "sybase",
    },
    DialectEntry {
        db_type: DatabaseType::Gupta,
        code: "GUPTA",
        description: "Gupta SQL Base",
        access: NATIVE_ODBC,
        native_port: Some(2155),
        native_driver: "gupta",
    },
    DialectEntry {
        db_type: DatabaseType::DBase,
        code: "DBASE",
        description: "dBase III, IV or 5",
        access: &[AccessType::Odbc],
        native_port: None,
        native_driver: "odbc",
    },
    DialectEntry {
        db_type: DatabaseType::Firebird,
        code: "FIREBIRD",
        description: "Firebird SQL",
        access: NATIVE_ODBC,
        native_port: Some(3050),
        native_driver: "firebird",
    },
    DialectEntry {
        db_type: DatabaseType::SapDb,
        code: "SAPDB",
        description: "MaxDB (SAP DB)",
        access: NATIVE_ODBC,
        native_port: Some(7210),
        native_driver: "sapdb",
    },
    DialectEntry {
        db_type: DatabaseType::Hypersonic,
        code: "HYPERSONIC",
        description: "Hypersonic",
        access: NATIVE_ODBC,
        native_port: Some(9001),
        native_driver: "hsqldb",
    },
    DialectEntry {
        db_type: DatabaseType::Generic,
        code: "GENERIC",
        description: "Generic database",
        access: NATIVE_ODBC,
        native_port: None,
        native_driver: "generic",
    },
    DialectEntry {
        db_type: DatabaseType::SapR3,
        code: "SAPR3",
        description: "SAP R/3 System",
        access: &[AccessType::Plugin],
        native_port: None,
        native_driver: "sapr3",
    },
    DialectEntry {
        db_type: DatabaseType::Ingres,
        code: "INGRES",
        description: "Ingres",
        access: NATIVE_ODBC,
        native_port: Some(21064),
        native_driver: "ingres",
    },
    DialectEntry {
        db_type: DatabaseType::Interbase,
        code: "INTERBASE",
        description: "Borland Interbase",
        access: NATIVE_ODBC,
        native_port: Some(3050),
        native_driver: "interbase",
    },
    DialectEntry {
        db_type: DatabaseType::H2,
        code: "H2",
        description: "H2",
        access: NATIVE_ODBC,
        native_port: Some(9092),
        native_driver: "h2",
    },
    DialectEntry {
        db_type: DatabaseType::DuckDb,
        code: "DUCKDB",
        description: "DuckDB",
        access: &[AccessType::Native],
        native_port: None,
        native_driver: "duckdb",
    },
];

impl DatabaseType {
    /// Every registered family, in registry order.
    pub fn all() -> impl Iterator<Item = DatabaseType> {
        REGISTRY.iter().map(|e| e.db_type)
    }

    pub(crate) fn entry(&self) -> &'static DialectEntry {
        &REGISTRY[*self as usize]
    }

    /// Code used in configuration files, e.g. `POSTGRESQL`.
    pub fn code(&self) -> &'static str {
        self.entry().code
    }

    /// Human-readable name.
    pub fn description(&self) -> &'static str {
        self.entry().description
    }

    /// Access types this family can be reached through. The first is the default.
    pub fn access_types(&self) -> &'static [AccessType] {
        self.entry().access
    }

    pub fn supports_access(&self, access: AccessType) -> bool {
        self.access_types().contains(&access)
    }

    /// Default port for an access type; ODBC and plugin access carry no port.
    pub fn default_port(&self, access: AccessType) -> Option<u16> {
        match access {
            AccessType::Native => self.entry().native_port,
            AccessType::Oci if *self == DatabaseType::Oracle => self.entry().native_port,
            _ => None,
        }
    }

    /// Driver identity used to look the physical driver up.
    pub fn driver_name(&self, access: AccessType) -> &'static str {
        match access {
            AccessType::Odbc => "odbc",
            AccessType::Oci => "oracle-oci",
            AccessType::Native | AccessType::Plugin => self.entry().native_driver,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DatabaseType {
    type Err = DialectError;

    /// Accepts the code or the description, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        REGISTRY
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(s) || e.description.eq_ignore_ascii_case(s))
            .map(|e| e.db_type)
            .ok_or_else(|| DialectError::unknown_database_type(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_variants() {
        for (i, entry) in REGISTRY.iter().enumerate() {
            assert_eq!(entry.db_type as usize, i, "{} out of order", entry.code);
        }
    }

    #[test]
    fn test_parse_by_code_and_description() {
        assert_eq!("postgresql".parse::<DatabaseType>(), Ok(DatabaseType::PostgreSql));
        assert_eq!("MS SQL Server".parse::<DatabaseType>(), Ok(DatabaseType::MsSql));
        assert_eq!("AS/400".parse::<DatabaseType>(), Ok(DatabaseType::As400));
        assert!(matches!(
            "foo".parse::<DatabaseType>(),
            Err(DialectError::UnknownDatabaseType { .. })
        ));
    }

    #[test]
    fn test_default_ports_per_access() {
        assert_eq!(DatabaseType::MySql.default_port(AccessType::Native), Some(3306));
        assert_eq!(DatabaseType::MySql.default_port(AccessType::Odbc), None);
        assert_eq!(DatabaseType::Oracle.default_port(AccessType::Oci), Some(1521));
        assert_eq!(DatabaseType::DuckDb.default_port(AccessType::Native), None);
    }

    #[test]
    fn test_access_types() {
        assert_eq!(DatabaseType::Access.access_types(), &[AccessType::Odbc]);
        assert!(DatabaseType::Oracle.supports_access(AccessType::Oci));
        assert!(!DatabaseType::MySql.supports_access(AccessType::Oci));
        assert_eq!("odbc".parse::<AccessType>(), Ok(AccessType::Odbc));
    }

    #[test]
    fn test_driver_names() {
        assert_eq!(DatabaseType::PostgreSql.driver_name(AccessType::Native), "postgresql");
        assert_eq!(DatabaseType::PostgreSql.driver_name(AccessType::Odbc), "odbc");
        assert_eq!(DatabaseType::Oracle.driver_name(AccessType::Oci), "oracle-oci");
    }
}
