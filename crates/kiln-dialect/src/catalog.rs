//! Catalog queries: listing tables, views, synonyms, schemas and catalogs,
//! and reading index definitions.

use crate::database_type::DatabaseType;
use crate::profile::DialectProfile;
use std::fmt;

/// Kind of object a catalog listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogObject {
    Tables,
    Views,
    Synonyms,
    Schemas,
    Catalogs,
}

impl fmt::Display for CatalogObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Synonyms => "synonyms",
            Self::Schemas => "schemas",
            Self::Catalogs => "catalogs",
        })
    }
}

fn literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl DialectProfile {
    /// Query whose first column names every object of `kind`, optionally
    /// limited to one schema. `None` when the family has no such objects.
    pub fn sql_catalog_listing(&self, kind: CatalogObject, schema: Option<&str>) -> Option<String> {
        let schema = schema.filter(|s| !s.is_empty() && self.supports_schemas());
        let db_type = self.database_type();
        match kind {
            CatalogObject::Tables => Some(self.sql_list_relations(false, schema)),
            CatalogObject::Views if self.supports_views() => Some(self.sql_list_relations(true, schema)),
            CatalogObject::Synonyms if self.supports_synonyms() => {
                let filter = |column: &str| {
                    schema.map_or_else(String::new, |s| {
                        format!(" AND {} = {}", column, literal(&s.to_uppercase()))
                    })
                };
                match db_type {
                    DatabaseType::Oracle => Some(format!(
                        "SELECT SYNONYM_NAME FROM ALL_SYNONYMS WHERE 1=1{} ORDER BY SYNONYM_NAME",
                        filter("OWNER")
                    )),
                    DatabaseType::Db2 | DatabaseType::As400 => Some(format!(
                        "SELECT TABNAME FROM SYSCAT.TABLES WHERE TYPE = 'A'{} ORDER BY TABNAME",
                        filter("TABSCHEMA")
                    )),
                    DatabaseType::MsSql => Some("SELECT name FROM sys.synonyms ORDER BY name".to_string()),
                    _ => None,
                }
            }
            CatalogObject::Schemas if self.supports_schemas() => Some(match db_type {
                DatabaseType::Oracle => "SELECT USERNAME FROM ALL_USERS ORDER BY USERNAME".to_string(),
                DatabaseType::Db2 | DatabaseType::As400 => {
                    "SELECT SCHEMANAME FROM SYSCAT.SCHEMATA ORDER BY SCHEMANAME".to_string()
                }
                DatabaseType::DuckDb => "SELECT schema_name FROM information_schema.schemata \
                     WHERE catalog_name = current_database() ORDER BY schema_name"
                    .to_string(),
                _ => "SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA ORDER BY SCHEMA_NAME".to_string(),
            }),
            CatalogObject::Catalogs => match db_type {
                DatabaseType::PostgreSql => {
                    Some("SELECT datname FROM pg_database WHERE NOT datistemplate ORDER BY datname".to_string())
                }
                DatabaseType::MySql => {
                    Some("SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA ORDER BY SCHEMA_NAME".to_string())
                }
                DatabaseType::MsSql | DatabaseType::Sybase => {
                    Some("SELECT name FROM sys.databases ORDER BY name".to_string())
                }
                DatabaseType::DuckDb => Some(
                    "SELECT database_name FROM duckdb_databases() WHERE NOT internal ORDER BY database_name"
                        .to_string(),
                ),
                DatabaseType::Oracle | DatabaseType::Db2 | DatabaseType::As400 => None,
                _ => Some(
                    "SELECT DISTINCT CATALOG_NAME FROM INFORMATION_SCHEMA.SCHEMATA ORDER BY CATALOG_NAME"
                        .to_string(),
                ),
            },
            _ => None,
        }
    }

    fn sql_list_relations(&self, views: bool, schema: Option<&str>) -> String {
        match self.database_type() {
            DatabaseType::Oracle => {
                let (column, source) = if views {
                    ("VIEW_NAME", "ALL_VIEWS")
                } else {
                    ("TABLE_NAME", "ALL_TABLES")
                };
                let filter = schema.map_or_else(String::new, |s| {
                    format!(" WHERE OWNER = {}", literal(&s.to_uppercase()))
                });
                format!("SELECT {0} FROM {1}{2} ORDER BY {0}", column, source, filter)
            }
            DatabaseType::Db2 | DatabaseType::As400 => format!(
                "SELECT TABNAME FROM SYSCAT.TABLES WHERE TYPE = '{}'{} ORDER BY TABNAME",
                if views { "V" } else { "T" },
                schema.map_or_else(String::new, |s| {
                    format!(" AND TABSCHEMA = {}", literal(&s.to_uppercase()))
                })
            ),
            DatabaseType::DuckDb => format!(
                "SELECT table_name FROM information_schema.tables WHERE table_type = '{}' \
                 AND table_catalog = current_database(){} ORDER BY table_name",
                if views { "VIEW" } else { "BASE TABLE" },
                schema.map_or_else(String::new, |s| format!(" AND table_schema = {}", literal(s)))
            ),
            _ => format!(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = '{}'{} ORDER BY TABLE_NAME",
                if views { "VIEW" } else { "BASE TABLE" },
                schema.map_or_else(String::new, |s| format!(" AND TABLE_SCHEMA = {}", literal(s)))
            ),
        }
    }

    /// Query returning one row per index on `table`: the index name, then
    /// either one indexed column or the index's CREATE statement.
    pub fn sql_index_columns(&self, table: &str) -> Option<String> {
        let sql = match self.database_type() {
            DatabaseType::Oracle => format!(
                "SELECT INDEX_NAME, COLUMN_NAME FROM USER_IND_COLUMNS WHERE TABLE_NAME = {}",
                literal(&table.to_uppercase())
            ),
            DatabaseType::PostgreSql => format!(
                "SELECT i.relname, a.attname FROM pg_class t \
                 JOIN pg_index ix ON t.oid = ix.indrelid \
                 JOIN pg_class i ON i.oid = ix.indexrelid \
                 JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                 WHERE t.relname = {}",
                literal(&table.to_lowercase())
            ),
            DatabaseType::MySql => format!(
                "SELECT INDEX_NAME, COLUMN_NAME FROM INFORMATION_SCHEMA.STATISTICS WHERE TABLE_NAME = {}",
                literal(table)
            ),
            DatabaseType::MsSql => format!(
                "SELECT i.name, c.name FROM sys.indexes i \
                 JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                 JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                 WHERE OBJECT_NAME(i.object_id) = {}",
                literal(table)
            ),
            DatabaseType::DuckDb => format!(
                "SELECT index_name, sql FROM duckdb_indexes() WHERE lower(table_name) = {}",
                literal(&table.to_lowercase())
            ),
            _ => return None,
        };
        Some(sql)
    }

    /// Probe that fails when `table` has no column `column`.
    pub fn sql_column_exists(&self, column: &str, table: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE 1=0",
            self.quote_field(column),
            self.quote_field(table)
        )
    }
}
