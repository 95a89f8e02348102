//! Catalog listings and existence checks for indexes and columns.

use crate::error::DatabaseError;
use crate::session::ConnectionSession;
use kiln_dialect::CatalogObject;
use std::collections::BTreeMap;
use tracing::debug;

/// Column names in one entry of an index listing: a bare column, or the
/// parenthesised column list of a CREATE INDEX statement.
fn indexed_columns(text: &str) -> Vec<String> {
    let list = match (text.find('('), text.rfind(')')) {
        (Some(open), Some(close)) if open < close => &text[open + 1..close],
        _ => text,
    };
    list.split(',')
        .map(|c| c.trim().trim_matches(|ch| matches!(ch, '"' | '`' | '[' | ']')).to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

impl ConnectionSession {
    fn catalog_listing(&mut self, kind: CatalogObject, schema: Option<&str>) -> Result<Vec<String>, DatabaseError> {
        if self.connection.is_none() {
            return Err(DatabaseError::not_connected(self.profile.name()));
        }
        let sql = self
            .profile
            .sql_catalog_listing(kind, schema)
            .ok_or_else(|| DatabaseError::unsupported(self.dialect(), kind.to_string()))?;
        let names: Vec<String> = self
            .get_rows(&sql, 0)?
            .iter()
            .filter_map(|row| row.get(0).map(|v| v.as_string()))
            .collect();
        debug!(connection = %self.profile.name(), %kind, count = names.len(), "Listed catalog");
        Ok(names)
    }

    /// Names of the tables, optionally in one schema.
    pub fn get_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>, DatabaseError> {
        self.catalog_listing(CatalogObject::Tables, schema)
    }

    /// Names of the views. Fails with [`DatabaseError::UnsupportedFeature`]
    /// when the family has no views.
    pub fn get_views(&mut self, schema: Option<&str>) -> Result<Vec<String>, DatabaseError> {
        self.catalog_listing(CatalogObject::Views, schema)
    }

    /// Names of the synonyms. Fails with [`DatabaseError::UnsupportedFeature`]
    /// when the family has no synonyms.
    pub fn get_synonyms(&mut self, schema: Option<&str>) -> Result<Vec<String>, DatabaseError> {
        self.catalog_listing(CatalogObject::Synonyms, schema)
    }

    pub fn get_schemas(&mut self) -> Result<Vec<String>, DatabaseError> {
        self.catalog_listing(CatalogObject::Schemas, None)
    }

    pub fn get_catalogs(&mut self) -> Result<Vec<String>, DatabaseError> {
        self.catalog_listing(CatalogObject::Catalogs, None)
    }

    /// Whether one index on `table` covers every column in `columns`.
    /// Column names compare case-insensitively.
    pub fn check_index_exists(&mut self, table: &str, columns: &[&str]) -> Result<bool, DatabaseError> {
        if self.connection.is_none() {
            return Err(DatabaseError::not_connected(self.profile.name()));
        }
        let sql = self
            .profile
            .sql_index_columns(table)
            .ok_or_else(|| DatabaseError::unsupported(self.dialect(), "index metadata"))?;

        let mut indexes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in self.get_rows(&sql, 0)? {
            let (Some(name), Some(entry)) = (row.get(0), row.get(1)) else {
                continue;
            };
            indexes
                .entry(name.as_string())
                .or_default()
                .extend(indexed_columns(&entry.as_string()));
        }

        let wanted: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
        Ok(indexes
            .values()
            .any(|indexed| wanted.iter().all(|c| indexed.contains(c))))
    }

    /// Whether `table` has a column named `column`.
    pub fn check_column_exists(&mut self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        if self.connection.is_none() {
            return Err(DatabaseError::not_connected(self.profile.name()));
        }
        let sql = self.profile.sql_column_exists(column, table);
        match self.get_one_row(&sql) {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(connection = %self.profile.name(), table, column, error = %e, "Column does not exist");
                Ok(false)
            }
        }
    }
}
