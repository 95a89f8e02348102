//! Reserved words and identifier quote characters per family.

use crate::database_type::DatabaseType;

/// Words reserved by SQL-92 that every family treats as keywords.
const SQL92: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHAR",
    "CHECK", "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATE", "DECIMAL", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FLOAT", "FOR", "FOREIGN",
    "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTEGER",
    "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "NATURAL", "NOT", "NULL",
    "NUMERIC", "OF", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT",
    "SET", "SMALLINT", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER",
    "USING", "VALUES", "VARCHAR", "VIEW", "WHEN", "WHERE", "WITH",
];

const MYSQL: &[&str] = &[
    "AUTO_INCREMENT", "BIGINT", "BLOB", "CHANGE", "DATABASE", "DATABASES", "DAY_HOUR",
    "DOUBLE", "ENCLOSED", "EXPLAIN", "FIELDS", "FULLTEXT", "HIGH_PRIORITY", "IF", "IGNORE",
    "INDEX", "INFILE", "INTERVAL", "KEYS", "KILL", "LIMIT", "LINES", "LOAD", "LOCK", "LONG",
    "LONGTEXT", "LOW_PRIORITY", "MEDIUMTEXT", "MOD", "OPTIMIZE", "OPTION", "OUTFILE",
    "PROCEDURE", "PURGE", "READ", "REGEXP", "RENAME", "REPLACE", "REQUIRE", "RESTRICT",
    "RLIKE", "SHOW", "SONAME", "SQL_BIG_RESULT", "STRAIGHT_JOIN", "TERMINATED", "TEXT",
    "TINYINT", "TINYTEXT", "UNLOCK", "UNSIGNED", "USAGE", "USE", "WRITE", "ZEROFILL",
];

const ORACLE: &[&str] = &[
    "ACCESS", "AUDIT", "CLUSTER", "COMMENT", "COMPRESS", "CONNECT", "EXCLUSIVE", "FILE",
    "IDENTIFIED", "IMMEDIATE", "INCREMENT", "INDEX", "INITIAL", "LEVEL", "LOCK", "LONG",
    "MAXEXTENTS", "MINUS", "MLSLABEL", "MODE", "MODIFY", "NOAUDIT", "NOCOMPRESS", "NOWAIT",
    "NUMBER", "OFFLINE", "ONLINE", "OPTION", "PCTFREE", "PRIOR", "PRIVILEGES", "PUBLIC", "RAW",
    "RENAME", "RESOURCE", "REVOKE", "ROW", "ROWID", "ROWNUM", "ROWS", "SESSION", "SHARE",
    "SIZE", "START", "SUCCESSFUL", "SYNONYM", "SYSDATE", "TRIGGER", "UID", "VALIDATE",
    "VARCHAR2", "WHENEVER",
];

const DB2: &[&str] = &[
    "ALIAS", "ALLOW", "ASUTIME", "AUDIT", "BUFFERPOOL", "CALL", "CAPTURE", "CASCADED", "CCSID",
    "CLUSTER", "COLLECTION", "COLLID", "COMMENT", "CONCAT", "CONTAINS", "COUNT", "DATA",
    "DATABASE", "DAY", "DAYS", "DBINFO", "DYNAMIC", "EDITPROC", "ERASE", "EXCLUSIVE",
    "FENCED", "FIELDPROC", "FILE", "FINAL", "GENERATED", "HOUR", "HOURS", "IMMEDIATE",
    "INDEX", "INTEGRITY", "ISOBID", "LOCALE", "LOCATOR", "LOCKMAX", "LOCKSIZE", "MICROSECOND",
    "MINUTE", "MODE", "MONTH", "NODENAME", "NULLS", "NUMPARTS", "OBID", "OPTIMIZATION",
    "PACKAGE", "PART", "PIECESIZE", "PLAN", "PRIQTY", "PROGRAM", "PSID", "QUERYNO",
    "RECOVERY", "RESULT", "RUN", "SCHEMA", "SECOND", "SECQTY", "SIMPLE", "SOURCE",
    "STOGROUP", "SUBPAGES", "SYNONYM", "TABLESPACE", "VALIDPROC", "VARIANT", "VCAT",
    "VOLUMES", "WLM", "YEAR", "YEARS",
];

const POSTGRESQL: &[&str] = &[
    "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "BOTH", "COLLATE", "DEFERRABLE", "DO",
    "FREEZE", "ILIKE", "INITIALLY", "ISNULL", "LEADING", "LIMIT", "LOCALTIME",
    "LOCALTIMESTAMP", "NEW", "NOTNULL", "OFF", "OFFSET", "OLD", "ONLY", "OVERLAPS", "PLACING",
    "RETURNING", "SIMILAR", "SOME", "SYMMETRIC", "TRAILING", "VERBOSE",
];

const MSSQL: &[&str] = &[
    "BACKUP", "BREAK", "BROWSE", "BULK", "CHECKPOINT", "CLUSTERED", "COMPUTE", "CONTAINS",
    "CONTAINSTABLE", "DATABASE", "DBCC", "DENY", "DISK", "DISTRIBUTED", "DUMMY", "DUMP",
    "ERRLVL", "EXEC", "FILE", "FILLFACTOR", "FREETEXT", "FREETEXTTABLE", "HOLDLOCK",
    "IDENTITY", "IDENTITYCOL", "IDENTITY_INSERT", "INDEX", "KILL", "LINENO", "LOAD",
    "NOCHECK", "NONCLUSTERED", "OFFSETS", "OPENDATASOURCE", "OPENQUERY", "OPENROWSET",
    "OPENXML", "PERCENT", "PLAN", "PRINT", "PROC", "RAISERROR", "READTEXT", "RECONFIGURE",
    "REPLICATION", "RESTORE", "ROWCOUNT", "ROWGUIDCOL", "RULE", "SAVE", "SETUSER", "SHUTDOWN",
    "STATISTICS", "TEXTSIZE", "TOP", "TRAN", "TRUNCATE", "TSEQUAL", "UPDATETEXT",
    "WRITETEXT",
];

const INFORMIX: &[&str] = &[
    "BYTE", "CLUSTER", "DATABASE", "DATETIME", "DBA", "EXCLUSIVE", "FRACTION", "INDEX",
    "INT8", "LOCK", "LVARCHAR", "MATCHES", "MODE", "MONEY", "SERIAL", "SERIAL8", "SHARE",
    "TEXT", "UNLOCK",
];

const ACCESS: &[&str] = &[
    "COUNTER", "CURRENCY", "DATABASE", "DATETIME", "DISALLOW", "DISTINCTROW", "IMP", "INDEX",
    "LONGBINARY", "MEMO", "MOD", "OWNERACCESS", "PARAMETERS", "PIVOT", "TEXT", "TOP",
    "TRANSFORM", "YESNO",
];

const FIREBIRD: &[&str] = &[
    "ACTIVE", "BLOB", "COMPUTED", "DATABASE", "GENERATOR", "GEN_ID", "INDEX", "MAXIMUM",
    "PLAN", "POSITION", "ROWS", "SHADOW", "TRIGGER", "TYPE", "VARIABLE",
];

const DUCKDB: &[&str] = &[
    "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "BOTH", "COLLATE", "DEFERRABLE", "DO",
    "ILIKE", "INITIALLY", "LATERAL", "LEADING", "LIMIT", "OFFSET", "ONLY", "PIVOT", "QUALIFY",
    "RETURNING", "SOME", "SYMMETRIC", "TRAILING", "UNPIVOT",
];

const NONE: &[&str] = &[];

/// Family-specific reserved words on top of [`SQL92`].
pub(crate) fn family_words(db_type: DatabaseType) -> &'static [&'static str] {
    match db_type {
        DatabaseType::MySql => MYSQL,
        DatabaseType::Oracle | DatabaseType::SapDb => ORACLE,
        DatabaseType::Db2 | DatabaseType::As400 => DB2,
        DatabaseType::PostgreSql => POSTGRESQL,
        DatabaseType::MsSql | DatabaseType::Sybase => MSSQL,
        DatabaseType::Informix => INFORMIX,
        DatabaseType::Access => ACCESS,
        DatabaseType::Firebird | DatabaseType::Interbase => FIREBIRD,
        DatabaseType::DuckDb => DUCKDB,
        _ => NONE,
    }
}

/// All reserved words of a family.
pub fn reserved_words(db_type: DatabaseType) -> impl Iterator<Item = &'static str> {
    SQL92.iter().chain(family_words(db_type).iter()).copied()
}

pub(crate) fn is_reserved(db_type: DatabaseType, word: &str) -> bool {
    reserved_words(db_type).any(|w| w.eq_ignore_ascii_case(word))
}

/// Opening and closing identifier quote of a family.
pub(crate) fn quotes(db_type: DatabaseType) -> (&'static str, &'static str) {
    match db_type {
        DatabaseType::MySql => ("`", "`"),
        DatabaseType::MsSql | DatabaseType::Access => ("[", "]"),
        _ => ("\"", "\""),
    }
}
