//! Sessions driven end-to-end against DuckDB databases.

use chrono::{NaiveDate, NaiveDateTime};
use kiln_db::{
    CombinationTable, ConnectionPool, ConnectionSession, DatabaseError, DimensionTable, DimensionVersion,
    KeyCounters, LookupKey, ReturnColumn, StatementSlot,
};
use kiln_dialect::{DatabaseType, DialectProfile};
use kiln_value::{Row, Value, ValueKind};
use std::sync::Arc;
use tempfile::TempDir;

/// A DuckDB file in a temporary directory and a pool that opens it.
struct Warehouse {
    dir: TempDir,
    pool: Arc<dyn ConnectionPool>,
}

impl Warehouse {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            pool: kiln_duckdb::driver_manager(),
        }
    }

    fn path(&self) -> String {
        self.dir.path().join("warehouse.duckdb").display().to_string()
    }

    fn session(&self) -> ConnectionSession {
        let profile = DialectProfile::new("warehouse", DatabaseType::DuckDb).with_database(self.path());
        let mut session = ConnectionSession::new(profile, Arc::clone(&self.pool));
        session.connect().unwrap();
        session
    }

    /// The same database reached through the generic family.
    fn generic_session(&self) -> ConnectionSession {
        let profile = DialectProfile::new("generic", DatabaseType::Generic)
            .with_custom_driver(format!("duckdb:{}", self.path()), "duckdb");
        let mut session = ConnectionSession::new(profile, Arc::clone(&self.pool));
        session.connect().unwrap();
        session
    }

    fn count(&self, sql: &str) -> i64 {
        let mut session = self.session();
        let count = session.get_one_row(sql).unwrap().unwrap()[0].as_integer();
        session.disconnect();
        count
    }
}

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

fn row(values: Vec<Value>) -> Row {
    values.into()
}

#[test]
fn test_customer_dimension_history() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.generic_session();
    session
        .exec_statement(
            "CREATE TABLE D_CUSTOMER (CUSTOMER_TK BIGINT, VERSION INTEGER, DATE_FROM TIMESTAMP, \
             DATE_TO TIMESTAMP, CUST_ID BIGINT, NAME VARCHAR, CITY VARCHAR)",
            None,
        )
        .unwrap();

    let dim = DimensionTable::new("D_CUSTOMER", "CUSTOMER_TK")
        .with_version_columns("VERSION", "DATE_FROM", "DATE_TO")
        .with_keys(["CUST_ID"])
        .with_fields(["NAME", "CITY"]);
    let open = session.profile().open_end_date();
    let (t0, t1) = (at(2024, 1, 1), at(2024, 6, 1));
    let keys = row(vec![Value::from_integer("CUST_ID", 42)]);

    let first_key = session.next_counter_value("D_CUSTOMER", "CUSTOMER_TK").unwrap();
    let first = session
        .dim_insert(
            &dim,
            &DimensionVersion {
                keys: &keys,
                fields: &row(vec![Value::from_string("NAME", "Ann"), Value::from_string("CITY", "Ghent")]),
                technical_key: Some(first_key),
                previous_version: None,
                date_from: t0,
                date_to: open,
            },
        )
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.technical_key, 1);

    let second_key = session.next_counter_value("D_CUSTOMER", "CUSTOMER_TK").unwrap();
    let second = session
        .dim_insert(
            &dim,
            &DimensionVersion {
                keys: &keys,
                fields: &row(vec![Value::from_string("NAME", "Ann"), Value::from_string("CITY", "Leuven")]),
                technical_key: Some(second_key),
                previous_version: Some(first.version),
                date_from: t1,
                date_to: open,
            },
        )
        .unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(second.technical_key, 2);

    let history = session
        .get_rows(
            "SELECT VERSION, DATE_FROM, DATE_TO FROM D_CUSTOMER WHERE CUST_ID = 42 ORDER BY VERSION",
            0,
        )
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0][0].as_integer(), 1);
    assert_eq!(history[0][1].as_date(), Some(t0));
    assert_eq!(history[0][2].as_date(), Some(t1));
    assert_eq!(history[1][0].as_integer(), 2);
    assert_eq!(history[1][1].as_date(), Some(t1));
    assert_eq!(history[1][2].as_date(), Some(open));

    let current = row(vec![Value::from_date("DATE_TO", open)]);
    session
        .open_query("SELECT VERSION, CITY FROM D_CUSTOMER WHERE DATE_TO = ?", Some(&current))
        .unwrap();
    let mut open_rows = Vec::new();
    while let Some(r) = session.get_row().unwrap() {
        open_rows.push(r);
    }
    session.close_query().unwrap();
    assert_eq!(open_rows.len(), 1);
    assert_eq!(open_rows[0][0].as_integer(), 2);
    assert_eq!(open_rows[0][1].as_string(), "Leuven");

    session.set_dim_lookup(&dim, &[ReturnColumn::new("CITY")]).unwrap();
    let before = session.dim_lookup(&keys, Some(at(2024, 3, 1))).unwrap().unwrap();
    assert_eq!(before[1].as_integer(), 1);
    assert_eq!(before[2].as_string(), "Ghent");
    let after = session.dim_lookup(&keys, Some(at(2024, 9, 1))).unwrap().unwrap();
    assert_eq!(after[0].as_integer(), 2);
    assert_eq!(after[2].as_string(), "Leuven");
    assert!(session.dim_lookup(&keys, Some(at(2023, 1, 1))).unwrap().is_none());

    session.disconnect();
}

#[test]
fn test_correction_clears_last_version_flag() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement(
            "CREATE TABLE account_dim (account_tk BIGINT, version INTEGER, date_from TIMESTAMP, \
             date_to TIMESTAMP, account_no VARCHAR, status VARCHAR, inserted_at TIMESTAMP, \
             updated_at TIMESTAMP, is_current BOOLEAN)",
            None,
        )
        .unwrap();

    let dim = DimensionTable::new("account_dim", "account_tk")
        .with_keys(["account_no"])
        .with_fields(["status"])
        .with_date_inserted("inserted_at")
        .with_date_updated("updated_at")
        .with_last_version("is_current");
    let open = session.profile().open_end_date();
    let keys = row(vec![Value::from_string("account_no", "AC-7")]);

    let first = session
        .dim_insert(
            &dim,
            &DimensionVersion {
                keys: &keys,
                fields: &row(vec![Value::from_string("status", "trial")]),
                technical_key: Some(1),
                previous_version: None,
                date_from: at(2024, 1, 1),
                date_to: open,
            },
        )
        .unwrap();
    let flags = session
        .get_rows("SELECT is_current, inserted_at, updated_at FROM account_dim", 0)
        .unwrap();
    assert_eq!(flags.len(), 1);
    assert!(flags[0][0].as_boolean());
    assert!(flags[0][1].as_date().is_some());
    assert_eq!(flags[0][1].as_date(), flags[0][2].as_date());

    session
        .dim_insert(
            &dim,
            &DimensionVersion {
                keys: &keys,
                fields: &row(vec![Value::from_string("status", "paying")]),
                technical_key: Some(2),
                previous_version: Some(first.version),
                date_from: at(2024, 3, 1),
                date_to: open,
            },
        )
        .unwrap();

    let history = session
        .get_rows(
            "SELECT version, is_current, date_to, inserted_at, updated_at FROM account_dim ORDER BY version",
            0,
        )
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0][0].as_integer(), 1);
    assert!(!history[0][1].as_boolean());
    assert_eq!(history[0][2].as_date(), Some(at(2024, 3, 1)));
    assert!(history[0][4].as_date() >= history[0][3].as_date());
    assert_eq!(history[1][0].as_integer(), 2);
    assert!(history[1][1].as_boolean());
    assert_eq!(history[1][2].as_date(), Some(open));
    session.disconnect();
    assert_eq!(warehouse.count("SELECT COUNT(*) FROM account_dim WHERE is_current"), 1);
}

#[test]
fn test_correction_closes_exactly_one_version() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statements(
            "CREATE SEQUENCE product_seq START 1;
             CREATE TABLE product_dim (product_tk BIGINT, version INTEGER, date_from TIMESTAMP,
                 date_to TIMESTAMP, code VARCHAR, price DOUBLE);",
        )
        .unwrap();
    assert!(session.check_sequence_exists("product_seq").unwrap());
    assert!(!session.check_sequence_exists("no_such_seq").unwrap());

    let dim = DimensionTable::new("product_dim", "product_tk")
        .with_keys(["code"])
        .with_fields(["price"]);
    let open = session.profile().open_end_date();
    let (t0, t1) = (at(2024, 1, 1), at(2024, 2, 1));

    let insert = |session: &mut ConnectionSession, code: &str, price: f64, previous: Option<i64>, from: NaiveDateTime| {
        let tk = session.next_sequence_value("product_seq", "product_tk").unwrap();
        assert_eq!(tk.kind(), ValueKind::Integer);
        session
            .dim_insert(
                &dim,
                &DimensionVersion {
                    keys: &row(vec![Value::from_string("code", code)]),
                    fields: &row(vec![Value::from_number("price", price)]),
                    technical_key: Some(tk.as_integer()),
                    previous_version: previous,
                    date_from: from,
                    date_to: open,
                },
            )
            .unwrap()
    };

    let a = insert(&mut session, "A", 10.0, None, t0);
    let b = insert(&mut session, "B", 20.0, None, t0);
    let a2 = insert(&mut session, "A", 12.5, Some(a.version), t1);
    assert_eq!((a.version, b.version, a2.version), (1, 1, 2));
    assert_eq!((a.technical_key, b.technical_key, a2.technical_key), (1, 2, 3));
    let current = session.current_sequence_value("product_seq").unwrap().unwrap();
    assert_eq!(current.as_integer(), 3);

    let closed = session
        .get_rows("SELECT code, version FROM product_dim WHERE date_to <> TIMESTAMP '2199-12-31 23:59:59'", 0)
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0][0].as_string(), "A");
    assert_eq!(closed[0][1].as_integer(), 1);

    let open_versions = session
        .get_rows("SELECT code, version FROM product_dim WHERE date_to = TIMESTAMP '2199-12-31 23:59:59' ORDER BY code", 0)
        .unwrap();
    let open_versions: Vec<(String, i64)> = open_versions
        .iter()
        .map(|r| (r[0].as_string(), r[1].as_integer()))
        .collect();
    assert_eq!(open_versions, vec![("A".to_string(), 2), ("B".to_string(), 1)]);

    session.disconnect();
}

#[test]
fn test_punch_through_rewrites_every_version() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statements(
            "CREATE TABLE store_dim (store_tk BIGINT, version INTEGER, date_from TIMESTAMP,
                 date_to TIMESTAMP, store_code VARCHAR, manager VARCHAR, region VARCHAR);
             INSERT INTO store_dim VALUES (1, 1, TIMESTAMP '2024-01-01', TIMESTAMP '2024-05-01', 'S1', 'Kim', 'North');
             INSERT INTO store_dim VALUES (2, 2, TIMESTAMP '2024-05-01', TIMESTAMP '2199-12-31 23:59:59', 'S1', 'Lee', 'North');",
        )
        .unwrap();
    let dim = DimensionTable::new("store_dim", "store_tk")
        .with_keys(["store_code"])
        .with_fields(["manager", "region"]);

    session
        .dim_punch_through(
            &dim,
            &["region"],
            &row(vec![Value::from_string("region", "East")]),
            &row(vec![Value::from_string("store_code", "S1")]),
        )
        .unwrap();
    assert_eq!(warehouse.count("SELECT count(*) FROM store_dim WHERE region = 'East'"), 2);

    session
        .dim_update(&dim, &["manager"], &row(vec![Value::from_string("manager", "Max")]), 2)
        .unwrap();
    let managers = session
        .get_rows("SELECT manager FROM store_dim ORDER BY store_tk", 0)
        .unwrap();
    let managers: Vec<String> = managers.iter().map(|r| r[0].as_string()).collect();
    assert_eq!(managers, vec!["Kim", "Max"]);

    session.disconnect();
}

#[test]
fn test_combination_lookup_matches_null_keys() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement("CREATE TABLE junk (junk_tk BIGINT, color VARCHAR, size VARCHAR)", None)
        .unwrap();
    let combi = CombinationTable::new("junk", "junk_tk", ["color", "size"]);

    let red_unsized = row(vec![
        Value::from_string("color", "red"),
        Value::new("size", ValueKind::String),
    ]);
    let red_large = row(vec![Value::from_string("color", "red"), Value::from_string("size", "L")]);
    assert_eq!(session.combi_insert(&combi, &red_unsized, Some(1), None).unwrap(), 1);
    assert_eq!(session.combi_insert(&combi, &red_large, Some(2), None).unwrap(), 2);

    session.set_combi_lookup(&combi).unwrap();
    assert_eq!(session.combi_lookup(&combi, &red_unsized, None).unwrap(), Some(1));
    assert_eq!(session.combi_lookup(&combi, &red_large, None).unwrap(), Some(2));

    let red_medium = row(vec![Value::from_string("color", "red"), Value::from_string("size", "M")]);
    assert_eq!(session.combi_lookup(&combi, &red_medium, None).unwrap(), None);
    let blue_unsized = row(vec![
        Value::from_string("color", "blue"),
        Value::new("size", ValueKind::String),
    ]);
    assert_eq!(session.combi_lookup(&combi, &blue_unsized, None).unwrap(), None);

    session.disconnect();
}

#[test]
fn test_combination_with_checksum_column() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement("CREATE TABLE flags (flag_tk BIGINT, key_crc BIGINT, promo VARCHAR, channel VARCHAR)", None)
        .unwrap();
    let combi = CombinationTable::new("flags", "flag_tk", ["promo", "channel"]).with_crc_field("key_crc");
    let keys = row(vec![Value::from_string("promo", "spring"), Value::from_string("channel", "web")]);

    session.combi_insert(&combi, &keys, Some(7), None).unwrap();
    let stored = session.get_one_row("SELECT key_crc FROM flags").unwrap().unwrap();
    assert_eq!(stored[0].as_integer(), kiln_db::natural_key_crc(&keys));

    session.set_combi_lookup(&combi).unwrap();
    assert_eq!(session.combi_lookup(&combi, &keys, None).unwrap(), Some(7));
    let other = row(vec![Value::from_string("promo", "spring"), Value::from_string("channel", "store")]);
    assert_eq!(session.combi_lookup(&combi, &other, None).unwrap(), None);

    session.disconnect();
}

#[test]
fn test_commit_every_three_rows() {
    let warehouse = Warehouse::new();
    let mut setup = warehouse.session();
    setup
        .exec_statement("CREATE TABLE facts (id BIGINT, amount DOUBLE)", None)
        .unwrap();
    setup.disconnect();

    let mut writer = warehouse.session();
    writer.set_commit(3);
    assert!(!writer.is_auto_commit());

    let shape = row(vec![Value::from_integer("id", 0), Value::from_number("amount", 0.0)]);
    writer.prepare_insert("facts", &shape).unwrap();
    for id in 1..=7 {
        let r = row(vec![Value::from_integer("id", id), Value::from_number("amount", id as f64 * 1.5)]);
        writer.set_values_insert(&r).unwrap();
        writer.insert_row(StatementSlot::Insert, true).unwrap();
        if id % 3 == 0 {
            assert_eq!(writer.batch_counter(), 0);
            assert_eq!(warehouse.count("SELECT count(*) FROM facts"), id);
        }
    }
    assert_eq!(writer.batch_counter(), 1);
    assert_eq!(writer.written_count(), 7);
    assert_eq!(warehouse.count("SELECT count(*) FROM facts"), 6);

    writer.insert_finished(true).unwrap();
    assert!(!writer.is_prepared(StatementSlot::Insert));
    assert_eq!(warehouse.count("SELECT count(*) FROM facts"), 7);
    writer.disconnect();
}

#[test]
fn test_batch_failure_reports_applied_rows() {
    let warehouse = Warehouse::new();
    let mut setup = warehouse.session();
    setup
        .exec_statement("CREATE TABLE codes (id INTEGER PRIMARY KEY)", None)
        .unwrap();
    setup.disconnect();

    let mut writer = warehouse.session();
    writer.set_commit(10);
    let shape = row(vec![Value::from_integer("id", 0)]);
    writer.prepare_insert("codes", &shape).unwrap();
    for id in [1, 2, 2, 3] {
        writer.set_values_insert(&row(vec![Value::from_integer("id", id)])).unwrap();
        writer.insert_row(StatementSlot::Insert, true).unwrap();
    }

    let err = writer.insert_finished(true).unwrap_err();
    assert!(matches!(err, DatabaseError::BatchPartialFailure { .. }));
    assert_eq!(err.success_count(), Some(2));

    writer.rollback().unwrap();
    writer.disconnect();
    assert_eq!(warehouse.count("SELECT count(*) FROM codes"), 0);
}

#[test]
fn test_counters_shared_between_sessions() {
    let warehouse = Warehouse::new();
    let mut setup = warehouse.session();
    setup
        .exec_statements("CREATE TABLE orders (order_tk BIGINT); INSERT INTO orders VALUES (10);")
        .unwrap();
    setup.disconnect();

    let counters = Arc::new(KeyCounters::new());
    let mut a = warehouse.session().with_counters(Arc::clone(&counters));
    let mut b = warehouse.session().with_counters(Arc::clone(&counters));

    assert_eq!(a.next_counter_value("orders", "order_tk").unwrap(), 11);
    assert_eq!(b.next_counter_value("orders", "order_tk").unwrap(), 12);
    assert_eq!(a.next_counter_value("orders", "order_tk").unwrap(), 13);

    // A run of its own starts again from the table.
    let mut c = warehouse.session();
    assert_eq!(c.next_counter_value("orders", "order_tk").unwrap(), 11);

    a.disconnect();
    b.disconnect();
    c.disconnect();
}

#[test]
fn test_unknown_dimension_row_inserted_once() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement(
            "CREATE TABLE region_dim (region_tk BIGINT, version INTEGER, date_from TIMESTAMP, \
             date_to TIMESTAMP, region VARCHAR)",
            None,
        )
        .unwrap();
    let dim = DimensionTable::new("region_dim", "region_tk").with_keys(["region"]);

    session.check_dim_zero(&dim, false).unwrap();
    session.check_dim_zero(&dim, false).unwrap();
    session.disconnect();

    assert_eq!(warehouse.count("SELECT count(*) FROM region_dim"), 1);
    assert_eq!(
        warehouse.count("SELECT count(*) FROM region_dim WHERE region_tk = 0 AND version = 1"),
        1
    );
}

#[test]
fn test_keyed_lookup_update_and_delete() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement("CREATE TABLE customers (id BIGINT, name VARCHAR, city VARCHAR)", None)
        .unwrap();
    for (id, name, city) in [(1, "Ann", "Ghent"), (2, "Bob", "Bruges"), (3, "Cas", "Ypres")] {
        session
            .insert_into(
                "customers",
                &row(vec![
                    Value::from_integer("id", id),
                    Value::from_string("name", name),
                    Value::from_string("city", city),
                ]),
            )
            .unwrap();
    }

    session
        .set_lookup(
            "customers",
            &[LookupKey::equal("id")],
            &[ReturnColumn::new("name"), ReturnColumn::renamed("city", "town")],
            None,
            false,
        )
        .unwrap();
    session.set_values_lookup(&row(vec![Value::from_integer("id", 2)])).unwrap();
    let found = session.get_lookup(false).unwrap().unwrap();
    assert_eq!(found.field_names(), vec!["name", "town"]);
    assert_eq!(found.search_value("town").unwrap().as_string(), "Bruges");

    session.prepare_update("customers", &[LookupKey::equal("id")], &["city"]).unwrap();
    session
        .set_values_update(&row(vec![Value::from_string("city", "Leuven"), Value::from_integer("id", 2)]))
        .unwrap();
    session.update_row().unwrap();
    let found = session.get_lookup(false).unwrap().unwrap();
    assert_eq!(found[1].as_string(), "Leuven");

    session.prepare_delete("customers", &[LookupKey::equal("id")]).unwrap();
    session.set_values_update(&row(vec![Value::from_integer("id", 3)])).unwrap();
    session.update_row().unwrap();

    let first = session.get_first_rows("customers", 5).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(session.get_first_rows("customers", 1).unwrap().len(), 1);
    session.disconnect();
}

#[test]
fn test_script_counts_and_metadata_cache() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    let result = session
        .exec_statements(
            "CREATE TABLE items (n INTEGER, label VARCHAR);
             INSERT INTO items VALUES (1, 'one');
             INSERT INTO items VALUES (2, 'two; with a semicolon');
             UPDATE items SET n = n + 10;
             SELECT * FROM items;
             DELETE FROM items WHERE n = 12;",
        )
        .unwrap();
    assert_eq!(result.lines_output, 2);
    assert_eq!(result.lines_updated, 2);
    assert_eq!(result.lines_read, 2);
    assert_eq!(result.lines_deleted, 1);

    let fields = session.table_fields("items").unwrap();
    assert_eq!(fields.field_names(), vec!["n", "label"]);
    assert_eq!(fields[0].kind(), ValueKind::Integer);
    assert_eq!(fields[1].kind(), ValueKind::String);
    let probe = session.profile().sql_query_fields("items");
    assert!(session.cached_query_fields(&probe).is_some());

    session
        .exec_statement("ALTER TABLE items ADD COLUMN added DATE", None)
        .unwrap();
    assert!(session.cached_query_fields(&probe).is_none());
    let fields = session.table_fields("items").unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[2].kind(), ValueKind::Date);
    assert!(fields[2].is_date_only());

    session.disconnect();
    assert!(matches!(
        session.query_fields(&probe),
        Err(DatabaseError::NotConnected { .. })
    ));
    assert!(session.cached_query_fields(&probe).is_some());
}

#[test]
fn test_ddl_creates_then_alters() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    let fields = row(vec![
        Value::new("id", ValueKind::Integer).with_length(9, 0),
        Value::new("label", ValueKind::String).with_length(40, -1),
    ]);

    let create = session.ddl("labels", &fields, None, false, None, false).unwrap();
    assert!(create.starts_with("CREATE TABLE"));
    session.exec_statement(&create, None).unwrap();
    assert!(session.check_table_exists("labels").unwrap());
    assert!(!session.check_table_exists("no_such_table").unwrap());

    let mut wider = fields.clone();
    wider.push(Value::new("score", ValueKind::Number).with_length(10, 2));
    let alter = session.ddl("labels", &wider, None, false, None, true).unwrap();
    assert!(alter.contains("ADD COLUMN score"));
    session.exec_statements(&alter).unwrap();
    assert_eq!(session.table_fields("labels").unwrap().len(), 3);
    session.disconnect();
}

#[test]
fn test_catalog_listing() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statements(
            "CREATE SCHEMA staging;
             CREATE TABLE orders (id INTEGER, customer VARCHAR, placed TIMESTAMP);
             CREATE TABLE staging.raw_orders (payload VARCHAR);
             CREATE VIEW open_orders AS SELECT id FROM orders;",
        )
        .unwrap();

    assert_eq!(session.get_tables(Some("main")).unwrap(), vec!["orders"]);
    assert_eq!(session.get_tables(Some("staging")).unwrap(), vec!["raw_orders"]);
    let all = session.get_tables(None).unwrap();
    assert!(all.contains(&"orders".to_string()));
    assert!(all.contains(&"raw_orders".to_string()));
    assert!(!all.contains(&"open_orders".to_string()));
    assert_eq!(session.get_views(Some("main")).unwrap(), vec!["open_orders"]);

    let schemas = session.get_schemas().unwrap();
    assert!(schemas.contains(&"main".to_string()));
    assert!(schemas.contains(&"staging".to_string()));
    assert!(session.get_catalogs().unwrap().contains(&"warehouse".to_string()));

    assert!(matches!(
        session.get_synonyms(None),
        Err(DatabaseError::UnsupportedFeature { feature, .. }) if feature == "synonyms"
    ));
    session.disconnect();
}

#[test]
fn test_index_and_column_checks() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session
        .exec_statement("CREATE TABLE orders (id INTEGER, customer VARCHAR, placed TIMESTAMP)", None)
        .unwrap();
    assert!(!session.check_index_exists("orders", &["customer"]).unwrap());

    let index = session
        .profile()
        .create_index_statement("orders", "idx_orders_customer", &["customer", "placed"], false, false, false, false);
    session.exec_statement(&index, None).unwrap();
    assert!(session.check_index_exists("orders", &["customer"]).unwrap());
    assert!(session.check_index_exists("ORDERS", &["PLACED", "customer"]).unwrap());
    assert!(!session.check_index_exists("orders", &["customer", "id"]).unwrap());

    assert!(session.check_column_exists("orders", "placed").unwrap());
    assert!(!session.check_column_exists("orders", "shipped").unwrap());
    assert!(!session.check_column_exists("no_such_table", "id").unwrap());
    session.disconnect();
}

#[test]
fn test_cancelled_query_leaves_session_usable() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session.open_query("SELECT * FROM range(100)", None).unwrap();
    assert!(session.get_row().unwrap().is_some());

    let cancel = session.cancel_handle().unwrap();
    std::thread::spawn(move || cancel.cancel().unwrap()).join().unwrap();
    assert!(session.get_row().is_err());

    let answer = session.get_one_row("SELECT 42 AS answer").unwrap().unwrap();
    assert_eq!(answer[0].as_integer(), 42);
    session.disconnect();
}

#[test]
fn test_row_limit_caps_queries() {
    let warehouse = Warehouse::new();
    let mut session = warehouse.session();
    session.set_row_limit(5);
    let rows = session.get_rows("SELECT * FROM range(50)", 0).unwrap();
    assert_eq!(rows.len(), 5);
    session.disconnect();
}
