//! Property tests for value binding and row materialization.

use chrono::NaiveDate;
use kiln_db::driver::{ColumnMeta, MemoryResultSet, SqlParam, SqlType};
use kiln_db::{clob_tail, read_row, to_param};
use kiln_dialect::{Capabilities, DatabaseType, DialectProfile};
use kiln_value::{Row, Value, ValueKind, CLOB_LENGTH};
use proptest::prelude::*;
use proptest::sample::select;
use rust_decimal::Decimal;

fn arb_database_type() -> impl Strategy<Value = DatabaseType> {
    select(DatabaseType::all().collect::<Vec<_>>())
}

/// A value of any kind carrying a non-default payload.
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,40}".prop_map(|s| Value::from_string("v", s)),
        any::<i64>().prop_map(|n| Value::from_integer("v", n)),
        (-1e9f64..1e9).prop_map(|n| Value::from_number("v", n)),
        (any::<i64>(), 0u32..10).prop_map(|(n, scale)| Value::from_big_number("v", Decimal::new(n, scale))),
        (0i64..4_000_000_000).prop_map(|secs| {
            let base = NaiveDate::from_ymd_opt(1900, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default();
            Value::from_date("v", base + chrono::Duration::seconds(secs))
        }),
        any::<bool>().prop_map(|b| Value::from_boolean("v", b)),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(|b| Value::from_binary("v", b)),
    ]
}

fn column_for(kind: ValueKind) -> ColumnMeta {
    let sql_type = match kind {
        ValueKind::String | ValueKind::None => SqlType::Varchar,
        ValueKind::Integer => SqlType::Bigint,
        ValueKind::Number => SqlType::Double,
        ValueKind::BigNumber => SqlType::Decimal,
        ValueKind::Date => SqlType::Timestamp,
        ValueKind::Boolean => SqlType::Boolean,
        ValueKind::Binary => SqlType::Binary,
    };
    ColumnMeta::new("v", sql_type)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Property: a null value reads back null whatever payload it carried
    #[test]
    fn prop_null_survives_round_trip(t in arb_database_type(), value in arb_value()) {
        let profile = DialectProfile::new("p", t);
        let mut value = value;
        value.set_null();

        let param = to_param(&profile, &value);
        prop_assert!(param.is_null());

        let mut rs = MemoryResultSet::new(vec![column_for(value.kind())], vec![vec![param.into_value()]]);
        prop_assert!(kiln_db::driver::ResultSet::next(&mut rs).unwrap());
        let shape: Row = vec![value.clone()].into();
        let read = read_row(&profile, &shape, &mut rs).unwrap();
        prop_assert!(read[0].is_null());
        prop_assert_eq!(read[0].kind(), value.kind());
    }

    /// Property: non-null values never bind as SQL NULL
    #[test]
    fn prop_non_null_binds_a_value(t in arb_database_type(), value in arb_value()) {
        let profile = DialectProfile::new("p", t);
        prop_assert!(!to_param(&profile, &value).is_null());
    }

    /// Property: the CLOB tail keeps the last characters and never more than asked
    #[test]
    fn prop_clob_tail_keeps_the_end(text in ".{0,200}", max in 0usize..250) {
        let tail = clob_tail(&text, max);
        prop_assert_eq!(tail.chars().count(), text.chars().count().min(max));
        prop_assert!(text.ends_with(tail));
    }

    /// Property: large text binds as its tail, cut to the connection's text limit
    #[test]
    fn prop_large_text_is_tail_truncated(t in arb_database_type(), text in "[a-zA-Z]{0,300}", limit in 1i32..200) {
        let base = DialectProfile::new("p", t);
        let capabilities = Capabilities {
            max_text_field_length: limit,
            ..base.capabilities().clone()
        };
        let profile = base.with_capabilities(capabilities);
        let value = Value::from_string("memo", text.clone()).with_length(CLOB_LENGTH, -1);

        let bound = match to_param(&profile, &value) {
            SqlParam::CharStream(s) => {
                prop_assert!(profile.supports_set_character_stream());
                s
            }
            SqlParam::String(s) => {
                prop_assert!(!profile.supports_set_character_stream());
                s
            }
            other => return Err(TestCaseError::fail(format!("unexpected parameter {:?}", other))),
        };
        prop_assert_eq!(bound.len(), text.len().min(limit as usize));
        prop_assert!(text.ends_with(&bound));
    }
}
