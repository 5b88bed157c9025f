use cellar_engine::{parse_filters, CollectionDef, Column, ColumnType, Dialect, Operator};

fn orders_collection() -> CollectionDef {
    let mut total = Column::new("total", ColumnType::Decimal);
    total.nullable = false;
    let mut status = Column::new("status", ColumnType::String);
    status.nullable = false;
    CollectionDef::new("orders", vec![total, status])
}

#[test]
fn eq_shorthand_parses_as_eq() {
    let collection = orders_collection();
    let params = vec![("status".to_string(), "paid".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].operator, Operator::Eq);
    assert_eq!(conditions[0].field, "status");
}

#[test]
fn numeric_filter_coerces_through_same_path_aggregation_uses() {
    // This is the regression test for the historical aggregation bug: a
    // numeric comparison against a decimal column must come out as a
    // Decimal-tagged value, not a bare string, regardless of which endpoint
    // calls parse_filters.
    let collection = orders_collection();
    let params = vec![("total[gt]".to_string(), "150.00".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].operator, Operator::Gt);
    match &conditions[0].values[0] {
        cellar_engine::ScannedValue::Decimal(s) => assert_eq!(s, "150.00"),
        other => panic!("expected Decimal, got {other:?}"),
    }
}

#[test]
fn unknown_field_is_rejected() {
    let collection = orders_collection();
    let params = vec![("bogus".to_string(), "1".to_string())];
    let err = parse_filters(&params, &collection, Dialect::Sqlite).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn reserved_params_are_skipped() {
    let collection = orders_collection();
    let params = vec![("limit".to_string(), "10".to_string()), ("status".to_string(), "paid".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert_eq!(conditions.len(), 1);
}

#[test]
fn in_operator_splits_on_comma() {
    let collection = orders_collection();
    let params = vec![("status[in]".to_string(), "paid,pending,refunded".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert_eq!(conditions[0].values.len(), 3);
}

#[test]
fn null_operator_accepts_boolean_polarity() {
    let collection = orders_collection();
    let params = vec![("status[null]".to_string(), "true".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert!(conditions[0].null_polarity);

    let collection = orders_collection();
    let params = vec![("status[null]".to_string(), "false".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    assert!(!conditions[0].null_polarity);
}

#[test]
fn id_field_is_always_string_typed_without_a_declared_column() {
    let collection = orders_collection();
    let params = vec![("id".to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string())];
    let conditions = parse_filters(&params, &collection, Dialect::Sqlite).unwrap();
    match &conditions[0].values[0] {
        cellar_engine::ScannedValue::String(_) => {}
        other => panic!("expected String, got {other:?}"),
    }
}

#[test]
fn bad_numeric_value_reports_field_operator_and_value() {
    let collection = orders_collection();
    let params = vec![("total[gte]".to_string(), "not-a-number".to_string())];
    let err = parse_filters(&params, &collection, Dialect::Sqlite).unwrap_err();
    assert_eq!(err.status_code(), 400);
}
