use cellar_engine::{CollectionDef, Column, ColumnType, Condition, Dialect, Operator, QueryBuilder, ScannedValue};
use cellar_engine::query_builder::AggregateOp;

fn widgets() -> CollectionDef {
    let mut name = Column::new("name", ColumnType::String);
    name.nullable = false;
    let price = Column::new("price", ColumnType::Float);
    CollectionDef::new("widgets", vec![name, price])
}

fn eq_condition(field: &str, value: ScannedValue) -> Condition {
    Condition { field: field.to_string(), operator: Operator::Eq, null_polarity: true, values: vec![value] }
}

#[test]
fn create_table_prepends_system_columns_sqlite() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let sql = qb.create_table(&widgets());
    assert!(sql.starts_with("CREATE TABLE widgets ("));
    assert!(sql.contains("rowid INTEGER PRIMARY KEY AUTOINCREMENT"));
    assert!(sql.contains("id TEXT NOT NULL UNIQUE"));
    assert!(sql.contains("name TEXT NOT NULL"));
}

#[test]
fn create_table_postgres_uses_serial_and_quoted_identifiers() {
    let qb = QueryBuilder::new(Dialect::Postgres);
    let sql = qb.create_table(&widgets());
    assert!(sql.contains("\"rowid\" SERIAL PRIMARY KEY"));
    assert!(sql.contains("\"id\" VARCHAR(255) NOT NULL UNIQUE"));
}

#[test]
fn create_table_mysql_uses_backticks_and_autoincrement() {
    let qb = QueryBuilder::new(Dialect::MySql);
    let sql = qb.create_table(&widgets());
    assert!(sql.contains("`rowid` INT AUTO_INCREMENT PRIMARY KEY"));
}

#[test]
fn select_uses_numbered_placeholders_on_postgres() {
    let qb = QueryBuilder::new(Dialect::Postgres);
    let conditions = vec![eq_condition("name", ScannedValue::String("anvil".into()))];
    let (sql, _args) = qb.select("widgets", &[], &conditions, &[], Some(10), Some(0));
    assert!(sql.contains("WHERE \"name\" = $1"));
    assert!(sql.contains("LIMIT $2"));
    assert!(sql.contains("OFFSET $3"));
}

#[test]
fn select_uses_question_mark_placeholders_on_sqlite() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let conditions = vec![eq_condition("name", ScannedValue::String("anvil".into()))];
    let (sql, _args) = qb.select("widgets", &[], &conditions, &[], None, None);
    assert!(sql.contains("WHERE name = ?"));
}

#[test]
fn update_rejects_empty_assignments() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let conditions = vec![eq_condition("name", ScannedValue::String("anvil".into()))];
    let err = qb.update("widgets", &[], &conditions).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn update_rejects_empty_conditions() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let assignments = vec![("price".to_string(), ScannedValue::Float(9.99))];
    let err = qb.update("widgets", &assignments, &[]).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn delete_rejects_empty_conditions() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let err = qb.delete("widgets", &[]).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn aggregate_count_ignores_field() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let (sql, _args) = qb.aggregate("widgets", AggregateOp::Count, None, false, &[]).unwrap();
    assert!(sql.contains("COUNT(*)"));
}

#[test]
fn aggregate_sum_requires_numeric_field() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let err = qb.aggregate("widgets", AggregateOp::Sum, Some("name"), false, &[]).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn aggregate_sum_on_numeric_field_succeeds() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let (sql, _args) = qb.aggregate("widgets", AggregateOp::Sum, Some("price"), true, &[]).unwrap();
    assert!(sql.contains("SUM(price)"));
}

#[test]
fn in_condition_expands_to_one_placeholder_per_value() {
    let qb = QueryBuilder::new(Dialect::Postgres);
    let condition =
        Condition { field: "name".into(), operator: Operator::In, null_polarity: true, values: vec![
            ScannedValue::String("a".into()),
            ScannedValue::String("b".into()),
            ScannedValue::String("c".into()),
        ]};
    let (sql, _args) = qb.select("widgets", &[], &[condition], &[], None, None);
    assert!(sql.contains("IN ($1, $2, $3)"));
}

#[test]
fn sqlite_drop_column_emits_table_rebuild() {
    let qb = QueryBuilder::new(Dialect::Sqlite);
    let statements = qb.alter_drop_column(&widgets(), "price");
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("CREATE TABLE"));
    assert!(statements[1].starts_with("INSERT INTO"));
    assert!(statements[2].starts_with("DROP TABLE"));
    assert!(statements[3].contains("RENAME TO"));
}

#[test]
fn postgres_drop_column_is_a_single_statement() {
    let qb = QueryBuilder::new(Dialect::Postgres);
    let statements = qb.alter_drop_column(&widgets(), "price");
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("DROP COLUMN"));
}
