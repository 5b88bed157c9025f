//! # Collection Service
//!
//! Sits between the Registry/Query Builder/Filter Parser and HTTP Dispatch:
//! turns a validated collection definition plus a caller's parameters into
//! the CRUD and aggregation operations the HTTP surface exposes, and turns
//! the resulting rows back into JSON. Used uniformly for user-defined
//! collections and for the three system collections (`users`, `apikeys`,
//! `collections`) — the same marshalling code serves both, only the
//! `CollectionDef` passed in differs.

use serde_json::{Map, Value};
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::collection::{new_record_id, CollectionDef, ID_COLUMN};
use crate::database::{Database, Dialect};
use crate::errors::Error;
use crate::filter::Condition;
use crate::query_builder::{AggregateOp, OrderField, QueryBuilder};
use crate::value_binding::{coerce_json, ScannedValue};

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub limit: i64,
    pub after: Option<String>,
    pub order: Vec<OrderField>,
    pub fields: Vec<String>,
    pub filters: Vec<Condition>,
    pub want_total: bool,
}

#[derive(Clone, Debug)]
pub struct ListResult {
    pub data: Vec<Value>,
    pub next_cursor: Option<String>,
    pub total: Option<i64>,
}

/// Lists records with keyset pagination: `WHERE id > :after` (or `<` when
/// the primary sort is descending) rather than an `OFFSET`, so paging stays
/// correct under concurrent writes.
pub async fn list(db: &Database, def: &CollectionDef, mut query: ListQuery) -> Result<ListResult, Error> {
    let qb = QueryBuilder::new(db.dialect());
    let descending_primary = query.order.first().map(|o| o.descending).unwrap_or(false);

    let mut conditions = query.filters.clone();
    if let Some(after) = &query.after {
        conditions.push(Condition {
            field: ID_COLUMN.to_string(),
            operator: if descending_primary { crate::filter::Operator::Lt } else { crate::filter::Operator::Gt },
            null_polarity: true,
            values: vec![ScannedValue::String(after.clone())],
        });
    }

    if query.order.is_empty() {
        query.order.push(OrderField { field: ID_COLUMN.to_string(), descending: false });
    }

    let limit = query.limit.clamp(1, 200);
    let (sql, args) = qb.select(&def.name, &query.fields, &conditions, &query.order, Some(limit + 1), None);
    let rows = db.query(&sql, args).await?;

    let has_more = rows.len() as i64 > limit;
    let page: Vec<&AnyRow> = rows.iter().take(limit as usize).collect();
    let data: Vec<Value> = page.iter().map(|r| row_to_json(r, def, db.dialect())).collect::<Result<_, _>>()?;
    let next_cursor = if has_more {
        page.last().and_then(|r| r.try_get::<String, _>(ID_COLUMN).ok())
    } else {
        None
    };

    let total = if query.want_total {
        let (count_sql, count_args) = qb.aggregate(&def.name, AggregateOp::Count, None, false, &query.filters)?;
        let row = db.query_row(&count_sql, count_args).await?;
        Some(row.map(|r| r.try_get::<i64, _>("value").unwrap_or(0)).unwrap_or(0))
    } else {
        None
    };

    Ok(ListResult { data, next_cursor, total })
}

pub async fn get(db: &Database, def: &CollectionDef, id: &str) -> Result<Option<Value>, Error> {
    let qb = QueryBuilder::new(db.dialect());
    let condition = Condition { field: ID_COLUMN.to_string(), operator: crate::filter::Operator::Eq, null_polarity: true, values: vec![ScannedValue::String(id.to_string())] };
    let (sql, args) = qb.select(&def.name, &[], &[condition], &[], Some(1), None);
    let row = db.query_row(&sql, args).await?;
    row.map(|r| row_to_json(&r, def, db.dialect())).transpose()
}

/// Inserts a new record. Every declared column must be present in `payload`
/// unless it is nullable or carries a default; the implicit `id` is always
/// server-assigned.
pub async fn create(db: &Database, def: &CollectionDef, payload: &Map<String, Value>) -> Result<Value, Error> {
    let qb = QueryBuilder::new(db.dialect());
    let id = new_record_id();

    let mut columns = vec![ID_COLUMN.to_string()];
    let mut values = vec![ScannedValue::String(id.clone())];

    for col in &def.columns {
        let provided = payload.get(&col.name);
        let scanned = match (provided, &col.default_value) {
            (Some(v), _) => coerce_json(v, col.column_type, db.dialect())?,
            (None, Some(default)) => crate::value_binding::coerce(default, col.column_type, db.dialect())?,
            (None, None) if col.nullable => ScannedValue::Null,
            (None, None) => return Err(Error::validation(format!("column '{}' is required", col.name))),
        };
        if matches!(scanned, ScannedValue::Null) && !col.nullable {
            return Err(Error::validation(format!("column '{}' cannot be null", col.name)));
        }
        columns.push(col.name.clone());
        values.push(scanned);
    }

    let (sql, args) = qb.insert(&def.name, &columns, &values);
    db.exec(&sql, args).await?;

    get(db, def, &id).await?.ok_or_else(|| Error::Internal("inserted record vanished before it could be read back".into()))
}

/// Updates a record by id. Only columns present in `payload` are touched.
pub async fn update(db: &Database, def: &CollectionDef, id: &str, payload: &Map<String, Value>) -> Result<Value, Error> {
    let mut assignments = Vec::new();
    for col in &def.columns {
        if let Some(value) = payload.get(&col.name) {
            let scanned = coerce_json(value, col.column_type, db.dialect())?;
            if matches!(scanned, ScannedValue::Null) && !col.nullable {
                return Err(Error::validation(format!("column '{}' cannot be null", col.name)));
            }
            assignments.push((col.name.clone(), scanned));
        }
    }
    if assignments.is_empty() {
        return Err(Error::bad_request("update payload does not touch any declared column"));
    }

    let qb = QueryBuilder::new(db.dialect());
    let condition = Condition { field: ID_COLUMN.to_string(), operator: crate::filter::Operator::Eq, null_polarity: true, values: vec![ScannedValue::String(id.to_string())] };
    let (sql, args) = qb.update(&def.name, &assignments, &[condition])?;
    let affected = db.exec(&sql, args).await?;
    if affected == 0 {
        return Err(Error::not_found(format!("record '{id}' not found")));
    }

    get(db, def, id).await?.ok_or_else(|| Error::Internal("updated record vanished before it could be read back".into()))
}

pub async fn destroy(db: &Database, def: &CollectionDef, id: &str) -> Result<(), Error> {
    let qb = QueryBuilder::new(db.dialect());
    let condition = Condition { field: ID_COLUMN.to_string(), operator: crate::filter::Operator::Eq, null_polarity: true, values: vec![ScannedValue::String(id.to_string())] };
    let (sql, args) = qb.delete(&def.name, &[condition])?;
    let affected = db.exec(&sql, args).await?;
    if affected == 0 {
        return Err(Error::not_found(format!("record '{id}' not found")));
    }
    Ok(())
}

/// Runs an aggregation, reusing exactly the same filter-condition list the
/// list endpoint would have used — this is the fix for the historical bug
/// where aggregation took filter values as raw strings.
pub async fn aggregate(
    db: &Database,
    def: &CollectionDef,
    op: AggregateOp,
    field: Option<&str>,
    filters: &[Condition],
) -> Result<Value, Error> {
    let field_is_numeric = field.and_then(|f| def.column(f)).map(|c| c.column_type.is_numeric()).unwrap_or(false);
    let qb = QueryBuilder::new(db.dialect());
    let (sql, args) = qb.aggregate(&def.name, op, field, field_is_numeric, filters)?;
    let row = db.query_row(&sql, args).await?;
    let value = match row {
        None => Value::Null,
        Some(r) => match op {
            AggregateOp::Count => Value::from(r.try_get::<i64, _>("value").unwrap_or(0)),
            _ => r
                .try_get::<f64, _>("value")
                .map(Value::from)
                .unwrap_or(Value::Null),
        },
    };
    Ok(serde_json::json!({ "value": value }))
}

fn row_to_json(row: &AnyRow, def: &CollectionDef, dialect: Dialect) -> Result<Value, Error> {
    let mut map = Map::new();
    let id: String = row.try_get(ID_COLUMN).map_err(Error::Database)?;
    map.insert("id".to_string(), Value::String(id));

    for col in &def.columns {
        let value = scalar_to_json(row, &col.name, col.column_type, dialect)?;
        map.insert(col.name.clone(), value);
    }

    Ok(Value::Object(map))
}

fn scalar_to_json(row: &AnyRow, name: &str, column_type: crate::types::ColumnType, dialect: Dialect) -> Result<Value, Error> {
    use crate::types::ColumnType;
    match column_type {
        ColumnType::String | ColumnType::Text | ColumnType::Decimal | ColumnType::Datetime => {
            let v: Option<String> = row.try_get(name).map_err(Error::Database)?;
            Ok(v.map(Value::String).unwrap_or(Value::Null))
        }
        ColumnType::Json => {
            let v: Option<String> = row.try_get(name).map_err(Error::Database)?;
            Ok(match v {
                Some(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
                None => Value::Null,
            })
        }
        ColumnType::Integer => {
            let v: Option<i64> = row.try_get(name).map_err(Error::Database)?;
            Ok(v.map(Value::from).unwrap_or(Value::Null))
        }
        ColumnType::Float => {
            let v: Option<f64> = row.try_get(name).map_err(Error::Database)?;
            Ok(v.map(Value::from).unwrap_or(Value::Null))
        }
        ColumnType::Boolean => match dialect {
            Dialect::Sqlite => {
                let v: Option<i64> = row.try_get(name).map_err(Error::Database)?;
                Ok(v.map(|n| Value::Bool(n != 0)).unwrap_or(Value::Null))
            }
            Dialect::Postgres | Dialect::MySql => {
                let v: Option<bool> = row.try_get(name).map_err(Error::Database)?;
                Ok(v.map(Value::Bool).unwrap_or(Value::Null))
            }
        },
    }
}
