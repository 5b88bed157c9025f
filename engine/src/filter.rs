//! # Filter Parser Module
//!
//! Transforms the `?field[op]=value&…` query surface into a normalized list
//! of [`Condition`]s, shared unchanged by the list, get, and every
//! aggregation endpoint. This sharing is what the spec's known defect
//! (§4.3) is about: aggregation used to take filter values as raw strings
//! instead of routing them through the same coercion path as `list`, so a
//! numeric filter against `sum`/`avg`/`count` silently matched nothing. A
//! correct implementation has exactly one function that turns a query
//! string into conditions, and every endpoint calls it.

use std::fmt;

use crate::collection::CollectionDef;
use crate::column::Column;
use crate::database::Dialect;
use crate::errors::{Error, FilterError};
use crate::value_binding::{coerce, ScannedValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    Nin,
    Null,
}

impl Operator {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "in" => Operator::In,
            "nin" => Operator::Nin,
            "null" => Operator::Null,
            _ => return None,
        })
    }

    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Null => "null",
        }
    }

    /// The SQL fragment this operator contributes, given the number of
    /// placeholders it needs (relevant only for `in`/`nin`).
    pub fn sql_fragment(&self, placeholder_count: usize, placeholder: &dyn Fn(usize) -> String) -> String {
        match self {
            Operator::Eq => format!("= {}", placeholder(0)),
            Operator::Ne => format!("!= {}", placeholder(0)),
            Operator::Gt => format!("> {}", placeholder(0)),
            Operator::Gte => format!(">= {}", placeholder(0)),
            Operator::Lt => format!("< {}", placeholder(0)),
            Operator::Lte => format!("<= {}", placeholder(0)),
            Operator::Like => format!("LIKE {}", placeholder(0)),
            Operator::In => {
                let slots: Vec<String> = (0..placeholder_count).map(placeholder).collect();
                format!("IN ({})", slots.join(", "))
            }
            Operator::Nin => {
                let slots: Vec<String> = (0..placeholder_count).map(placeholder).collect();
                format!("NOT IN ({})", slots.join(", "))
            }
            Operator::Null => unreachable!("IS [NOT] NULL is rendered by the caller, it binds no placeholders"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One normalized, typed filter condition.
#[derive(Clone, Debug)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    /// `IS NULL` when `true`, `IS NOT NULL` when `false`. Only meaningful
    /// for [`Operator::Null`].
    pub null_polarity: bool,
    pub values: Vec<ScannedValue>,
}

/// Parses the `field[op]=value` query surface into a list of conditions,
/// ANDed together. `field` may be `id` (always string-typed) or any declared
/// column; anything else is a bad request.
pub fn parse_filters(
    params: &[(String, String)],
    collection: &CollectionDef,
    dialect: Dialect,
) -> Result<Vec<Condition>, Error> {
    let mut conditions = Vec::new();
    for (key, raw_value) in params {
        if is_reserved_param(key) {
            continue;
        }
        let (field, operator) = split_key(key);
        let column = resolve_column(collection, &field)
            .ok_or_else(|| Error::BadRequest(format!("unknown filter field '{field}'")))?;

        let condition = build_condition(&field, operator, raw_value, column, dialect)?;
        conditions.push(condition);
    }
    Ok(conditions)
}

fn is_reserved_param(key: &str) -> bool {
    matches!(key, "limit" | "after" | "order" | "fields" | "schema" | "count")
}

/// Splits `field[op]` into `(field, op)`; bare `field` is shorthand for `eq`.
fn split_key(key: &str) -> (String, &'static str) {
    if let Some(open) = key.find('[') {
        if let Some(close) = key.find(']') {
            if close > open {
                let field = key[..open].to_string();
                let op = &key[open + 1..close];
                let token = match op {
                    "eq" => "eq",
                    "ne" => "ne",
                    "gt" => "gt",
                    "gte" => "gte",
                    "lt" => "lt",
                    "lte" => "lte",
                    "like" => "like",
                    "in" => "in",
                    "nin" => "nin",
                    "null" => "null",
                    _ => "eq",
                };
                return (field, token);
            }
        }
    }
    (key.to_string(), "eq")
}

fn resolve_column<'a>(collection: &'a CollectionDef, field: &str) -> Option<IdOrColumn<'a>> {
    if field == "id" {
        return Some(IdOrColumn::Id);
    }
    collection.column(field).map(IdOrColumn::Column)
}

enum IdOrColumn<'a> {
    Id,
    Column(&'a Column),
}

fn build_condition(
    field: &str,
    op_token: &'static str,
    raw_value: &str,
    column: IdOrColumn<'_>,
    dialect: Dialect,
) -> Result<Condition, Error> {
    let operator = Operator::from_token(op_token)
        .ok_or_else(|| Error::BadRequest(format!("unknown filter operator '{op_token}'")))?;

    let coerce_one = |raw: &str| -> Result<ScannedValue, Error> {
        match &column {
            IdOrColumn::Id => Ok(ScannedValue::String(raw.to_string())),
            IdOrColumn::Column(c) => coerce(raw, c.column_type, dialect)
                .map_err(|_| FilterError::new(field, op_token, raw).into_bad_request()),
        }
    };

    match operator {
        Operator::Null => {
            let polarity = match raw_value {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(FilterError::new(field, op_token, raw_value).into_bad_request()),
            };
            Ok(Condition { field: field.to_string(), operator, null_polarity: polarity, values: Vec::new() })
        }
        Operator::In | Operator::Nin => {
            let mut values = Vec::new();
            for part in raw_value.split(',') {
                values.push(coerce_one(part)?);
            }
            if values.is_empty() {
                return Err(FilterError::new(field, op_token, raw_value).into_bad_request());
            }
            Ok(Condition { field: field.to_string(), operator, null_polarity: true, values })
        }
        Operator::Like => {
            Ok(Condition { field: field.to_string(), operator, null_polarity: true, values: vec![ScannedValue::String(raw_value.to_string())] })
        }
        _ => {
            let value = coerce_one(raw_value)?;
            Ok(Condition { field: field.to_string(), operator, null_polarity: true, values: vec![value] })
        }
    }
}

/// Serializes a condition back to its `field[op]=value` wire form. The
/// parser is the documented inverse of this function for every operator
/// except `null` (which round-trips through its boolean polarity).
pub fn serialize_condition(condition: &Condition) -> String {
    use crate::value_binding::to_wire_string;
    let key = if condition.operator == Operator::Eq {
        condition.field.clone()
    } else {
        format!("{}[{}]", condition.field, condition.operator.token())
    };
    let value = match condition.operator {
        Operator::Null => condition.null_polarity.to_string(),
        Operator::In | Operator::Nin => {
            condition.values.iter().map(to_wire_string).collect::<Vec<_>>().join(",")
        }
        _ => condition.values.first().map(to_wire_string).unwrap_or_default(),
    };
    format!("{key}={value}")
}
