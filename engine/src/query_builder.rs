//! # Query Builder Module
//!
//! Produces parameterized SQL for every operation the collection service
//! needs — the four CRUD statements, DDL for collection lifecycle changes,
//! and the five aggregations — portable across SQLite, PostgreSQL, and
//! MySQL. Every user-provided value reaches SQL through a bound placeholder;
//! nothing here ever interpolates a value into the statement text. That is
//! the one invariant this module exists to defend, and it is defended in
//! exactly one place so nothing upstream needs to re-derive it.

use sqlx::any::AnyArguments;
use sqlx::Arguments;

use crate::collection::{CollectionDef, ID_COLUMN, ROWID_COLUMN};
use crate::column::Column;
use crate::database::Dialect;
use crate::errors::Error;
use crate::filter::{Condition, Operator};
use crate::types::ColumnType;
use crate::value_binding::{self, ScannedValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    pub fn from_verb(verb: &str) -> Option<Self> {
        Some(match verb {
            "count" => AggregateOp::Count,
            "sum" => AggregateOp::Sum,
            "avg" => AggregateOp::Avg,
            "min" => AggregateOp::Min,
            "max" => AggregateOp::Max,
            _ => return None,
        })
    }

    fn sql_fn(&self) -> &'static str {
        match self {
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrderField {
    pub field: String,
    pub descending: bool,
}

/// A placeholder generator bound to one dialect and one statement: MySQL and
/// SQLite always render `?`; PostgreSQL renders `$1`, `$2`, … in the order
/// values are bound.
struct Placeholders {
    dialect: Dialect,
    next: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    fn next(&mut self) -> String {
        match self.dialect {
            Dialect::Postgres => {
                let s = format!("${}", self.next);
                self.next += 1;
                s
            }
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }
}

pub struct QueryBuilder {
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn quote(&self, ident: &str) -> String {
        self.dialect.quote_identifier(ident)
    }

    // ========================================================================
    // DDL
    // ========================================================================

    /// Emits the single `CREATE TABLE` statement for a new collection,
    /// prepending the implicit `id`/`rowid` system columns ahead of the
    /// declared ones.
    pub fn create_table(&self, collection: &CollectionDef) -> String {
        let table = self.quote(&collection.name);
        let mut defs = Vec::new();

        match self.dialect {
            Dialect::Sqlite => defs.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote(ROWID_COLUMN))),
            Dialect::Postgres => defs.push(format!("{} SERIAL PRIMARY KEY", self.quote(ROWID_COLUMN))),
            Dialect::MySql => defs.push(format!("{} INT AUTO_INCREMENT PRIMARY KEY", self.quote(ROWID_COLUMN))),
        }
        defs.push(format!("{} {} NOT NULL UNIQUE", self.quote(ID_COLUMN), ColumnType::String.sql_type(self.dialect)));

        for col in &collection.columns {
            defs.push(self.column_def(col));
        }

        format!("CREATE TABLE {} ({})", table, defs.join(", "))
    }

    fn column_def(&self, col: &Column) -> String {
        let mut def = format!("{} {}", self.quote(&col.name), col.column_type.sql_type(self.dialect));
        if !col.nullable {
            def.push_str(" NOT NULL");
        }
        if col.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &col.default_value {
            def.push_str(&format!(" DEFAULT '{}'", default.replace('\'', "''")));
        }
        def
    }

    pub fn alter_add_column(&self, table: &str, col: &Column) -> String {
        format!("ALTER TABLE {} ADD COLUMN {}", self.quote(table), self.column_def(col))
    }

    /// Drops a column. SQLite predating 3.35 has no `DROP COLUMN`, so the
    /// safe, version-portable path is the table-rebuild dance: create a
    /// shadow table without the column, copy the surviving data across,
    /// drop the original, rename the shadow into place.
    pub fn alter_drop_column(&self, collection: &CollectionDef, dropped: &str) -> Vec<String> {
        match self.dialect {
            Dialect::Postgres | Dialect::MySql => {
                vec![format!("ALTER TABLE {} DROP COLUMN {}", self.quote(&collection.name), self.quote(dropped))]
            }
            Dialect::Sqlite => {
                let shadow = format!("{}__cellar_rebuild", collection.name);
                let kept: Vec<&Column> = collection.columns.iter().filter(|c| c.name != dropped).collect();

                let mut defs = vec![
                    format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote(ROWID_COLUMN)),
                    format!("{} TEXT NOT NULL UNIQUE", self.quote(ID_COLUMN)),
                ];
                defs.extend(kept.iter().map(|c| self.column_def(c)));

                let mut keep_names = vec![ROWID_COLUMN.to_string(), ID_COLUMN.to_string()];
                keep_names.extend(kept.iter().map(|c| c.name.clone()));
                let quoted_names: Vec<String> = keep_names.iter().map(|n| self.quote(n)).collect();
                let column_list = quoted_names.join(", ");

                vec![
                    format!("CREATE TABLE {} ({})", self.quote(&shadow), defs.join(", ")),
                    format!(
                        "INSERT INTO {} ({}) SELECT {} FROM {}",
                        self.quote(&shadow),
                        column_list,
                        column_list,
                        self.quote(&collection.name)
                    ),
                    format!("DROP TABLE {}", self.quote(&collection.name)),
                    format!("ALTER TABLE {} RENAME TO {}", self.quote(&shadow), self.quote(&collection.name)),
                ]
            }
        }
    }

    pub fn alter_rename_column(&self, table: &str, old: &str, new: &str) -> String {
        match self.dialect {
            Dialect::MySql => format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.quote(table),
                self.quote(old),
                self.quote(new)
            ),
            Dialect::Postgres | Dialect::Sqlite => {
                format!("ALTER TABLE {} RENAME COLUMN {} TO {}", self.quote(table), self.quote(old), self.quote(new))
            }
        }
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(table))
    }

    // ========================================================================
    // DML
    // ========================================================================

    /// `SELECT`. An empty `projection` means `*`; an empty `order` omits
    /// `ORDER BY`. `limit`/`offset` are always bound parameters, never
    /// inlined into the statement text.
    pub fn select<'a>(
        &self,
        table: &str,
        projection: &[String],
        conditions: &[Condition],
        order: &[OrderField],
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> (String, AnyArguments<'a>) {
        let mut ph = Placeholders::new(self.dialect);
        let mut args = AnyArguments::default();

        let cols = if projection.is_empty() {
            "*".to_string()
        } else {
            projection.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", cols, self.quote(table));

        let where_clause = self.render_where(conditions, &mut ph, &mut args);
        if let Some(clause) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        if !order.is_empty() {
            let order_sql = order
                .iter()
                .map(|o| format!("{} {}", self.quote(&o.field), if o.descending { "DESC" } else { "ASC" }))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_sql);
        }

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", ph.next()));
            let _ = args.add(limit);
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", ph.next()));
            let _ = args.add(offset);
        }

        if !conditions.is_empty() {
            log::debug!("select query with filters: sql=\"{sql}\" conditions={conditions:?}");
        }

        (sql, args)
    }

    /// `INSERT`. Single-row only; multi-row insert is the caller's
    /// responsibility via repeated calls inside a transaction.
    pub fn insert<'a>(&self, table: &str, columns: &[String], values: &[ScannedValue]) -> (String, AnyArguments<'a>) {
        let mut ph = Placeholders::new(self.dialect);
        let mut args = AnyArguments::default();

        let quoted_cols = columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
        let placeholders = values.iter().map(|_| ph.next()).collect::<Vec<_>>().join(", ");
        for v in values {
            value_binding::bind(&mut args, v, self.dialect);
        }

        let sql = format!("INSERT INTO {} ({}) VALUES ({})", self.quote(table), quoted_cols, placeholders);
        (sql, args)
    }

    /// `UPDATE`. Assignment keys are sorted for stable emission. Rejects
    /// empty assignments and empty conditions — the latter to prevent an
    /// accidental table-wide update.
    pub fn update<'a>(
        &self,
        table: &str,
        assignments: &[(String, ScannedValue)],
        conditions: &[Condition],
    ) -> Result<(String, AnyArguments<'a>), Error> {
        if assignments.is_empty() {
            return Err(Error::bad_request("update requires at least one assignment"));
        }
        if conditions.is_empty() {
            return Err(Error::bad_request("update requires at least one condition"));
        }

        let mut sorted: Vec<&(String, ScannedValue)> = assignments.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut ph = Placeholders::new(self.dialect);
        let mut args = AnyArguments::default();

        let set_clause = sorted
            .iter()
            .map(|(col, value)| {
                let slot = ph.next();
                value_binding::bind(&mut args, value, self.dialect);
                format!("{} = {}", self.quote(col), slot)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {}", self.quote(table), set_clause);
        if let Some(clause) = self.render_where(conditions, &mut ph, &mut args) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        Ok((sql, args))
    }

    /// `DELETE`. Rejects empty conditions, symmetrically with `update`.
    pub fn delete<'a>(&self, table: &str, conditions: &[Condition]) -> Result<(String, AnyArguments<'a>), Error> {
        if conditions.is_empty() {
            return Err(Error::bad_request("delete requires at least one condition"));
        }
        let mut ph = Placeholders::new(self.dialect);
        let mut args = AnyArguments::default();
        let clause =
            self.render_where(conditions, &mut ph, &mut args).expect("non-empty conditions always render a clause");
        let sql = format!("DELETE FROM {} WHERE {}", self.quote(table), clause);
        Ok((sql, args))
    }

    /// `count`/`sum`/`avg`/`min`/`max`. `count` ignores `field`; the others
    /// require a numeric-typed field, enforced by the caller passing
    /// `field_is_numeric`.
    pub fn aggregate<'a>(
        &self,
        table: &str,
        op: AggregateOp,
        field: Option<&str>,
        field_is_numeric: bool,
        conditions: &[Condition],
    ) -> Result<(String, AnyArguments<'a>), Error> {
        let projection = match op {
            AggregateOp::Count => format!("{}(*)", op.sql_fn()),
            _ => {
                let field = field.ok_or_else(|| Error::bad_request("aggregation requires a field"))?;
                if !field_is_numeric {
                    return Err(Error::bad_request(format!("field '{field}' is not numeric")));
                }
                format!("{}({})", op.sql_fn(), self.quote(field))
            }
        };

        let mut ph = Placeholders::new(self.dialect);
        let mut args = AnyArguments::default();
        let mut sql = format!("SELECT {} AS value FROM {}", projection, self.quote(table));
        if let Some(clause) = self.render_where(conditions, &mut ph, &mut args) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        if !conditions.is_empty() {
            log::debug!("aggregate query with filters: sql=\"{sql}\" conditions={conditions:?}");
        }

        Ok((sql, args))
    }

    // ========================================================================
    // Shared WHERE-clause rendering
    // ========================================================================

    fn render_where(
        &self,
        conditions: &[Condition],
        ph: &mut Placeholders,
        args: &mut AnyArguments<'_>,
    ) -> Option<String> {
        if conditions.is_empty() {
            return None;
        }
        let fragments: Vec<String> = conditions.iter().map(|c| self.render_condition(c, ph, args)).collect();
        Some(fragments.join(" AND "))
    }

    fn render_condition(&self, condition: &Condition, ph: &mut Placeholders, args: &mut AnyArguments<'_>) -> String {
        let col = self.quote(&condition.field);
        match condition.operator {
            Operator::Null => {
                if condition.null_polarity {
                    format!("{col} IS NULL")
                } else {
                    format!("{col} IS NOT NULL")
                }
            }
            Operator::In | Operator::Nin => {
                let slots: Vec<String> = condition
                    .values
                    .iter()
                    .map(|v| {
                        let slot = ph.next();
                        value_binding::bind(args, v, self.dialect);
                        slot
                    })
                    .collect();
                let keyword = if condition.operator == Operator::In { "IN" } else { "NOT IN" };
                format!("{col} {keyword} ({})", slots.join(", "))
            }
            _ => {
                let value = condition.values.first().expect("non-IN/NULL conditions always carry one value");
                let slot = ph.next();
                value_binding::bind(args, value, self.dialect);
                let fragment = condition.operator.sql_fragment(1, &|_| slot.clone());
                format!("{col} {fragment}")
            }
        }
    }
}
