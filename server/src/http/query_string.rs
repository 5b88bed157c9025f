//! Parses the raw query string of a list/get/aggregation request into the
//! reserved parameters (`limit`, `after`, `order`, `fields`, `schema`,
//! `count`) plus the leftover `field[op]=value` pairs the filter parser
//! consumes. One parse produces both, so the reserved-parameter skip list
//! in `cellar_engine::filter` and the parsing done here never drift apart.

use cellar_engine::query_builder::OrderField;

#[derive(Clone, Debug, Default)]
pub struct ParsedQuery {
    pub limit: Option<i64>,
    pub after: Option<String>,
    pub order: Vec<OrderField>,
    pub fields: Vec<String>,
    pub schema: SchemaMode,
    pub want_total: bool,
    pub id: Option<String>,
    /// The column an aggregation verb (`sum`/`avg`/`min`/`max`) reduces.
    /// Ignored by `list`/`get`/`count`.
    pub field: Option<String>,
    /// Every `(key, value)` pair that isn't one of the reserved parameters
    /// above, handed to [`cellar_engine::parse_filters`] unchanged.
    pub filter_params: Vec<(String, String)>,
}

/// The state table documented in spec §4.7: absent means no `schema` key in
/// the response at all; everything else is resolved at serialization time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaMode {
    #[default]
    Absent,
    Both,
    Only,
    DataOnly,
}

pub fn parse(raw_query: Option<&str>) -> ParsedQuery {
    let pairs: Vec<(String, String)> = raw_query
        .map(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).unwrap_or_default())
        .unwrap_or_default();

    let mut parsed = ParsedQuery::default();
    for (key, value) in pairs {
        match key.as_str() {
            "limit" => parsed.limit = value.parse().ok(),
            "after" => parsed.after = Some(value),
            "id" => parsed.id = Some(value),
            "field" => parsed.field = Some(value),
            "order" => {
                parsed.order = value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|field| {
                        if let Some(stripped) = field.strip_prefix('-') {
                            OrderField { field: stripped.to_string(), descending: true }
                        } else {
                            OrderField { field: field.to_string(), descending: false }
                        }
                    })
                    .collect();
            }
            "fields" => {
                parsed.fields = value.split(',').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect();
            }
            "schema" => {
                parsed.schema = match value.as_str() {
                    "" | "true" => SchemaMode::Both,
                    "only" => SchemaMode::Only,
                    "false" => SchemaMode::DataOnly,
                    _ => SchemaMode::Both,
                }
            }
            "count" => parsed.want_total = value == "true",
            _ => parsed.filter_params.push((key, value)),
        }
    }
    parsed
}
