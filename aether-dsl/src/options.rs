//! Projection, filter, ordering and pagination for a read or scoped write.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{DslError, DslResult};
use crate::filter::{json_type_name, QueryFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(DslError::Validation(format!(
                "order direction must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    /// Pre-rendered `field[.dir]` items, passed through verbatim
    Raw(Vec<String>),
    /// Field/direction pairs rendered per the dialect's notation
    Fields(Vec<(String, Direction)>),
}

impl Order {
    pub fn is_empty(&self) -> bool {
        match self {
            Order::Raw(items) => items.is_empty(),
            Order::Fields(items) => items.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub select: Option<Vec<String>>,
    pub filter: Option<QueryFilter>,
    pub order: Option<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Append a field/direction pair. Replaces a previous raw order.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        match &mut self.order {
            Some(Order::Fields(items)) => items.push((field.into(), direction)),
            _ => self.order = Some(Order::Fields(vec![(field.into(), direction)])),
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Parses the JSON form `{select, where, order, limit, offset}`.
/// `null` yields empty options; unknown keys are rejected.
impl TryFrom<Value> for QueryOptions {
    type Error = DslError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Null => return Ok(QueryOptions::default()),
            Value::Object(map) => map,
            other => {
                return Err(DslError::Validation(format!(
                    "query options must be an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut options = QueryOptions::default();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "select" => options.select = Some(parse_string_list("select", value)?),
                "where" => options.filter = Some(QueryFilter::try_from(value)?),
                "order" => options.order = Some(parse_order(value)?),
                "limit" => options.limit = Some(parse_count("limit", &value)?),
                "offset" => options.offset = Some(parse_count("offset", &value)?),
                other => {
                    return Err(DslError::Validation(format!(
                        "unknown query option '{}'",
                        other
                    )))
                }
            }
        }
        Ok(options)
    }
}

fn parse_string_list(key: &str, value: Value) -> DslResult<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(DslError::Validation(format!("'{}' must be an array", key)));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(DslError::Validation(format!(
                "'{}' entries must be strings, got {}",
                key,
                json_type_name(&other)
            ))),
        })
        .collect()
}

fn parse_order(value: Value) -> DslResult<Order> {
    match value {
        Value::Array(_) => Ok(Order::Raw(parse_string_list("order", value)?)),
        Value::Object(map) => parse_order_map(map),
        other => Err(DslError::Validation(format!(
            "'order' must be an array or object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn parse_order_map(map: Map<String, Value>) -> DslResult<Order> {
    let mut fields = Vec::with_capacity(map.len());
    for (field, dir) in map {
        let Value::String(dir) = dir else {
            return Err(DslError::Validation(format!(
                "order direction for '{}' must be a string",
                field
            )));
        };
        fields.push((field, dir.parse()?));
    }
    Ok(Order::Fields(fields))
}

fn parse_count(key: &str, value: &Value) -> DslResult<u64> {
    value.as_u64().ok_or_else(|| {
        DslError::Validation(format!("'{}' must be a non-negative integer", key))
    })
}
