//! Query filters and their compilation into query-string fragments.
//!
//! A filter is an ordered mapping. Each key is a field name or a logical
//! combinator (`$and`, `$or`); each value is a scalar leaf (implicit equality),
//! an operator node (`{"$gt": 5}`), a path node (`{"author": {"name": ...}}`),
//! or, for combinators, a sequence of sub-filters.
//!
//! ```
//! use aether_dsl::{compile_filter, Dialect, QueryFilter};
//! use serde_json::json;
//!
//! let filter = QueryFilter::try_from(json!({
//!     "age": {"$gt": 20},
//!     "status": {"$in": ["active", "pending"]},
//! }))
//! .unwrap();
//!
//! let fragments = compile_filter(&filter, &Dialect::postgrest()).unwrap();
//! assert_eq!(fragments, vec!["age=gt.20", "status=in.(active,pending)"]);
//! ```

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::{DslError, DslResult};
use crate::operators::{is_combinator, is_reserved, Operator, ValueFormat, NOT};
use crate::value::{
    encode_array_literal_text, encode_component, encode_scalar, encode_value, FilterValue, Scalar,
};

/// Separator used when flattening sub-filter fragments inside a combinator.
const GROUP_SEPARATOR: &str = ",";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    entries: Vec<(String, FilterValue)>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous entry for the key.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    /// Apply `symbol` to `field`. Repeated calls on the same field accumulate
    /// into one operator node.
    pub fn op(
        mut self,
        field: impl Into<String>,
        symbol: impl Into<String>,
        operand: impl Into<FilterValue>,
    ) -> Self {
        let field = field.into();
        let symbol = symbol.into();
        let operand = operand.into();

        let existing = self.entries.iter_mut().find_map(|(k, v)| match v {
            FilterValue::Node(node) if *k == field => Some(node),
            _ => None,
        });
        match existing {
            Some(node) => node.insert(symbol, operand),
            None => self.insert(field, FilterValue::Node(QueryFilter::new().field(symbol, operand))),
        }
        self
    }

    pub fn and(self, filters: Vec<QueryFilter>) -> Self {
        self.field(crate::operators::AND, filters_value(filters))
    }

    pub fn or(self, filters: Vec<QueryFilter>) -> Self {
        self.field(crate::operators::OR, filters_value(filters))
    }

    pub fn insert(&mut self, key: String, value: FilterValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn filters_value(filters: Vec<QueryFilter>) -> FilterValue {
    FilterValue::List(filters.into_iter().map(FilterValue::Node).collect())
}

impl From<Map<String, Value>> for QueryFilter {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, FilterValue::from(v))).collect()
    }
}

impl FromIterator<(String, FilterValue)> for QueryFilter {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        let mut filter = QueryFilter::new();
        for (k, v) in iter {
            filter.insert(k, v);
        }
        filter
    }
}

/// `null` converts to an empty filter; anything but an object is rejected.
impl TryFrom<Value> for QueryFilter {
    type Error = DslError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(QueryFilter::from(map)),
            Value::Null => Ok(QueryFilter::new()),
            other => Err(DslError::Validation(format!(
                "filter must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum NodeKind {
    Operators,
    Path,
}

fn classify(node: &QueryFilter, path: &str) -> DslResult<NodeKind> {
    if node.is_empty() {
        return Err(DslError::Validation(format!(
            "empty filter object at '{}'",
            path
        )));
    }

    let operators = node
        .iter()
        .filter(|(k, _)| is_reserved(k) && !is_combinator(k))
        .count();

    if operators == 0 {
        Ok(NodeKind::Path)
    } else if operators == node.len() {
        Ok(NodeKind::Operators)
    } else {
        Err(DslError::MixedNode(path.to_string()))
    }
}

/// Compile a filter into fragments, one per leaf operator application,
/// in filter-tree order.
pub fn compile_filter(filter: &QueryFilter, dialect: &Dialect) -> DslResult<Vec<String>> {
    let mut out = Vec::new();
    compile_node(filter, "", dialect, &mut out)?;
    Ok(out)
}

/// Field names are percent-encoded so they cannot inject parameters;
/// `.` survives encoding, so dotted keys still address nested fields.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        encode_component(key)
    } else {
        format!("{}.{}", prefix, encode_component(key))
    }
}

fn compile_node(
    filter: &QueryFilter,
    prefix: &str,
    dialect: &Dialect,
    out: &mut Vec<String>,
) -> DslResult<()> {
    for (key, value) in filter.iter() {
        if is_combinator(key) {
            out.push(compile_combinator(key, value, prefix, dialect)?);
            continue;
        }
        if key == NOT {
            return Err(DslError::UnsupportedCombinator(key.to_string()));
        }
        if is_reserved(key) {
            return Err(DslError::Validation(format!(
                "operator '{}' must be applied to a field",
                key
            )));
        }

        let path = join_path(prefix, key);
        match value {
            FilterValue::Node(node) => match classify(node, &path)? {
                NodeKind::Operators => compile_operators(node, &path, dialect, out)?,
                NodeKind::Path => compile_node(node, &path, dialect, out)?,
            },
            leaf => out.push(format!(
                "{}={}.{}",
                path,
                dialect.wire_token(Operator::equality()),
                encode_value(leaf)?
            )),
        }
    }
    Ok(())
}

fn compile_combinator(
    key: &str,
    value: &FilterValue,
    prefix: &str,
    dialect: &Dialect,
) -> DslResult<String> {
    let FilterValue::List(items) = value else {
        return Err(DslError::Validation(format!(
            "'{}' expects a sequence of filters, got {}",
            key,
            value.type_name()
        )));
    };
    if items.is_empty() {
        return Err(DslError::Validation(format!(
            "'{}' requires at least one filter",
            key
        )));
    }

    let mut groups = Vec::with_capacity(items.len());
    for item in items {
        let FilterValue::Node(sub) = item else {
            return Err(DslError::Validation(format!(
                "'{}' expects filter objects, got {}",
                key,
                item.type_name()
            )));
        };
        if sub.is_empty() {
            return Err(DslError::Validation(format!(
                "'{}' contains an empty filter",
                key
            )));
        }
        let mut fragments = Vec::new();
        compile_node(sub, prefix, dialect, &mut fragments)?;
        groups.push(fragments.join(GROUP_SEPARATOR));
    }

    Ok(format!(
        "{}=({})",
        dialect.combinator_key(key),
        groups.join(GROUP_SEPARATOR)
    ))
}

fn compile_operators(
    node: &QueryFilter,
    path: &str,
    dialect: &Dialect,
    out: &mut Vec<String>,
) -> DslResult<()> {
    for (symbol, operand) in node.iter() {
        if symbol == NOT {
            return Err(DslError::UnsupportedCombinator(symbol.to_string()));
        }
        let operator = Operator::lookup(symbol).ok_or_else(|| DslError::UnknownOperator {
            field: path.to_string(),
            operator: symbol.to_string(),
        })?;
        out.push(format!(
            "{}={}.{}",
            path,
            dialect.wire_token(operator),
            format_operand(operator, operand)?
        ));
    }
    Ok(())
}

fn format_operand(operator: &Operator, operand: &FilterValue) -> DslResult<String> {
    let FilterValue::List(items) = operand else {
        return encode_value(operand);
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            FilterValue::Scalar(Scalar::Text(s)) if operator.format == ValueFormat::Braced => {
                parts.push(encode_array_literal_text(s))
            }
            FilterValue::Scalar(s) => parts.push(encode_scalar(s)?),
            other => {
                return Err(DslError::UnsupportedValue(format!(
                    "{} inside '{}' operand",
                    other.type_name(),
                    operator.symbol
                )))
            }
        }
    }
    let joined = parts.join(",");

    Ok(match operator.format {
        ValueFormat::Scalar => joined,
        ValueFormat::Parenthesized => format!("({})", joined),
        ValueFormat::Braced => format!("{{{}}}", joined),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BigInt;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn pg(filter: Value) -> DslResult<Vec<String>> {
        compile_filter(&QueryFilter::try_from(filter)?, &Dialect::postgrest())
    }

    #[test]
    fn test_scalar_leaves_use_equality() {
        let out = pg(json!({"id": 5, "name": "Ann Lee", "active": true, "deleted_at": null})).unwrap();
        assert_eq!(
            out,
            vec!["id=eq.5", "name=eq.Ann%20Lee", "active=eq.true", "deleted_at=eq.null"]
        );
    }

    #[test]
    fn test_operator_node_multiple_ops() {
        let out = pg(json!({"age": {"$gt": 5, "$lt": 10}})).unwrap();
        assert_eq!(out, vec!["age=gt.5", "age=lt.10"]);
    }

    #[test]
    fn test_in_is_parenthesized() {
        let out = pg(json!({"id": {"$in": [1, 2, 3]}})).unwrap();
        assert_eq!(out, vec!["id=in.(1,2,3)"]);

        let out = pg(json!({"id": {"$not.in": ["a", "b"]}})).unwrap();
        assert_eq!(out, vec!["id=not.in.(a,b)"]);
    }

    #[test]
    fn test_braced_escapes_strings() {
        let out = pg(json!({"tags": {"$cs": ["rust", "say \"hi\""]}})).unwrap();
        assert_eq!(out, vec!["tags=cs.{\"rust\",\"say%20%5C%22hi%5C%22\"}"]);

        let out = pg(json!({"ids": {"$ov": [1, 2]}})).unwrap();
        assert_eq!(out, vec!["ids=ov.{1,2}"]);
    }

    #[test]
    fn test_scalar_operator_with_sequence_is_joined() {
        let out = pg(json!({"name": {"$like": ["a", "b"]}})).unwrap();
        assert_eq!(out, vec!["name=like.a,b"]);
    }

    #[test]
    fn test_nested_paths() {
        let out = pg(json!({"author": {"name": {"$eq": "John"}}})).unwrap();
        assert_eq!(out, vec!["author.name=eq.John"]);

        let out = pg(json!({"a": {"b": {"c": {"d": 1}}}})).unwrap();
        assert_eq!(out, vec!["a.b.c.d=eq.1"]);
    }

    #[test]
    fn test_depth_n_nesting_has_n_minus_one_dots() {
        for depth in 1..12 {
            let mut value = json!({"$gte": 1});
            for level in (0..depth).rev() {
                let mut map = Map::new();
                map.insert(format!("f{}", level), value);
                value = Value::Object(map);
            }
            let out = pg(value).unwrap();
            assert_eq!(out.len(), 1);
            let key = out[0].split('=').next().unwrap();
            assert_eq!(key.matches('.').count(), depth - 1);
        }
    }

    #[test]
    fn test_or_combinator() {
        let out = pg(json!({"$or": [{"status": "active"}, {"age": {"$gt": 65}}]})).unwrap();
        assert_eq!(out, vec!["or=(status=eq.active,age=gt.65)"]);
    }

    #[test]
    fn test_nested_combinators() {
        let out = pg(json!({
            "$and": [
                {"$or": [{"a": 1}, {"b": {"$in": [2, 3]}}]},
                {"c": {"$lte": 4}, "d": "x"}
            ]
        }))
        .unwrap();
        assert_eq!(out, vec!["and=(or=(a=eq.1,b=in.(2,3)),c=lte.4,d=eq.x)"]);
    }

    #[test]
    fn test_combinator_inside_path_keeps_prefix() {
        let out = pg(json!({"user": {"$or": [{"id": 1}, {"id": 2}]}})).unwrap();
        assert_eq!(out, vec!["or=(user.id=eq.1,user.id=eq.2)"]);
    }

    #[test]
    fn test_not_is_rejected() {
        assert_eq!(
            pg(json!({"$not": {"a": 1}})),
            Err(DslError::UnsupportedCombinator("$not".to_string()))
        );
        assert_eq!(
            pg(json!({"a": {"$not": 1}})),
            Err(DslError::UnsupportedCombinator("$not".to_string()))
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        assert_eq!(
            pg(json!({"age": {"$gt": 1, "$between": [1, 2]}})),
            Err(DslError::UnknownOperator {
                field: "age".to_string(),
                operator: "$between".to_string(),
            })
        );
    }

    #[test]
    fn test_mixed_node_is_rejected() {
        assert_eq!(
            pg(json!({"user": {"$eq": 1, "name": "x"}})),
            Err(DslError::MixedNode("user".to_string()))
        );
    }

    #[test]
    fn test_empty_structures_are_rejected() {
        assert!(matches!(pg(json!({"user": {}})), Err(DslError::Validation(_))));
        assert!(matches!(pg(json!({"$or": []})), Err(DslError::Validation(_))));
        assert!(matches!(pg(json!({"$or": [{}]})), Err(DslError::Validation(_))));
        assert!(matches!(pg(json!({"$or": {"a": 1}})), Err(DslError::Validation(_))));
        assert!(matches!(pg(json!({"$or": [1]})), Err(DslError::Validation(_))));
    }

    #[test]
    fn test_fieldless_operator_is_rejected() {
        assert!(matches!(pg(json!({"$gt": 1})), Err(DslError::Validation(_))));
    }

    #[test]
    fn test_object_operand_is_rejected() {
        assert!(matches!(
            pg(json!({"a": {"$eq": {"b": 1}}})),
            Err(DslError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_timestamps_are_scalars() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let filter = QueryFilter::new()
            .op("created_at", "$gte", ts)
            .field("user", QueryFilter::new().field("seen_at", ts));
        let out = compile_filter(&filter, &Dialect::postgrest()).unwrap();
        assert_eq!(
            out,
            vec![
                "created_at=gte.2024-01-02T03:04:05.000Z",
                "user.seen_at=eq.2024-01-02T03:04:05.000Z"
            ]
        );
    }

    #[test]
    fn test_builder_accumulates_operators() {
        let filter = QueryFilter::new()
            .op("age", "$gte", 18)
            .op("age", "$lt", 65)
            .field("id", BigInt::parse("9007199254740999").unwrap())
            .or(vec![
                QueryFilter::new().field("role", "admin"),
                QueryFilter::new().field("role", "owner"),
            ]);
        let out = compile_filter(&filter, &Dialect::postgrest()).unwrap();
        assert_eq!(
            out,
            vec![
                "age=gte.18",
                "age=lt.65",
                "id=eq.9007199254740999",
                "or=(role=eq.admin,role=eq.owner)"
            ]
        );
    }

    #[test]
    fn test_prest_tokens() {
        let filter = QueryFilter::try_from(json!({
            "age": {"$gt": 18},
            "status": "active",
            "$or": [{"a": 1}],
        }))
        .unwrap();
        let out = compile_filter(&filter, &Dialect::prest()).unwrap();
        assert_eq!(out, vec!["age=$gt.18", "status=$eq.active", "or=(a=$eq.1)"]);
    }

    #[test]
    fn test_try_from_non_object() {
        assert!(QueryFilter::try_from(json!([1, 2])).is_err());
        assert!(QueryFilter::try_from(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_field_names_are_encoded() {
        let filter = QueryFilter::new()
            .field("a&id", 1i64)
            .field("x=y", QueryFilter::new().op("p#q", "$gt", 2i64))
            .field("author.name", "John");
        let out = compile_filter(&filter, &Dialect::postgrest()).unwrap();
        assert_eq!(
            out,
            vec!["a%26id=eq.1", "x%3Dy.p%23q=gt.2", "author.name=eq.John"]
        );

        let filter = QueryFilter::new().or(vec![QueryFilter::new().field("a,b", 1i64)]);
        let out = compile_filter(&filter, &Dialect::postgrest()).unwrap();
        assert_eq!(out, vec!["or=(a%2Cb=eq.1)"]);
    }
}
