//! Filter values and their wire encoding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DslError, DslResult};
use crate::filter::QueryFilter;

/// Characters left untouched by URI-component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Separator between encoded sequence elements.
pub const SEQUENCE_SEPARATOR: char = ',';

/// An integer of arbitrary magnitude carried as its exact decimal text.
///
/// Serializes as a JSON string so that no JSON consumer ever rounds it through
/// a double. Deserializes from either a string or an integer literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BigInt(String);

impl BigInt {
    pub fn parse(text: &str) -> DslResult<Self> {
        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DslError::Validation(format!(
                "'{}' is not a decimal integer",
                text
            )));
        }
        Ok(BigInt(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl FromStr for BigInt {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::parse(s)
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! bigint_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for BigInt {
            fn from(v: $t) -> Self {
                BigInt(v.to_string())
            }
        })*
    };
}

bigint_from_int!(i64, u64, i128, u128);

impl Serialize for BigInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BigInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BigIntVisitor;

        impl de::Visitor<'_> for BigIntVisitor {
            type Value = BigInt;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal integer as string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BigInt, E> {
                BigInt::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigInt, E> {
                Ok(BigInt::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigInt, E> {
                Ok(BigInt::from(v))
            }

            fn visit_i128<E: de::Error>(self, v: i128) -> Result<BigInt, E> {
                Ok(BigInt::from(v))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<BigInt, E> {
                Ok(BigInt::from(v))
            }
        }

        deserializer.deserialize_any(BigIntVisitor)
    }
}

/// A single filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    BigInt(BigInt),
}

/// Anything that can sit on the right-hand side of a filter key.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<FilterValue>),
    Node(QueryFilter),
}

impl FilterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FilterValue::Scalar(_) => "scalar",
            FilterValue::List(_) => "sequence",
            FilterValue::Node(_) => "object",
        }
    }
}

/// Percent-encode text for use inside a query component.
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Render one scalar in its wire-safe form.
pub fn encode_scalar(scalar: &Scalar) -> DslResult<String> {
    Ok(match scalar {
        Scalar::Null => "null".to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::UInt(u) => u.to_string(),
        Scalar::Float(f) => {
            if !f.is_finite() {
                return Err(DslError::UnsupportedValue(format!("non-finite number {}", f)));
            }
            f.to_string()
        }
        Scalar::Text(s) => encode_component(s),
        Scalar::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
        Scalar::BigInt(b) => b.as_str().to_string(),
    })
}

/// Render a value: scalars directly, sequences element-wise joined with
/// [`SEQUENCE_SEPARATOR`]. Delimiters are the caller's concern.
pub fn encode_value(value: &FilterValue) -> DslResult<String> {
    match value {
        FilterValue::Scalar(s) => encode_scalar(s),
        FilterValue::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    FilterValue::Scalar(s) => parts.push(encode_scalar(s)?),
                    other => {
                        return Err(DslError::UnsupportedValue(format!(
                            "{} inside a sequence",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(parts.join(&SEQUENCE_SEPARATOR.to_string()))
        }
        FilterValue::Node(_) => Err(DslError::UnsupportedValue("object".to_string())),
    }
}

/// Quote a string as a Postgres array-literal element, then URL-encode it.
pub fn encode_array_literal_text(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", encode_component(&escaped))
}

impl From<Scalar> for FilterValue {
    fn from(s: Scalar) -> Self {
        FilterValue::Scalar(s)
    }
}

impl From<QueryFilter> for FilterValue {
    fn from(f: QueryFilter) -> Self {
        FilterValue::Node(f)
    }
}

macro_rules! scalar_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for FilterValue {
            fn from(v: $t) -> Self {
                FilterValue::Scalar(Scalar::$variant(v.into()))
            }
        })*
    };
}

scalar_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f64 => Float,
    String => Text,
    &str => Text,
    DateTime<Utc> => Timestamp,
    BigInt => BigInt,
);

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FilterValue::Scalar(Scalar::Null))
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        FilterValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => FilterValue::Scalar(Scalar::Null),
            Value::Bool(b) => FilterValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FilterValue::Scalar(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    FilterValue::Scalar(Scalar::UInt(u))
                } else {
                    FilterValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => FilterValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => FilterValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => FilterValue::Node(QueryFilter::from(map)),
        }
    }
}
