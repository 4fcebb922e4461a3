//! Query-string vocabulary of a gateway flavor.
//!
//! Two flavors are built in: [`Dialect::postgrest`] and [`Dialect::prest`].
//! All fields are public so a custom gateway can be described directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DslError;
use crate::operators::{Operator, AND, OR};

/// Default page size when only an offset is given to a page-based dialect.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// How limit/offset are expressed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Pagination {
    /// `limit=N&offset=M`
    LimitOffset { limit_key: String, offset_key: String },
    /// `page_size=N&page=P` with `P = offset / N + 1`
    Page { size_key: String, page_key: String },
}

/// How an order direction is attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderNotation {
    /// `age.desc`
    Suffix,
    /// `-age` for descending, `age` for ascending
    SignPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub name: String,
    /// Prepended to every operator token (`""` gives `eq`, `"$"` gives `$eq`)
    pub operator_prefix: String,
    pub select_key: String,
    pub order_key: String,
    pub and_key: String,
    pub or_key: String,
    pub pagination: Pagination,
    pub order_notation: OrderNotation,
    /// Accept header sent by findOne to ask for a bare object instead of a list
    pub single_object_accept: Option<String>,
    /// `Prefer` header sent with create/update so the gateway echoes affected rows
    pub prefer_on_write: Option<String>,
}

impl Dialect {
    /// PostgREST: `age=gt.5`, `select=`, `order=age.desc`, `limit=`/`offset=`.
    pub fn postgrest() -> Self {
        Self {
            name: "postgrest".to_string(),
            operator_prefix: String::new(),
            select_key: "select".to_string(),
            order_key: "order".to_string(),
            and_key: "and".to_string(),
            or_key: "or".to_string(),
            pagination: Pagination::LimitOffset {
                limit_key: "limit".to_string(),
                offset_key: "offset".to_string(),
            },
            order_notation: OrderNotation::Suffix,
            single_object_accept: None,
            prefer_on_write: Some("return=representation".to_string()),
        }
    }

    /// pREST: `age=$gt.5`, `_select=`, `_order=-age`, `_page_size=`/`_page=`.
    pub fn prest() -> Self {
        Self {
            name: "prest".to_string(),
            operator_prefix: "$".to_string(),
            select_key: "_select".to_string(),
            order_key: "_order".to_string(),
            and_key: "and".to_string(),
            or_key: "or".to_string(),
            pagination: Pagination::Page {
                size_key: "_page_size".to_string(),
                page_key: "_page".to_string(),
            },
            order_notation: OrderNotation::SignPrefix,
            single_object_accept: None,
            prefer_on_write: None,
        }
    }

    pub fn with_single_object_accept(mut self, accept: impl Into<String>) -> Self {
        self.single_object_accept = Some(accept.into());
        self
    }

    pub fn wire_token(&self, operator: &Operator) -> String {
        format!("{}{}", self.operator_prefix, operator.token)
    }

    /// Wire key for a `$and`/`$or` combinator symbol.
    pub fn combinator_key<'a>(&'a self, symbol: &'a str) -> &'a str {
        match symbol {
            AND => &self.and_key,
            OR => &self.or_key,
            other => other.trim_start_matches('$'),
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::postgrest()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Dialect {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgrest" => Ok(Self::postgrest()),
            "prest" => Ok(Self::prest()),
            other => Err(DslError::Validation(format!("unknown dialect '{}'", other))),
        }
    }
}
