//! Resource path and query-string assembly.
//!
//! Fragment order is fixed: projection, filter fragments (tree order),
//! ordering, pagination. Unset options contribute nothing.

use crate::dialect::{Dialect, OrderNotation, Pagination, DEFAULT_PAGE_SIZE};
use crate::error::{DslError, DslResult};
use crate::filter::compile_filter;
use crate::options::{Direction, Order, QueryOptions};
use crate::value::encode_component;

/// Compile options into `key=value` fragments.
pub fn build_query(options: &QueryOptions, dialect: &Dialect) -> DslResult<Vec<String>> {
    let mut params = Vec::new();

    if let Some(select) = options.select.as_ref().filter(|s| !s.is_empty()) {
        let fields: Vec<String> = select.iter().map(|f| encode_component(f)).collect();
        params.push(format!("{}={}", dialect.select_key, fields.join(",")));
    }

    if let Some(filter) = &options.filter {
        params.extend(compile_filter(filter, dialect)?);
    }

    if let Some(order) = options.order.as_ref().filter(|o| !o.is_empty()) {
        params.push(format!("{}={}", dialect.order_key, render_order(order, dialect)));
    }

    params.extend(pagination(options.limit, options.offset, dialect)?);
    Ok(params)
}

/// `/{schema}/{table}` followed by `?query` when any fragment was produced.
pub fn build_url(
    schema: &str,
    table: &str,
    options: Option<&QueryOptions>,
    dialect: &Dialect,
) -> DslResult<String> {
    let path = resource_path(schema, table);
    let params = match options {
        Some(opts) => build_query(opts, dialect)?,
        None => Vec::new(),
    };

    if params.is_empty() {
        Ok(path)
    } else {
        Ok(format!("{}?{}", path, params.join("&")))
    }
}

pub fn resource_path(schema: &str, table: &str) -> String {
    format!("/{}/{}", encode_component(schema), encode_component(table))
}

fn render_order(order: &Order, dialect: &Dialect) -> String {
    match order {
        Order::Raw(items) => items
            .iter()
            .map(|item| encode_component(item))
            .collect::<Vec<_>>()
            .join(","),
        Order::Fields(items) => items
            .iter()
            .map(|(field, dir)| {
                let field = encode_component(field);
                match (dialect.order_notation, dir) {
                    (OrderNotation::Suffix, dir) => format!("{}.{}", field, dir),
                    (OrderNotation::SignPrefix, Direction::Desc) => format!("-{}", field),
                    (OrderNotation::SignPrefix, Direction::Asc) => field,
                }
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn pagination(limit: Option<u64>, offset: Option<u64>, dialect: &Dialect) -> DslResult<Vec<String>> {
    let mut params = Vec::new();
    match &dialect.pagination {
        Pagination::LimitOffset {
            limit_key,
            offset_key,
        } => {
            if let Some(limit) = limit {
                params.push(format!("{}={}", limit_key, limit));
            }
            if let Some(offset) = offset {
                params.push(format!("{}={}", offset_key, offset));
            }
        }
        Pagination::Page { size_key, page_key } => {
            if limit.is_none() && offset.is_none() {
                return Ok(params);
            }
            let size = limit.unwrap_or(DEFAULT_PAGE_SIZE);
            if size == 0 {
                return Err(DslError::Validation(
                    "page size must be positive for page-based pagination".to_string(),
                ));
            }
            let page = offset.unwrap_or(0) / size + 1;
            params.push(format!("{}={}", size_key, size));
            params.push(format!("{}={}", page_key, page));
        }
    }
    Ok(params)
}
