//! Aether DSL - transport-independent query compiler for REST-over-Postgres gateways.
//!
//! Turns a declarative description of a read (projection, filter tree,
//! ordering, pagination) into the query string a gateway expects. Nothing here
//! performs I/O, so the same compiler serves the HTTP client, tests and tools.
//!
//! # Main Components
//!
//! - **Operators**: the static operator table (`$gt` -> `gt`, value layout)
//! - **Values**: scalar encoding, URL component escaping, array literals
//! - **Filter**: recursive compilation of [`QueryFilter`] trees
//! - **Dialect**: pluggable token/pagination/ordering vocabulary
//! - **URL**: assembly of `/{schema}/{table}?...`
//!
//! # Example
//!
//! ```rust
//! use aether_dsl::{build_url, Dialect, Direction, QueryFilter, QueryOptions};
//!
//! let options = QueryOptions::new()
//!     .select(["id", "name"])
//!     .filter(QueryFilter::new().op("age", "$gte", 21).field("status", "active"))
//!     .order_by("name", Direction::Asc)
//!     .limit(20);
//!
//! let url = build_url("public", "users", Some(&options), &Dialect::postgrest()).unwrap();
//! assert_eq!(
//!     url,
//!     "/public/users?select=id,name&age=gte.21&status=eq.active&order=name.asc&limit=20"
//! );
//! ```

pub mod dialect;
pub mod error;
pub mod filter;
pub mod operators;
pub mod options;
pub mod url;
pub mod value;

// Re-export main types for convenience
pub use dialect::{Dialect, OrderNotation, Pagination, DEFAULT_PAGE_SIZE};
pub use error::{DslError, DslResult};
pub use filter::{compile_filter, QueryFilter};
pub use operators::{Operator, ValueFormat, OPERATORS};
pub use options::{Direction, Order, QueryOptions};
pub use url::{build_query, build_url, resource_path};
pub use value::{encode_scalar, encode_value, BigInt, FilterValue, Scalar};
