//! Error types for aether-dsl.
//!
//! Every failure here is a client-side precondition violation; nothing in this
//! crate touches the network.

use thiserror::Error;

/// Query compilation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DslError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Unsupported value type: {0}")]
    UnsupportedValue(String),

    #[error("Filter node '{0}' mixes operators and nested fields")]
    MixedNode(String),

    #[error("Unsupported combinator '{0}'")]
    UnsupportedCombinator(String),
}

/// Result type for query compilation
pub type DslResult<T> = Result<T, DslError>;
