//! Generic call capture: a chain of path segments terminated by an invocation.

use std::fmt;
use std::sync::Arc;

use aether_dsl::{QueryFilter, QueryOptions};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::AetherResult;
use crate::transport::CallOptions;

/// Receives every captured `(path, args)` pair.
#[async_trait]
pub trait CallHandler: Send + Sync {
    async fn handle(
        &self,
        path: Vec<String>,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value>;
}

/// One positional call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Options(QueryOptions),
    Filter(QueryFilter),
    Json(Value),
}

impl From<QueryOptions> for CallArg {
    fn from(options: QueryOptions) -> Self {
        CallArg::Options(options)
    }
}

impl From<QueryFilter> for CallArg {
    fn from(filter: QueryFilter) -> Self {
        CallArg::Filter(filter)
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        CallArg::Json(value)
    }
}

/// Accumulates attribute segments until [`CallChain::invoke`].
///
/// A chain is inert: it is not a future and does not implement `IntoFuture`,
/// so awaiting or inspecting a partial chain never records a segment.
#[derive(Clone)]
pub struct CallChain {
    handler: Arc<dyn CallHandler>,
    path: Vec<String>,
    options: CallOptions,
}

impl CallChain {
    pub fn new(handler: Arc<dyn CallHandler>) -> Self {
        Self {
            handler,
            path: Vec::new(),
            options: CallOptions::default(),
        }
    }

    /// Extend the path by one segment.
    pub fn attr(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub async fn invoke(self, args: Vec<CallArg>) -> AetherResult<Value> {
        self.handler.handle(self.path, args, &self.options).await
    }
}

impl fmt::Debug for CallChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallChain")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
