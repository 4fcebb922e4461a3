//! Typed convenience layer. Every method builds a call chain and goes
//! through the same dispatcher as the generic `call` entry point.

use std::sync::Arc;

use aether_dsl::{QueryFilter, QueryOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::dispatch::{CallArg, CallChain, CallHandler};
use super::router::{TableMethod, PLUGIN_NAMESPACE};
use crate::error::{AetherError, AetherResult};
use crate::transport::CallOptions;

/// Operations on one `schema.table` resource.
///
/// Integers of 15 or more digits arrive as JSON strings so they keep full
/// precision. Declare such columns as [`BigInt`](aether_dsl::BigInt) or
/// `String` in row types; an `i64` field fails to decode.
#[derive(Clone)]
pub struct TableHandle {
    handler: Arc<dyn CallHandler>,
    schema: String,
    table: String,
    options: CallOptions,
}

impl TableHandle {
    pub(crate) fn new(handler: Arc<dyn CallHandler>, schema: &str, table: &str) -> Self {
        Self {
            handler,
            schema: schema.to_string(),
            table: table.to_string(),
            options: CallOptions::default(),
        }
    }

    /// Apply per-call headers, retry policy or cancellation to every call
    /// made through this handle.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn chain(&self, method: TableMethod) -> CallChain {
        CallChain::new(self.handler.clone())
            .attr(self.schema.as_str())
            .attr(self.table.as_str())
            .attr(method.as_str())
            .with_options(self.options.clone())
    }

    pub async fn find_many<T: DeserializeOwned>(&self, query: QueryOptions) -> AetherResult<Vec<T>> {
        let value = self.chain(TableMethod::FindMany).invoke(vec![query.into()]).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        decode(value)
    }

    pub async fn find_one<T: DeserializeOwned>(&self, query: QueryOptions) -> AetherResult<Option<T>> {
        let value = self.chain(TableMethod::FindOne).invoke(vec![query.into()]).await?;
        if value.is_null() {
            return Ok(None);
        }
        decode(value).map(Some)
    }

    pub async fn create<T, D>(&self, data: &D) -> AetherResult<Vec<T>>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        let data = encode(data)?;
        let value = self.chain(TableMethod::Create).invoke(vec![data]).await?;
        decode(value)
    }

    pub async fn update<T, D>(&self, filter: QueryFilter, data: &D) -> AetherResult<Vec<T>>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        let data = encode(data)?;
        let value = self
            .chain(TableMethod::Update)
            .invoke(vec![filter.into(), data])
            .await?;
        decode(value)
    }

    /// Returns the raw gateway response, `Value::Null` when it sent no content.
    pub async fn delete(&self, filter: QueryFilter) -> AetherResult<Value> {
        self.chain(TableMethod::Delete).invoke(vec![filter.into()]).await
    }
}

/// Remote procedures exposed under one plugin namespace.
#[derive(Clone)]
pub struct PluginHandle {
    handler: Arc<dyn CallHandler>,
    namespace: String,
    options: CallOptions,
}

impl PluginHandle {
    pub(crate) fn new(handler: Arc<dyn CallHandler>, namespace: &str) -> Self {
        Self {
            handler,
            namespace: namespace.to_string(),
            options: CallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn call<T, P>(&self, function: &str, payload: &P) -> AetherResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let value = CallChain::new(self.handler.clone())
            .attr(PLUGIN_NAMESPACE)
            .attr(self.namespace.as_str())
            .attr(function)
            .with_options(self.options.clone())
            .invoke(vec![encode(payload)?])
            .await?;
        decode(value)
    }
}

fn encode<D: Serialize + ?Sized>(data: &D) -> AetherResult<CallArg> {
    serde_json::to_value(data)
        .map(CallArg::Json)
        .map_err(|e| AetherError::Validation(format!("Failed to serialize request data: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value) -> AetherResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AetherError::Validation(format!("Unexpected response shape: {}", e)))
}
