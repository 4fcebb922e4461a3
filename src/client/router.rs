//! Turns a captured `(path, args)` pair into one gateway request and
//! normalizes the decoded response.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aether_dsl::{build_url, resource_path, Dialect, QueryFilter, QueryOptions};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::dispatch::{CallArg, CallHandler};
use crate::error::{AetherError, AetherResult};
use crate::transport::{CallOptions, GatewayRequest, Transport};

/// First path segment of a remote-procedure call.
pub const PLUGIN_NAMESPACE: &str = "_plugins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableMethod {
    FindMany,
    FindOne,
    Create,
    Update,
    Delete,
}

impl TableMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableMethod::FindMany => "findMany",
            TableMethod::FindOne => "findOne",
            TableMethod::Create => "create",
            TableMethod::Update => "update",
            TableMethod::Delete => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TableMethod::Create | TableMethod::Update | TableMethod::Delete
        )
    }
}

impl fmt::Display for TableMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableMethod {
    type Err = AetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "findMany" => Ok(TableMethod::FindMany),
            "findOne" => Ok(TableMethod::FindOne),
            "create" => Ok(TableMethod::Create),
            "update" => Ok(TableMethod::Update),
            "delete" => Ok(TableMethod::Delete),
            other => Err(AetherError::Validation(format!(
                "Unknown table method '{}'",
                other
            ))),
        }
    }
}

/// A resolved dispatch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Plugin {
        namespace: String,
        function: String,
    },
    Table {
        schema: String,
        table: String,
        method: TableMethod,
    },
}

impl Route {
    pub fn resolve(path: &[String]) -> AetherResult<Route> {
        let invalid = || AetherError::Validation(format!("Invalid call path: {}", path.join(".")));

        let [first, second, third] = path else {
            return Err(invalid());
        };
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }

        if first == PLUGIN_NAMESPACE {
            return Ok(Route::Plugin {
                namespace: second.clone(),
                function: third.clone(),
            });
        }

        let method = third.parse::<TableMethod>().map_err(|_| invalid())?;
        Ok(Route::Table {
            schema: first.clone(),
            table: second.clone(),
            method,
        })
    }
}

/// Routes captured calls onto a [`Transport`] using one [`Dialect`].
pub struct Router {
    transport: Arc<dyn Transport>,
    dialect: Arc<Dialect>,
}

impl Router {
    pub fn new(transport: Arc<dyn Transport>, dialect: Dialect) -> Self {
        Self {
            transport,
            dialect: Arc::new(dialect),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    async fn call_plugin(
        &self,
        namespace: &str,
        function: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let payload = match args.into_iter().next() {
            None => None,
            Some(CallArg::Json(value)) => Some(value),
            Some(_) => {
                return Err(AetherError::Validation(
                    "Plugin payload must be a JSON value".to_string(),
                ))
            }
        };
        let path = format!(
            "/{}{}",
            PLUGIN_NAMESPACE,
            resource_path(namespace, function)
        );
        let body = self
            .transport
            .execute(GatewayRequest::post(path).body(payload), options)
            .await?;
        Ok(body.unwrap_or(Value::Null))
    }

    async fn find_many(
        &self,
        schema: &str,
        table: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let query = take_options(args.into_iter().next())?;
        let url = build_url(schema, table, Some(&query), &self.dialect)?;
        let body = self
            .transport
            .execute(GatewayRequest::get(url), options)
            .await?;
        Ok(body.unwrap_or(Value::Null))
    }

    async fn find_one(
        &self,
        schema: &str,
        table: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let query = take_options(args.into_iter().next())?.limit(1);
        let url = build_url(schema, table, Some(&query), &self.dialect)?;

        let mut request = GatewayRequest::get(url);
        if let Some(accept) = &self.dialect.single_object_accept {
            request = request.header("Accept", accept.as_str());
        }

        let body = self.transport.execute(request, options).await?;
        Ok(match body {
            Some(Value::Array(items)) => items.into_iter().next().unwrap_or(Value::Null),
            Some(other) => other,
            None => Value::Null,
        })
    }

    async fn create(
        &self,
        schema: &str,
        table: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let data = take_data(args.into_iter().next(), TableMethod::Create)?;
        let request = self.with_prefer(GatewayRequest::post(resource_path(schema, table)).body(Some(data)));
        let body = self.transport.execute(request, options).await?;
        Ok(into_collection(body))
    }

    async fn update(
        &self,
        schema: &str,
        table: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let mut args = args.into_iter();
        let filter = take_filter(args.next(), TableMethod::Update)?;
        let data = take_data(args.next(), TableMethod::Update)?;
        let url = self.scoped_url(schema, table, filter, TableMethod::Update)?;

        let request = self.with_prefer(GatewayRequest::patch(url).body(Some(data)));
        let body = self.transport.execute(request, options).await?;
        Ok(into_collection(body))
    }

    async fn delete(
        &self,
        schema: &str,
        table: &str,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let filter = take_filter(args.into_iter().next(), TableMethod::Delete)?;
        let url = self.scoped_url(schema, table, filter, TableMethod::Delete)?;
        let body = self
            .transport
            .execute(GatewayRequest::delete(url), options)
            .await?;
        Ok(body.unwrap_or(Value::Null))
    }

    /// URL for a destructive call. Refuses anything that would address the
    /// whole table.
    fn scoped_url(
        &self,
        schema: &str,
        table: &str,
        filter: QueryFilter,
        method: TableMethod,
    ) -> AetherResult<String> {
        if filter.is_empty() {
            return Err(unsafe_operation(method));
        }
        let url = build_url(
            schema,
            table,
            Some(&QueryOptions::new().filter(filter)),
            &self.dialect,
        )?;
        if !url.contains('?') {
            return Err(unsafe_operation(method));
        }
        Ok(url)
    }

    fn with_prefer(&self, request: GatewayRequest) -> GatewayRequest {
        match &self.dialect.prefer_on_write {
            Some(prefer) => request.header("Prefer", prefer.as_str()),
            None => request,
        }
    }
}

#[async_trait]
impl CallHandler for Router {
    async fn handle(
        &self,
        path: Vec<String>,
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let route = Route::resolve(&path)?;
        debug!("Dispatching {} via {:?}", path.join("."), route);

        match route {
            Route::Plugin {
                namespace,
                function,
            } => self.call_plugin(&namespace, &function, args, options).await,
            Route::Table {
                schema,
                table,
                method,
            } => match method {
                TableMethod::FindMany => self.find_many(&schema, &table, args, options).await,
                TableMethod::FindOne => self.find_one(&schema, &table, args, options).await,
                TableMethod::Create => self.create(&schema, &table, args, options).await,
                TableMethod::Update => self.update(&schema, &table, args, options).await,
                TableMethod::Delete => self.delete(&schema, &table, args, options).await,
            },
        }
    }
}

fn unsafe_operation(method: TableMethod) -> AetherError {
    AetherError::Validation(format!(
        "Unsafe operation: missing filter for {}",
        method
    ))
}

/// Read options from the first argument. A bare filter is accepted as `where`.
fn take_options(arg: Option<CallArg>) -> AetherResult<QueryOptions> {
    match arg {
        None => Ok(QueryOptions::default()),
        Some(CallArg::Options(options)) => Ok(options),
        Some(CallArg::Filter(filter)) => Ok(QueryOptions::new().filter(filter)),
        Some(CallArg::Json(value)) => Ok(QueryOptions::try_from(value)?),
    }
}

/// Missing or null filters come back empty so the caller's guard rejects them.
fn take_filter(arg: Option<CallArg>, method: TableMethod) -> AetherResult<QueryFilter> {
    match arg {
        None => Ok(QueryFilter::new()),
        Some(CallArg::Filter(filter)) => Ok(filter),
        Some(CallArg::Json(value)) => Ok(QueryFilter::try_from(value)?),
        Some(CallArg::Options(_)) => Err(AetherError::Validation(format!(
            "{} expects a filter, not query options",
            method
        ))),
    }
}

fn take_data(arg: Option<CallArg>, method: TableMethod) -> AetherResult<Value> {
    match arg {
        Some(CallArg::Json(value)) if !value.is_null() => Ok(value),
        _ => Err(AetherError::Validation(format!(
            "{} requires a JSON data argument",
            method
        ))),
    }
}

/// Create and update always hand back a collection.
fn into_collection(body: Option<Value>) -> Value {
    match body {
        None | Some(Value::Null) => Value::Array(Vec::new()),
        Some(Value::Array(items)) => Value::Array(items),
        Some(other) => Value::Array(vec![other]),
    }
}
