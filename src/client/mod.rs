mod builder;
mod dispatch;
mod handles;
mod router;

pub use builder::AetherClientBuilder;
pub use dispatch::{CallArg, CallChain, CallHandler};
pub use handles::{PluginHandle, TableHandle};
pub use router::{Route, Router, TableMethod, PLUGIN_NAMESPACE};

use std::sync::Arc;

use aether_dsl::Dialect;
use serde_json::Value;

use crate::error::AetherResult;
use crate::transport::{CallOptions, Transport};

/// Gateway client. Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct AetherClient {
    router: Arc<Router>,
}

impl AetherClient {
    pub fn builder(base_url: &str) -> AetherClientBuilder {
        AetherClientBuilder::new(base_url)
    }

    /// Client over any [`Transport`], e.g. an in-memory one in tests.
    pub fn with_transport(transport: Arc<dyn Transport>, dialect: Dialect) -> Self {
        Self {
            router: Arc::new(Router::new(transport, dialect)),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        self.router.dialect()
    }

    /// Empty call chain; extend with [`CallChain::attr`] and finish with
    /// [`CallChain::invoke`].
    pub fn root(&self) -> CallChain {
        CallChain::new(self.handler())
    }

    /// Generic entry point: `call(&["public", "users", "findMany"], args)`.
    pub async fn call(&self, path: &[&str], args: Vec<CallArg>) -> AetherResult<Value> {
        self.call_with(path, args, &CallOptions::default()).await
    }

    pub async fn call_with(
        &self,
        path: &[&str],
        args: Vec<CallArg>,
        options: &CallOptions,
    ) -> AetherResult<Value> {
        let path = path.iter().map(|s| s.to_string()).collect();
        self.router.handle(path, args, options).await
    }

    pub fn table(&self, schema: &str, table: &str) -> TableHandle {
        TableHandle::new(self.handler(), schema, table)
    }

    pub fn plugin(&self, namespace: &str) -> PluginHandle {
        PluginHandle::new(self.handler(), namespace)
    }

    fn handler(&self) -> Arc<dyn CallHandler> {
        self.router.clone()
    }
}
