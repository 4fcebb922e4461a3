//! Transport layer: request description, the [`Transport`] seam, and the
//! reqwest-backed [`HttpCarrier`].

mod bigint;
mod cancel;
mod http_carrier;
mod retry;

pub use bigint::{protect_large_integers, LARGE_INTEGER_DIGITS};
pub use cancel::{run_cancellable, CancelSignal};
pub use http_carrier::{decode_body, HttpCarrier};
pub use retry::{with_retry, RetryOptions};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::AetherResult;

/// One HTTP exchange with the gateway, relative to the client base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    /// Path plus query string, starting with `/`
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-call overrides. Headers here win over client-wide headers.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub headers: Vec<(String, String)>,
    pub retry: Option<RetryOptions>,
    pub cancel: Option<CancelSignal>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn cancel_on(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

/// Executes a [`GatewayRequest`]. `Ok(None)` means the gateway sent no content.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: GatewayRequest,
        options: &CallOptions,
    ) -> AetherResult<Option<Value>>;
}
