use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::bigint::protect_large_integers;
use super::cancel::run_cancellable;
use super::retry::{with_retry, RetryOptions};
use super::{CallOptions, GatewayRequest, Transport};
use crate::error::{AetherError, AetherResult};

/// HTTP transport to the gateway.
pub struct HttpCarrier {
    base_url: String,
    headers: HeaderMap,
    client: reqwest::Client,
    retry: RetryOptions,
}

impl HttpCarrier {
    pub fn new(base_url: &str, headers: HeaderMap, client: reqwest::Client, retry: RetryOptions) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            client,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default content type, then client headers, then request headers,
    /// then per-call headers. Later layers override earlier ones.
    fn merged_headers(&self, request: &GatewayRequest, options: &CallOptions) -> AetherResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        for (name, value) in request.headers.iter().chain(options.headers.iter()) {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn send_once(
        &self,
        request: &GatewayRequest,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> AetherResult<Option<Value>> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers.clone());
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            AetherError::network(format!("HTTP {} {} failed", request.method, request.path), e)
        })?;

        let status = response.status();
        debug!("{} {} -> {}", request.method, request.path, status);

        if !status.is_success() {
            return Err(AetherError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body: error_body(response.text().await),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| AetherError::network("Failed to read response body", e))?;
        decode_body(&text)
    }
}

fn parse_header(name: &str, value: &str) -> AetherResult<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_str(name)
        .map_err(|e| AetherError::Validation(format!("Invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| AetherError::Validation(format!("Invalid value for header '{}': {}", name, e)))?;
    Ok((name, value))
}

/// Decode a success body. Empty text is "no content"; large integers are
/// protected before parsing.
pub fn decode_body(text: &str) -> AetherResult<Option<Value>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&protect_large_integers(text))
        .map(Some)
        .map_err(|e| AetherError::network("Failed to decode response body", e))
}

/// Error payload for an `Api` error. A body that could not be read is
/// reported as a string rather than dropped.
fn error_body<E: fmt::Display>(read: Result<String, E>) -> Value {
    match read {
        Ok(text) => decode_error_body(&text),
        Err(e) => Value::String(format!("failed to read error body: {}", e)),
    }
}

fn decode_error_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&protect_large_integers(text)).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Transport for HttpCarrier {
    async fn execute(
        &self,
        request: GatewayRequest,
        options: &CallOptions,
    ) -> AetherResult<Option<Value>> {
        let headers = self.merged_headers(&request, options)?;
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AetherError::Validation(format!("Request body is not serializable: {}", e)))?;

        let retry = options.retry.as_ref().unwrap_or(&self.retry);
        let cancel = options.cancel.as_ref();

        with_retry(retry, cancel, || async {
            run_cancellable(cancel, self.send_once(&request, &headers, body.as_deref())).await?
        })
        .await
    }
}
