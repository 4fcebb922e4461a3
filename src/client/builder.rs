use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use aether_dsl::Dialect;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use url::Url;

use super::AetherClient;
use crate::error::{AetherError, AetherResult};
use crate::transport::{HttpCarrier, RetryOptions};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_POOL_MAX_IDLE: usize = 16;

pub struct AetherClientBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    token: Option<String>,
    dialect: Dialect,
    retry: RetryOptions,
    timeout_ms: Option<u64>,
    pool_max_idle_per_host: Option<usize>,
}

impl AetherClientBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            headers: Vec::new(),
            token: None,
            dialect: Dialect::default(),
            retry: RetryOptions::default(),
            timeout_ms: None,
            pool_max_idle_per_host: None,
        }
    }

    /// Sent with every request; per-call headers override it.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn pool_max_idle_per_host(mut self, size: usize) -> Self {
        self.pool_max_idle_per_host = Some(size);
        self
    }

    pub fn build(self) -> AetherResult<AetherClient> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| AetherError::Validation(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AetherError::Validation(format!(
                "Unsupported URL scheme '{}'",
                base.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| AetherError::Validation(format!("Invalid bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_str(name)
                .map_err(|e| AetherError::Validation(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| AetherError::Validation(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(self.pool_max_idle_per_host.unwrap_or(DEFAULT_POOL_MAX_IDLE))
            .build()
            .map_err(|e| AetherError::Validation(format!("Failed to build HTTP client: {}", e)))?;

        let carrier = HttpCarrier::new(&self.base_url, headers, client, self.retry);
        Ok(AetherClient::with_transport(Arc::new(carrier), self.dialect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults_to_postgrest() {
        let client = AetherClientBuilder::new("http://localhost:3000").build().unwrap();
        assert_eq!(client.dialect().name, "postgrest");
    }

    #[test]
    fn test_rejects_invalid_urls() {
        for bad in ["not a url", "ftp://example.com", ""] {
            let err = AetherClientBuilder::new(bad).build().err().unwrap();
            assert!(matches!(err, AetherError::Validation(_)), "{}", bad);
        }
    }

    #[test]
    fn test_rejects_invalid_headers() {
        let err = AetherClientBuilder::new("http://localhost:3000")
            .header("bad header", "x")
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("bad header"));

        let err = AetherClientBuilder::new("http://localhost:3000")
            .bearer_token("line\nbreak")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AetherError::Validation(_)));
    }

    #[test]
    fn test_custom_dialect_and_options() {
        let client = AetherClientBuilder::new("https://gateway.example.com/api/")
            .dialect(Dialect::prest())
            .bearer_token("secret")
            .header("X-Tenant", "acme")
            .retry(RetryOptions::none())
            .timeout_ms(500)
            .pool_max_idle_per_host(2)
            .build()
            .unwrap();
        assert_eq!(client.dialect().name, "prest");
    }
}
