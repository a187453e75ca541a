use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use castline_trait::http::HttpProvider;
use castline_types::{api::is_empty_body, ApiRequest, FetchError, HttpMethod};
use serde_json::Value;
use url::Url;

/// HTTP client shared by every upstream source.
///
/// Retries are not handled here: callers wrap requests in a `RetryPolicy`,
/// which decides per error class whether another attempt is worth it.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client, // The inner HTTP client used for requests.
}

impl Client {
    /// Creates a new `Client` whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { inner })
    }
}

fn transport_error(label: &str, err: reqwest::Error) -> FetchError {
    FetchError::Transport { url: label.to_string(), message: err.without_url().to_string() }
}

#[async_trait]
impl HttpProvider for Client {
    async fn send_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let url = Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request.label(), e)))?;

        tracing::debug!(method = ?request.method, request = request.label(), "Fetching");

        let mut builder = match request.method {
            HttpMethod::Get => self.inner.get(url),
            HttpMethod::Post => self.inner.post(url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| transport_error(request.label(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: request.label().to_string(), status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(|e| transport_error(request.label(), e))?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(request = request.label(), "Failed to decode response body: {}", e);
            FetchError::Decode { url: request.label().to_string(), message: e.to_string() }
        })?;

        if is_empty_body(&body) {
            return Err(FetchError::EmptyResponse { url: request.label().to_string() });
        }

        Ok(body)
    }
}
