use async_trait::async_trait;
use castline_types::{ApiRequest, FetchError};
use serde_json::Value;

/// Executes one upstream request and returns its JSON body.
///
/// Implementations must report non-2xx statuses as `FetchError::Status` and
/// bodies without data as `FetchError::EmptyResponse`, so that the retry
/// policy can tell transient failures from permanent ones.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait HttpProvider: Send + Sync {
    async fn send_json(&self, request: &ApiRequest) -> Result<Value, FetchError>;
}
