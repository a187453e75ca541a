pub mod fan_out;
pub mod paginate;

pub use fan_out::{fan_out, FanOut, FanOutOptions};
pub use paginate::collect_pages;

use castline_trait::http::HttpProvider;
use castline_types::{ApiRequest, FetchError};
use serde_json::Value;

use crate::retry::RetryPolicy;

/// Fetch one page of a paginated listing. Listings cannot be resumed midway,
/// so a page that stays unavailable after retries fails the whole listing.
pub async fn request_page(
    http: &dyn HttpProvider,
    policy: &RetryPolicy,
    request: &ApiRequest,
) -> Result<Value, FetchError> {
    policy.run(request.label(), || http.send_json(request)).await?.ok_or_else(|| {
        FetchError::PageUnavailable { url: request.label().to_string(), attempts: policy.max_attempts }
    })
}

/// Fetch a single keyed lookup. `None` means the key stayed unavailable.
pub async fn request_key(
    http: &dyn HttpProvider,
    policy: &RetryPolicy,
    request: &ApiRequest,
) -> Result<Option<Value>, FetchError> {
    policy.run(request.label(), || http.send_json(request)).await
}
