use async_trait::async_trait;
use castline_types::{FetchError, Page};

/// One upstream source: how to fetch its raw data and how to turn it into records.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// What the caller supplies to drive a fetch (usernames, addresses, ...).
    type Input: Send + Sync;
    /// Raw upstream data, kept untyped until extraction.
    type Raw: Send;
    /// Normalized records ready to persist.
    type Output: Send;

    /// A unique name for this source
    fn name(&self) -> &'static str;

    async fn fetch_data(&self, input: &Self::Input) -> Result<Self::Raw, FetchError>;

    /// Pure conversion. Records missing a required field are dropped and logged.
    fn get_models(&self, input: &Self::Input, raw: Self::Raw) -> Self::Output;
}

/// A cursor-paginated listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Item>, FetchError>;
}
