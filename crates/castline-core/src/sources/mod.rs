//! One module per upstream source. Each source pairs a `Fetcher` (and, for
//! listings, a `PageSource`) with pure extraction functions that turn raw
//! JSON into storage models.

pub mod alchemy;
pub mod ensdata;
pub mod searchcaster;
pub mod warpcast_reactions;
pub mod warpcast_users;

use castline_types::{ExtractError, FetchError};
use serde_json::Value;
use url::Url;

/// Extract every raw record, dropping the ones that fail and logging each rejection.
pub(crate) fn extract_each<'a, T, I, F>(source_name: &'static str, raws: I, mut extract: F) -> Vec<T>
where
    I: IntoIterator<Item = &'a Value>,
    F: FnMut(&'a Value) -> Result<T, ExtractError>,
{
    let mut records = Vec::new();
    let mut rejected = 0usize;

    for raw in raws {
        match extract(raw) {
            Ok(record) => records.push(record),
            Err(err) => {
                rejected += 1;
                tracing::warn!(source = source_name, "Rejected record: {}", err);
            }
        }
    }

    if rejected > 0 {
        tracing::warn!(source = source_name, "Rejected {} of {} records", rejected, rejected + records.len());
    }

    records
}

/// Join `path` onto `base` and append query parameters.
pub(crate) fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidRequest(format!("{}: {}", raw, e)))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}
