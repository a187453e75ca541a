use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use castline_trait::{
    fetcher::{Fetcher, PageSource},
    http::HttpProvider,
};
use castline_types::{ApiRequest, ExtractError, FetchError, Page, ReactionModel};
use serde::Deserialize;
use serde_json::Value;

use super::{build_url, extract_each, warpcast_users::split_page};
use crate::{
    collect::{collect_pages, fan_out, request_page, FanOutOptions},
    retry::RetryPolicy,
};

const SOURCE: &str = "warpcast_reactions";

pub const REACTIONS_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_REACTIONS_CHUNK: usize = 10;

#[derive(Debug, Clone)]
pub struct CastReactionsConfig {
    pub base_url: String,
    pub api_key: String,
    /// Casts fetched per concurrent wave.
    pub chunk_size: usize,
}

/// Reactions of a single cast, walked page by page.
struct CastReactionPages<'a> {
    fetcher: &'a CastReactionsFetcher,
    cast_hash: &'a str,
}

#[async_trait]
impl<'a> PageSource for CastReactionPages<'a> {
    type Item = Value;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Value>, FetchError> {
        let request = self.fetcher.page_request(self.cast_hash, cursor)?;
        let body = request_page(self.fetcher.http.as_ref(), &self.fetcher.policy, &request).await?;
        split_page(request.label(), body, "/result/reactions", "/next/cursor")
    }
}

/// Collects the reactions of a list of casts.
pub struct CastReactionsFetcher {
    http: Arc<dyn HttpProvider>,
    policy: RetryPolicy,
    config: CastReactionsConfig,
    fan_out: FanOutOptions,
}

impl CastReactionsFetcher {
    pub fn new(
        http: Arc<dyn HttpProvider>,
        policy: RetryPolicy,
        config: CastReactionsConfig,
        fan_out: FanOutOptions,
    ) -> Self {
        Self { http, policy, config, fan_out }
    }

    fn page_request(&self, cast_hash: &str, cursor: Option<&str>) -> Result<ApiRequest, FetchError> {
        let limit = REACTIONS_PAGE_LIMIT.to_string();
        let mut params = vec![("castHash", cast_hash), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let url = build_url(&self.config.base_url, "v2/cast-reactions", &params)?;
        Ok(ApiRequest::get(url.as_str()).bearer(&self.config.api_key))
    }

    /// All reactions of one cast. A page that stays unavailable loses this
    /// cast only.
    async fn fetch_cast(&self, cast_hash: String) -> Result<Option<Vec<Value>>, FetchError> {
        let pages = CastReactionPages { fetcher: self, cast_hash: &cast_hash };
        match collect_pages(&pages, Duration::ZERO).await {
            Ok(reactions) => Ok(Some(reactions)),
            Err(err @ FetchError::PageUnavailable { .. }) => {
                tracing::warn!("Skipping reactions of cast {}: {}", cast_hash, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Fetcher for CastReactionsFetcher {
    type Input = Vec<String>;
    /// Raw reactions per cast, casts without reactions left out.
    type Raw = Vec<(String, Vec<Value>)>;
    type Output = Vec<ReactionModel>;

    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_data(&self, cast_hashes: &Vec<String>) -> Result<Self::Raw, FetchError> {
        let mut reactions = Vec::new();
        let mut skipped = 0usize;

        for chunk in cast_hashes.chunks(self.config.chunk_size.max(1)) {
            let wave = fan_out(chunk.to_vec(), self.fan_out, |hash| self.fetch_cast(hash)).await?;
            for (cast_hash, cast_reactions) in wave.into_entries() {
                match cast_reactions {
                    Some(cast_reactions) if !cast_reactions.is_empty() => {
                        reactions.push((cast_hash, cast_reactions))
                    }
                    Some(_) => {}
                    None => skipped += 1,
                }
            }
        }

        tracing::info!(
            "Fetched reactions of {} casts out of {}, {} skipped",
            reactions.len(),
            cast_hashes.len(),
            skipped
        );
        Ok(reactions)
    }

    fn get_models(&self, _cast_hashes: &Vec<String>, raw: Self::Raw) -> Vec<ReactionModel> {
        extract_each(SOURCE, raw.iter().flat_map(|(_, reactions)| reactions.iter()), extract_reaction)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReaction {
    #[serde(rename = "type")]
    reaction_type: String,
    hash: String,
    timestamp: i64,
    cast_hash: String,
    reactor: RawReactor,
}

#[derive(Debug, Deserialize)]
struct RawReactor {
    fid: i64,
}

pub fn extract_reaction(value: &Value) -> Result<ReactionModel, ExtractError> {
    let raw = RawReaction::deserialize(value).map_err(|e| ExtractError::invalid(SOURCE, e))?;
    Ok(ReactionModel {
        hash: raw.hash,
        reaction_type: raw.reaction_type,
        timestamp: raw.timestamp,
        target_hash: raw.cast_hash,
        author_fid: raw.reactor.fid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use castline_trait::http::MockHttpProvider;
    use serde_json::json;

    fn reaction(hash: &str, cast: &str, fid: i64) -> Value {
        json!({
            "type": "like",
            "hash": hash,
            "timestamp": 1680000000000i64,
            "castHash": cast,
            "reactor": {"fid": fid, "username": "someone"}
        })
    }

    fn fetcher(http: MockHttpProvider, chunk_size: usize) -> CastReactionsFetcher {
        CastReactionsFetcher::new(
            Arc::new(http),
            RetryPolicy::new(2, Duration::from_millis(1)),
            CastReactionsConfig {
                base_url: "https://api.warpcast.test".to_string(),
                api_key: "secret".to_string(),
                chunk_size,
            },
            FanOutOptions::default(),
        )
    }

    #[test]
    fn test_extract_reaction() {
        let model = extract_reaction(&reaction("0xr1", "0xc1", 42)).unwrap();
        assert_eq!(
            model,
            ReactionModel {
                hash: "0xr1".to_string(),
                reaction_type: "like".to_string(),
                timestamp: 1680000000000,
                target_hash: "0xc1".to_string(),
                author_fid: 42,
            }
        );
    }

    #[test]
    fn test_extract_reaction_missing_reactor_is_rejected() {
        let raw = json!({"type": "like", "hash": "0xr1", "timestamp": 1, "castHash": "0xc1"});
        assert!(extract_reaction(&raw).is_err());
    }

    #[tokio::test]
    async fn test_fetch_data_paginates_and_skips() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json().returning(|req| {
            let url = req.url.as_str();
            if url.contains("castHash=0xc1") && !url.contains("cursor=") {
                Ok(json!({
                    "result": {"reactions": [reaction("0xr1", "0xc1", 1)]},
                    "next": {"cursor": "more"}
                }))
            } else if url.contains("castHash=0xc1") {
                Ok(json!({"result": {"reactions": [reaction("0xr2", "0xc1", 2)]}}))
            } else if url.contains("castHash=0xc2") {
                Ok(json!({"result": {"reactions": []}}))
            } else {
                Err(FetchError::Status { url: req.url.clone(), status: 503 })
            }
        });

        let fetcher = fetcher(http, 2);
        let casts = vec!["0xc1".to_string(), "0xc2".to_string(), "0xc3".to_string()];
        let raw = fetcher.fetch_data(&casts).await.unwrap();

        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].0, "0xc1");
        assert_eq!(raw[0].1.len(), 2);

        let models = fetcher.get_models(&casts, raw);
        assert_eq!(models.iter().map(|m| m.hash.as_str()).collect::<Vec<_>>(), vec!["0xr1", "0xr2"]);
        assert!(models.iter().all(|m| m.target_hash == "0xc1"));
    }

    #[tokio::test]
    async fn test_fetch_data_drops_partial_cast_when_later_page_is_exhausted() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json().returning(|req| {
            let url = req.url.as_str();
            if url.contains("castHash=0xc1") && !url.contains("cursor=") {
                Ok(json!({
                    "result": {"reactions": [reaction("0xr1", "0xc1", 1)]},
                    "next": {"cursor": "more"}
                }))
            } else if url.contains("castHash=0xc1") {
                Err(FetchError::Status { url: req.url.clone(), status: 503 })
            } else {
                Ok(json!({"result": {"reactions": [reaction("0xr9", "0xc2", 9)]}}))
            }
        });

        let fetcher = fetcher(http, 5);
        let casts = vec!["0xc1".to_string(), "0xc2".to_string()];
        let raw = fetcher.fetch_data(&casts).await.unwrap();

        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].0, "0xc2");
        assert_eq!(raw[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_data_permanent_error_aborts() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json()
            .returning(|req| Err(FetchError::Status { url: req.url.clone(), status: 401 }));

        let fetcher = fetcher(http, 5);
        let err = fetcher.fetch_data(&vec!["0xc1".to_string()]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, .. }));
    }
}
