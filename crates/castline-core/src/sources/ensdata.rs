use std::sync::Arc;

use async_trait::async_trait;
use castline_trait::{fetcher::Fetcher, http::HttpProvider};
use castline_types::{
    utils::normalize_address, ApiRequest, ExternalAddressModel, ExtractError, FetchError,
};
use serde::Deserialize;
use serde_json::Value;

use super::{build_url, extract_each};
use crate::{
    collect::{fan_out, request_key, FanOut, FanOutOptions},
    retry::RetryPolicy,
};

const SOURCE: &str = "ensdata";

pub const DEFAULT_ENSDATA_URL: &str = "https://ensdata.net";

/// Resolves ENS names and linked social handles of external addresses.
pub struct EnsDataFetcher {
    http: Arc<dyn HttpProvider>,
    policy: RetryPolicy,
    base_url: String,
    fan_out: FanOutOptions,
}

impl EnsDataFetcher {
    pub fn new(
        http: Arc<dyn HttpProvider>,
        policy: RetryPolicy,
        base_url: impl Into<String>,
        fan_out: FanOutOptions,
    ) -> Self {
        Self { http, policy, base_url: base_url.into(), fan_out }
    }

    async fn fetch_address(&self, address: String) -> Result<Option<Value>, FetchError> {
        let url = build_url(&self.base_url, &address, &[])?;
        match request_key(self.http.as_ref(), &self.policy, &ApiRequest::get(url.as_str())).await {
            Err(err) if err.is_not_found() => {
                tracing::debug!("No ENS data for {}", address);
                Ok(None)
            }
            other => other,
        }
    }
}

#[async_trait]
impl Fetcher for EnsDataFetcher {
    type Input = Vec<String>;
    type Raw = FanOut<String, Value>;
    type Output = Vec<ExternalAddressModel>;

    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_data(&self, addresses: &Vec<String>) -> Result<FanOut<String, Value>, FetchError> {
        fan_out(addresses.clone(), self.fan_out, |address| self.fetch_address(address)).await
    }

    fn get_models(&self, _addresses: &Vec<String>, raw: FanOut<String, Value>) -> Vec<ExternalAddressModel> {
        extract_each(SOURCE, raw.resolved().map(|(_, value)| value), extract_external_address)
    }
}

#[derive(Debug, Deserialize)]
struct RawEnsRecord {
    address: String,
    ens: Option<String>,
    url: Option<String>,
    github: Option<String>,
    twitter: Option<String>,
    telegram: Option<String>,
    email: Option<String>,
    discord: Option<String>,
}

pub fn extract_external_address(value: &Value) -> Result<ExternalAddressModel, ExtractError> {
    let raw = RawEnsRecord::deserialize(value).map_err(|e| ExtractError::invalid(SOURCE, e))?;
    Ok(ExternalAddressModel {
        address: normalize_address(&raw.address),
        ens: raw.ens,
        url: raw.url,
        github: raw.github,
        twitter: raw.twitter,
        telegram: raw.telegram,
        email: raw.email,
        discord: raw.discord,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use castline_trait::http::MockHttpProvider;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_extract_external_address() {
        let raw = json!({
            "address": "0xAbC",
            "ens": "vitalik.eth",
            "twitter": "VitalikButerin",
            "avatar": "https://img/avatar.png"
        });
        let model = extract_external_address(&raw).unwrap();
        assert_eq!(model.address, "0xabc");
        assert_eq!(model.ens.as_deref(), Some("vitalik.eth"));
        assert_eq!(model.twitter.as_deref(), Some("VitalikButerin"));
        assert!(model.github.is_none());
        assert!(model.discord.is_none());
    }

    #[test]
    fn test_extract_external_address_requires_address() {
        assert!(extract_external_address(&json!({"ens": "nobody.eth"})).is_err());
    }

    #[tokio::test]
    async fn test_not_found_is_absence() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json().returning(|req| {
            if req.url.ends_with("0xknown") {
                Ok(json!({"address": "0xknown", "ens": "known.eth"}))
            } else {
                Err(FetchError::Status { url: req.url.clone(), status: 404 })
            }
        });

        let fetcher = EnsDataFetcher::new(
            Arc::new(http),
            RetryPolicy::new(3, Duration::from_millis(1)),
            "https://ensdata.test",
            FanOutOptions::default(),
        );
        let addresses = vec!["0xknown".to_string(), "0xunknown".to_string()];
        let raw = fetcher.fetch_data(&addresses).await.unwrap();

        assert_eq!(raw.unavailable(), vec![&"0xunknown".to_string()]);

        let models = fetcher.get_models(&addresses, raw);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].ens.as_deref(), Some("known.eth"));
    }
}
