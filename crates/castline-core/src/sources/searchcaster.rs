use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use castline_trait::{fetcher::Fetcher, http::HttpProvider};
use castline_types::{
    utils::normalize_address, ApiRequest, ExtractError, FetchError, UserEnrichment, UserModel,
};
use serde::Deserialize;
use serde_json::Value;

use super::{build_url, extract_each};
use crate::{
    collect::{fan_out, request_key, FanOut, FanOutOptions},
    retry::RetryPolicy,
};

const SOURCE: &str = "searchcaster";

pub const DEFAULT_SEARCHCASTER_URL: &str = "https://searchcaster.xyz";

/// Looks up the profile of each username on the profile search service.
pub struct ProfileSearchFetcher {
    http: Arc<dyn HttpProvider>,
    policy: RetryPolicy,
    base_url: String,
    fan_out: FanOutOptions,
}

impl ProfileSearchFetcher {
    pub fn new(
        http: Arc<dyn HttpProvider>,
        policy: RetryPolicy,
        base_url: impl Into<String>,
        fan_out: FanOutOptions,
    ) -> Self {
        Self { http, policy, base_url: base_url.into(), fan_out }
    }

    fn profile_request(&self, username: &str) -> Result<ApiRequest, FetchError> {
        let url = build_url(&self.base_url, "api/profiles", &[("username", username)])?;
        Ok(ApiRequest::get(url.as_str()))
    }

    /// The first profile matching `username`.
    async fn fetch_profile(&self, username: String) -> Result<Option<Value>, FetchError> {
        let request = self.profile_request(&username)?;
        match request_key(self.http.as_ref(), &self.policy, &request).await? {
            Some(Value::Array(mut profiles)) if !profiles.is_empty() => Ok(Some(profiles.swap_remove(0))),
            Some(_) => Err(FetchError::Decode {
                url: request.url,
                message: "expected a non-empty array of profiles".to_string(),
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Fetcher for ProfileSearchFetcher {
    type Input = Vec<String>;
    type Raw = FanOut<String, Value>;
    type Output = Vec<UserEnrichment>;

    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_data(&self, usernames: &Vec<String>) -> Result<FanOut<String, Value>, FetchError> {
        fan_out(usernames.clone(), self.fan_out, |username| self.fetch_profile(username)).await
    }

    fn get_models(&self, _usernames: &Vec<String>, raw: FanOut<String, Value>) -> Vec<UserEnrichment> {
        let profiles = extract_each(SOURCE, raw.resolved().map(|(_, value)| value), extract_profile);
        let total = profiles.len();
        let enrichments: Vec<_> = profiles.into_iter().filter_map(ProfileRecord::into_enrichment).collect();
        tracing::debug!("{} of {} profiles carry enrichment data", enrichments.len(), total);
        enrichments
    }
}

/// Profile fields used for enrichment, as reported by the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub fid: i64,
    pub farcaster_address: Option<String>,
    pub external_address: Option<String>,
    pub registered_at: i64,
}

impl ProfileRecord {
    /// Enrichment only applies to profiles with an address and a known registration time.
    pub fn into_enrichment(self) -> Option<UserEnrichment> {
        match self.farcaster_address {
            Some(farcaster_address) if self.registered_at != 0 => Some(UserEnrichment {
                fid: self.fid,
                farcaster_address,
                external_address: self.external_address,
                registered_at: self.registered_at,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    body: RawBody,
    connected_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBody {
    id: i64,
    address: Option<String>,
    registered_at: Option<i64>,
}

pub fn extract_profile(value: &Value) -> Result<ProfileRecord, ExtractError> {
    let raw = RawProfile::deserialize(value).map_err(|e| ExtractError::invalid(SOURCE, e))?;
    Ok(ProfileRecord {
        fid: raw.body.id,
        farcaster_address: raw.body.address.as_deref().map(normalize_address),
        external_address: raw.connected_address.as_deref().map(normalize_address),
        registered_at: raw.body.registered_at.unwrap_or(0),
    })
}

/// Users that received enrichment, with the enrichment applied. Users without
/// a matching enrichment are left out.
pub fn apply_enrichments(users: &[UserModel], enrichments: &[UserEnrichment]) -> Vec<UserModel> {
    let by_fid: HashMap<i64, &UserEnrichment> = enrichments.iter().map(|e| (e.fid, e)).collect();
    users
        .iter()
        .filter_map(|user| {
            by_fid.get(&user.fid).map(|enrichment| {
                let mut user = user.clone();
                user.apply_enrichment(enrichment);
                user
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use castline_trait::http::MockHttpProvider;
    use rstest::rstest;
    use serde_json::json;
    use std::time::Duration;

    fn user(fid: i64, username: &str) -> UserModel {
        UserModel {
            fid,
            username: username.to_string(),
            display_name: String::new(),
            pfp_url: String::new(),
            bio_text: String::new(),
            following_count: 0,
            follower_count: 0,
            location_id: None,
            verified: 0,
            farcaster_address: None,
            external_address: None,
            registered_at: None,
        }
    }

    fn fetcher(http: MockHttpProvider) -> ProfileSearchFetcher {
        ProfileSearchFetcher::new(
            Arc::new(http),
            RetryPolicy::new(2, Duration::from_millis(1)),
            "https://searchcaster.test",
            FanOutOptions::default(),
        )
    }

    #[test]
    fn test_extract_profile() {
        let raw = json!({
            "body": {"id": 7, "address": "0xABC", "registeredAt": 1650000000000i64},
            "connectedAddress": "0xDEF"
        });
        let record = extract_profile(&raw).unwrap();
        assert_eq!(
            record,
            ProfileRecord {
                fid: 7,
                farcaster_address: Some("0xabc".to_string()),
                external_address: Some("0xdef".to_string()),
                registered_at: 1650000000000,
            }
        );
    }

    #[test]
    fn test_extract_profile_requires_id() {
        assert!(extract_profile(&json!({"body": {"address": "0xabc"}})).is_err());
        assert!(extract_profile(&json!({"connectedAddress": "0xabc"})).is_err());
    }

    #[rstest]
    #[case(Some("0xabc"), 1650000000000, true)]
    #[case(Some("0xabc"), 0, false)]
    #[case(None, 1650000000000, false)]
    fn test_into_enrichment_filter(
        #[case] address: Option<&str>,
        #[case] registered_at: i64,
        #[case] applies: bool,
    ) {
        let record = ProfileRecord {
            fid: 1,
            farcaster_address: address.map(str::to_string),
            external_address: None,
            registered_at,
        };
        assert_eq!(record.into_enrichment().is_some(), applies);
    }

    #[test]
    fn test_apply_enrichments_matches_by_fid() {
        let users = vec![user(1, "a"), user(2, "b"), user(3, "c")];
        let enrichments = vec![UserEnrichment {
            fid: 2,
            farcaster_address: "0xabc".to_string(),
            external_address: Some("0xdef".to_string()),
            registered_at: 1650000000000,
        }];

        let updated = apply_enrichments(&users, &enrichments);

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].fid, 2);
        assert_eq!(updated[0].username, "b");
        assert_eq!(updated[0].farcaster_address.as_deref(), Some("0xabc"));
        assert_eq!(updated[0].external_address.as_deref(), Some("0xdef"));
        assert_eq!(updated[0].registered_at, Some(1650000000000));
    }

    #[tokio::test]
    async fn test_fetch_and_extract_enrichments() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json().returning(|req| {
            if req.url.ends_with("username=alice") {
                Ok(json!([
                    {"body": {"id": 1, "address": "0xA", "registeredAt": 5}, "connectedAddress": "0xB"},
                    {"body": {"id": 99, "address": "0xZ", "registeredAt": 6}}
                ]))
            } else if req.url.ends_with("username=bob") {
                Ok(json!([{"body": {"id": 2, "registeredAt": 5}}]))
            } else {
                Err(FetchError::EmptyResponse { url: req.url.clone() })
            }
        });

        let fetcher = fetcher(http);
        let usernames = vec!["alice".to_string(), "bob".to_string(), "ghost".to_string()];
        let raw = fetcher.fetch_data(&usernames).await.unwrap();

        assert_eq!(raw.len(), 3);
        assert_eq!(raw.unavailable(), vec![&"ghost".to_string()]);

        let enrichments = fetcher.get_models(&usernames, raw);
        assert_eq!(
            enrichments,
            vec![UserEnrichment {
                fid: 1,
                farcaster_address: "0xa".to_string(),
                external_address: Some("0xb".to_string()),
                registered_at: 5,
            }]
        );
    }
}
