use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use castline_trait::{
    fetcher::{Fetcher, PageSource},
    http::HttpProvider,
};
use castline_types::{
    utils::bool_to_flag, ApiRequest, ExtractError, FetchError, LocationModel, Page, UserModel,
};
use serde::Deserialize;
use serde_json::Value;

use super::{build_url, extract_each};
use crate::{
    collect::{collect_pages, request_page},
    retry::RetryPolicy,
};

const SOURCE: &str = "warpcast_users";

pub const DEFAULT_WARPCAST_URL: &str = "https://api.warpcast.com";
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RecentUsersConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_limit: u32,
    /// Pause between consecutive pages.
    pub page_delay: Duration,
}

/// Users and the locations they reference, ready to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserBatch {
    pub users: Vec<UserModel>,
    pub locations: Vec<LocationModel>,
}

/// Walks the recent-users listing of the social network.
pub struct RecentUsersFetcher {
    http: Arc<dyn HttpProvider>,
    policy: RetryPolicy,
    config: RecentUsersConfig,
}

impl RecentUsersFetcher {
    pub fn new(http: Arc<dyn HttpProvider>, policy: RetryPolicy, config: RecentUsersConfig) -> Self {
        Self { http, policy, config }
    }

    fn page_request(&self, cursor: Option<&str>) -> Result<ApiRequest, FetchError> {
        let limit = self.config.page_limit.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let url = build_url(&self.config.base_url, "v2/recent-users", &params)?;
        Ok(ApiRequest::get(url.as_str()).bearer(&self.config.api_key))
    }
}

/// Split a listing body into its items and the cursor of the next page.
pub(crate) fn split_page(url: &str, mut body: Value, items_at: &str, cursor_at: &str) -> Result<Page<Value>, FetchError> {
    let next = body
        .pointer(cursor_at)
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string);

    match body.pointer_mut(items_at).map(Value::take) {
        Some(Value::Array(items)) => Ok(Page { items, next }),
        _ => Err(FetchError::Decode {
            url: url.to_string(),
            message: format!("missing array at {}", items_at),
        }),
    }
}

#[async_trait]
impl PageSource for RecentUsersFetcher {
    type Item = Value;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Value>, FetchError> {
        let request = self.page_request(cursor)?;
        let body = request_page(self.http.as_ref(), &self.policy, &request).await?;
        split_page(request.label(), body, "/result/users", "/next/cursor")
    }
}

#[async_trait]
impl Fetcher for RecentUsersFetcher {
    type Input = ();
    type Raw = Vec<Value>;
    type Output = UserBatch;

    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_data(&self, _input: &()) -> Result<Vec<Value>, FetchError> {
        let users = collect_pages(self, self.config.page_delay).await?;
        tracing::info!("Fetched {} recent users", users.len());
        Ok(users)
    }

    fn get_models(&self, _input: &(), raw: Vec<Value>) -> UserBatch {
        users_from_raw(&raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    fid: i64,
    username: String,
    display_name: Option<String>,
    pfp: Option<RawPfp>,
    profile: Option<RawProfile>,
    following_count: Option<i64>,
    follower_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPfp {
    url: Option<String>,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    bio: Option<RawBio>,
    location: Option<RawLocation>,
}

#[derive(Debug, Deserialize)]
struct RawBio {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocation {
    place_id: Option<String>,
    description: Option<String>,
}

/// Convert one raw user. The location is returned only when the user has a place id.
pub fn extract_user(value: &Value) -> Result<(UserModel, Option<LocationModel>), ExtractError> {
    let raw = RawUser::deserialize(value).map_err(|e| ExtractError::invalid(SOURCE, e))?;

    let (bio, location) = match raw.profile {
        Some(profile) => (profile.bio.and_then(|bio| bio.text), profile.location),
        None => (None, None),
    };
    let location = location.and_then(|location| match location.place_id {
        Some(id) if !id.is_empty() => {
            Some(LocationModel { id, description: location.description.unwrap_or_default() })
        }
        _ => None,
    });
    let (pfp_url, verified) = match raw.pfp {
        Some(pfp) => (pfp.url.unwrap_or_default(), pfp.verified),
        None => (String::new(), false),
    };

    let user = UserModel {
        fid: raw.fid,
        username: raw.username,
        display_name: raw.display_name.unwrap_or_default(),
        pfp_url,
        bio_text: bio.unwrap_or_default(),
        following_count: raw.following_count.unwrap_or(0),
        follower_count: raw.follower_count.unwrap_or(0),
        location_id: location.as_ref().map(|location| location.id.clone()),
        verified: bool_to_flag(verified),
        farcaster_address: None,
        external_address: None,
        registered_at: None,
    };

    Ok((user, location))
}

/// Convert a listing into distinct users plus their distinct locations. A user
/// or location seen twice keeps its first position and its last content.
pub fn users_from_raw(raw: &[Value]) -> UserBatch {
    let extracted = extract_each(SOURCE, raw, extract_user);

    let mut batch = UserBatch::default();
    let mut user_positions: HashMap<i64, usize> = HashMap::new();
    let mut location_positions: HashMap<String, usize> = HashMap::new();

    for (user, location) in extracted {
        if let Some(location) = location {
            match location_positions.get(&location.id) {
                Some(&index) => batch.locations[index] = location,
                None => {
                    location_positions.insert(location.id.clone(), batch.locations.len());
                    batch.locations.push(location);
                }
            }
        }
        match user_positions.get(&user.fid) {
            Some(&index) => batch.users[index] = user,
            None => {
                user_positions.insert(user.fid, batch.users.len());
                batch.users.push(user);
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use castline_trait::http::MockHttpProvider;
    use castline_types::HttpMethod;
    use mockall::Sequence;
    use serde_json::json;

    fn config() -> RecentUsersConfig {
        RecentUsersConfig {
            base_url: "https://api.warpcast.test".to_string(),
            api_key: "secret".to_string(),
            page_limit: 2,
            page_delay: Duration::ZERO,
        }
    }

    fn full_user() -> Value {
        json!({
            "fid": 3,
            "username": "dwr",
            "displayName": "Dan",
            "pfp": {"url": "https://img/dwr.png", "verified": true},
            "profile": {
                "bio": {"text": "hello"},
                "location": {"placeId": "p1", "description": "LA"}
            },
            "followingCount": 10,
            "followerCount": 20
        })
    }

    #[test]
    fn test_extract_user_full_record() {
        let (user, location) = extract_user(&full_user()).unwrap();

        assert_eq!(user.fid, 3);
        assert_eq!(user.username, "dwr");
        assert_eq!(user.display_name, "Dan");
        assert_eq!(user.pfp_url, "https://img/dwr.png");
        assert_eq!(user.bio_text, "hello");
        assert_eq!(user.following_count, 10);
        assert_eq!(user.follower_count, 20);
        assert_eq!(user.verified, 1);
        assert_eq!(user.location_id.as_deref(), Some("p1"));
        assert_eq!(location, Some(LocationModel { id: "p1".to_string(), description: "LA".to_string() }));
    }

    #[test]
    fn test_extract_user_defaults() {
        let (user, location) = extract_user(&json!({"fid": 9, "username": "x"})).unwrap();

        assert_eq!(user.display_name, "");
        assert_eq!(user.pfp_url, "");
        assert_eq!(user.bio_text, "");
        assert_eq!(user.following_count, 0);
        assert_eq!(user.follower_count, 0);
        assert_eq!(user.verified, 0);
        assert!(user.location_id.is_none());
        assert!(location.is_none());
    }

    #[test]
    fn test_extract_user_empty_place_id_has_no_location() {
        let raw = json!({
            "fid": 9,
            "username": "x",
            "profile": {"location": {"placeId": "", "description": "Nowhere"}}
        });
        let (user, location) = extract_user(&raw).unwrap();
        assert!(user.location_id.is_none());
        assert!(location.is_none());
    }

    #[test]
    fn test_extract_user_missing_fid_is_rejected() {
        let err = extract_user(&json!({"username": "x"})).unwrap_err();
        assert!(matches!(err, ExtractError::Invalid { source_name: "warpcast_users", .. }));
    }

    #[test]
    fn test_users_from_raw_dedupes_locations() {
        let raw = vec![
            json!({"fid": 1, "username": "a", "profile": {"location": {"placeId": "p1", "description": "Old"}}}),
            json!({"fid": 2, "username": "b", "profile": {"location": {"placeId": "p2", "description": "Paris"}}}),
            json!({"username": "no-fid"}),
            json!({"fid": 4, "username": "d", "profile": {"location": {"placeId": "p1", "description": "New"}}}),
        ];

        let batch = users_from_raw(&raw);

        assert_eq!(batch.users.iter().map(|u| u.fid).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(
            batch.locations,
            vec![
                LocationModel { id: "p1".to_string(), description: "New".to_string() },
                LocationModel { id: "p2".to_string(), description: "Paris".to_string() },
            ]
        );
    }

    #[test]
    fn test_users_from_raw_dedupes_repeated_fid() {
        let raw = vec![
            json!({"fid": 7, "username": "before", "followerCount": 1}),
            json!({"fid": 8, "username": "other"}),
            json!({"fid": 7, "username": "after", "followerCount": 2}),
        ];

        let batch = users_from_raw(&raw);

        assert_eq!(batch.users.len(), 2);
        assert_eq!(batch.users.iter().map(|u| u.fid).collect::<Vec<_>>(), vec![7, 8]);
        assert_eq!(batch.users[0].username, "after");
        assert_eq!(batch.users[0].follower_count, 2);
    }

    #[test]
    fn test_split_page_shape_error() {
        let err = split_page("u", json!({"result": {}}), "/result/users", "/next/cursor").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));

        let page = split_page(
            "u",
            json!({"result": {"users": [1, 2]}, "next": {"cursor": ""}}),
            "/result/users",
            "/next/cursor",
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_fetch_data_walks_all_pages() {
        let mut http = MockHttpProvider::new();
        let mut seq = Sequence::new();

        http.expect_send_json()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url == "https://api.warpcast.test/v2/recent-users?limit=2"
                    && req.headers.contains(&("Authorization".to_string(), "Bearer secret".to_string()))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(json!({
                    "result": {"users": [{"fid": 1, "username": "a"}, {"fid": 2, "username": "b"}]},
                    "next": {"cursor": "abc"}
                }))
            });
        http.expect_send_json()
            .withf(|req| req.url == "https://api.warpcast.test/v2/recent-users?limit=2&cursor=abc")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({"result": {"users": [{"fid": 3, "username": "c"}]}})));

        let fetcher = RecentUsersFetcher::new(Arc::new(http), RetryPolicy::default(), config());
        let raw = fetcher.fetch_data(&()).await.unwrap();
        let batch = fetcher.get_models(&(), raw);

        assert_eq!(batch.users.iter().map(|u| u.fid).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(batch.locations.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_data_aborts_on_unavailable_page() {
        let mut http = MockHttpProvider::new();
        http.expect_send_json()
            .times(2)
            .returning(|req| Err(FetchError::Status { url: req.url.clone(), status: 502 }));

        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let fetcher = RecentUsersFetcher::new(Arc::new(http), policy, config());

        let err = fetcher.fetch_data(&()).await.unwrap_err();
        assert!(matches!(err, FetchError::PageUnavailable { attempts: 2, .. }));
    }
}
