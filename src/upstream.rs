//! Upstream platform API collaborator.
//!
//! The sync engine only depends on the [`LikesSource`] trait; [`ApiClient`]
//! implements it against the X API v2 with bearer-token auth. Upstream calls
//! are metered and rate-limited, so every request carries a bounded timeout
//! and failures surface as recoverable errors rather than retries.

use crate::config::UpstreamConfig;
use crate::error::{Result, XlikesError};
use crate::model::{LikedPage, PublishedTweet, RawLike};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// A paginated source of liked items plus a publish endpoint.
pub trait LikesSource {
    /// Fetch one page of liked items, newest first.
    ///
    /// `cursor` is the pagination token from the previous page, `None` for
    /// the first page. A `None` `next_cursor` in the result means done.
    ///
    /// # Errors
    ///
    /// Returns an upstream error on transport, auth, or rate-limit failure.
    fn fetch_liked(&self, cursor: Option<&str>, page_size: u32) -> Result<LikedPage>;

    /// Publish a post. The caller validates length before invoking this.
    ///
    /// # Errors
    ///
    /// Returns an upstream error on transport, auth, or rate-limit failure.
    fn publish(&self, text: &str) -> Result<PublishedTweet>;
}

// -- X API v2 wire types ------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LikedTweetsResponse {
    #[serde(default)]
    data: Vec<ApiTweet>,
    #[serde(default)]
    includes: Option<ApiIncludes>,
    #[serde(default)]
    meta: Option<ApiMeta>,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    public_metrics: Option<ApiMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMetrics {
    #[serde(default)]
    retweet_count: Option<i64>,
    #[serde(default)]
    like_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiIncludes {
    #[serde(default)]
    users: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMeta {
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    data: PublishData,
}

#[derive(Debug, Deserialize)]
struct PublishData {
    id: String,
    text: String,
}

/// X API v2 client.
pub struct ApiClient {
    http: Client,
    base_url: String,
    bearer_token: String,
    user_id: String,
}

impl ApiClient {
    /// Build a client from the upstream config section.
    ///
    /// # Errors
    ///
    /// Returns a credentials error when the bearer token or user id is
    /// missing, or a transport error if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let config_hint = crate::config::Config::user_config_path()
            .map_or_else(|| "the config file".to_string(), |p| p.display().to_string());

        let bearer_token = config
            .bearer_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| XlikesError::MissingCredentials {
                reason: "bearer_token is not set".to_string(),
                config_hint: config_hint.clone(),
            })?;
        let user_id = config
            .user_id
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| XlikesError::MissingCredentials {
                reason: "user_id is not set".to_string(),
                config_hint,
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("xlikes/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token,
            user_id,
        })
    }

    fn check_status(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(XlikesError::upstream(Some(status.as_u16()), body))
    }
}

impl LikesSource for ApiClient {
    fn fetch_liked(&self, cursor: Option<&str>, page_size: u32) -> Result<LikedPage> {
        let url = format!("{}/2/users/{}/liked_tweets", self.base_url, self.user_id);
        let page_size = page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("max_results", page_size.as_str()),
            ("tweet.fields", "created_at,public_metrics,author_id"),
            ("user.fields", "username,name"),
            ("expansions", "author_id"),
        ];
        if let Some(token) = cursor {
            query.push(("pagination_token", token));
        }

        debug!("GET {} (cursor={:?})", url, cursor);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&query)
            .send()?;
        let parsed: LikedTweetsResponse = Self::check_status(resp)?.json()?;

        let users: HashMap<String, ApiUser> = parsed
            .includes
            .map(|inc| inc.users.into_iter().map(|u| (u.id.clone(), u)).collect())
            .unwrap_or_default();

        let items = parsed
            .data
            .into_iter()
            .map(|t| {
                let author = t.author_id.as_deref().and_then(|id| users.get(id));
                let handle = author
                    .and_then(|u| u.username.clone())
                    .unwrap_or_default();
                let metrics = t.public_metrics.unwrap_or_default();
                RawLike {
                    tweet_url: Some(format!(
                        "https://twitter.com/{handle}/status/{}",
                        t.id
                    )),
                    tweet_id: Some(t.id),
                    created_at: t.created_at,
                    text: t.text,
                    author_name: author.and_then(|u| u.name.clone()),
                    author_screen_name: Some(handle),
                    author_id: t.author_id,
                    retweet_count: metrics.retweet_count,
                    favorite_count: metrics.like_count,
                }
            })
            .collect();

        Ok(LikedPage {
            items,
            next_cursor: parsed.meta.and_then(|m| m.next_token),
        })
    }

    fn publish(&self, text: &str) -> Result<PublishedTweet> {
        let url = format!("{}/2/tweets", self.base_url);
        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&serde_json::json!({ "text": text }))
            .send()?;
        let parsed: PublishResponse = Self::check_status(resp)?.json()?;
        Ok(PublishedTweet {
            id: parsed.data.id,
            text: parsed.data.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    #[test]
    fn client_requires_credentials() {
        let config = UpstreamConfig::default();
        assert!(matches!(
            ApiClient::new(&config),
            Err(XlikesError::MissingCredentials { .. })
        ));

        let config = UpstreamConfig {
            bearer_token: Some("tok".to_string()),
            ..UpstreamConfig::default()
        };
        assert!(ApiClient::new(&config).is_err());

        let config = UpstreamConfig {
            bearer_token: Some("tok".to_string()),
            user_id: Some("42".to_string()),
            ..UpstreamConfig::default()
        };
        assert!(ApiClient::new(&config).is_ok());
    }

    #[test]
    fn liked_tweets_response_maps_to_raw_items() {
        let body = r#"{
            "data": [
                {
                    "id": "100",
                    "text": "hello",
                    "created_at": "2025-06-01T12:00:00.000Z",
                    "author_id": "9",
                    "public_metrics": {"retweet_count": 2, "like_count": 5}
                }
            ],
            "includes": {"users": [{"id": "9", "name": "Alice", "username": "alice"}]},
            "meta": {"next_token": "tok123"}
        }"#;
        let parsed: LikedTweetsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.meta.unwrap().next_token.as_deref(), Some("tok123"));

        let users: HashMap<String, ApiUser> = parsed
            .includes
            .map(|inc| inc.users.into_iter().map(|u| (u.id.clone(), u)).collect())
            .unwrap_or_default();
        assert_eq!(users["9"].username.as_deref(), Some("alice"));
    }

    #[test]
    fn empty_response_deserializes() {
        let parsed: LikedTweetsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
        assert!(parsed.meta.is_none());
    }
}
