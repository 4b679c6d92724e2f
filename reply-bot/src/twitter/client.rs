//! Twitter API v2 client (OAuth 1.0a user context)

use super::oauth::{generate_oauth_header, url_with_query};
use super::{ApiError, PlatformApi, Post};
use crate::credentials::TwitterCredentials;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;

/// Recent search accepts 10..=100 results per page
const SEARCH_MIN_RESULTS: usize = 10;
const SEARCH_MAX_RESULTS: usize = 100;

/// User timeline accepts 5..=100 results per page
const TIMELINE_MIN_RESULTS: &str = "5";

/// Recent search only reaches this far back
const SEARCH_WINDOW_DAYS: i64 = 7;
/// Distance kept from both ends of the search window
const SEARCH_WINDOW_MARGIN_MINUTES: i64 = 10;
/// `start_time` must be at least this far in the past
const MIN_START_AGE_SECONDS: i64 = 10;

/// Epoch of post ids (Unix milliseconds); the id's upper bits are the
/// creation time relative to it
pub(super) const SNOWFLAKE_EPOCH_MS: i64 = 1_288_834_974_657;
pub(super) const SNOWFLAKE_TIME_SHIFT: u32 = 22;

const TWEET_FIELDS: &str = "author_id,created_at,geo,referenced_tweets";

/// Warn once remaining calls in the rate window drop to this level
const RATE_LIMIT_WARN_THRESHOLD: u32 = 3;

#[derive(Debug, Deserialize)]
struct TwitterApiError {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TwitterApiError {
    fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

fn join_errors(errors: &[TwitterApiError]) -> String {
    errors
        .iter()
        .map(|e| e.describe())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<TwitterUser>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    geo: Option<TweetGeo>,
    referenced_tweets: Option<Vec<ReferencedTweet>>,
}

#[derive(Debug, Deserialize)]
struct TweetGeo {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferencedTweet {
    #[serde(rename = "type")]
    ref_type: String,
}

#[derive(Debug, Deserialize)]
struct Includes {
    users: Option<Vec<TwitterUser>>,
}

/// Response shape shared by recent search and user timelines
#[derive(Debug, Deserialize)]
struct TweetsResponse {
    data: Option<Vec<Tweet>>,
    includes: Option<Includes>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct PostTweetResponse {
    data: Option<PostedTweet>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct PostedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FollowResponse {
    data: Option<FollowData>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct FollowData {
    following: bool,
    #[serde(default)]
    pending_follow: bool,
}

/// Rate limit information from response headers
#[derive(Debug, Clone, Default)]
struct RateLimitInfo {
    remaining: Option<u32>,
    /// Unix timestamp when the window resets
    reset_at: Option<u64>,
}

impl RateLimitInfo {
    fn from_response(response: &reqwest::Response) -> Self {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        Self {
            remaining: header("x-rate-limit-remaining").and_then(|v| v.parse().ok()),
            reset_at: header("x-rate-limit-reset").and_then(|v| v.parse().ok()),
        }
    }

    fn seconds_until_reset(&self) -> Option<u64> {
        self.reset_at.map(|reset| {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            reset.saturating_sub(now)
        })
    }

    fn warn_if_low(&self, endpoint: &str) {
        if let Some(remaining) = self.remaining {
            if remaining <= RATE_LIMIT_WARN_THRESHOLD {
                log::warn!(
                    "Twitter: Rate limit low on {} ({} remaining), reset in {:?}s",
                    endpoint,
                    remaining,
                    self.seconds_until_reset()
                );
            }
        }
    }
}

/// Authenticated session against the Twitter API v2
pub struct TwitterClient {
    http: reqwest::Client,
    api_base: String,
    credentials: TwitterCredentials,
    user_id: String,
    username: String,
}

impl TwitterClient {
    /// Verify the credentials against `/users/me` and open a session for
    /// that account
    pub async fn authenticate(
        credentials: TwitterCredentials,
        api_base: &str,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::new();
        let api_base = api_base.trim_end_matches('/').to_string();
        let url = format!("{}/users/me", api_base);

        let response: UserResponse = get_json(&http, &credentials, &url, &[]).await?;
        let me = match (response.data, response.errors) {
            (Some(user), _) => user,
            (None, Some(errors)) => return Err(ApiError::new(join_errors(&errors))),
            (None, None) => return Err(ApiError::new("No user data returned")),
        };

        log::info!("Twitter: Credentials validated for @{} (id={})", me.username, me.id);

        Ok(Self {
            http,
            api_base,
            credentials,
            user_id: me.id,
            username: me.username,
        })
    }

    /// Handle of the authenticated account
    pub fn username(&self) -> &str {
        &self.username
    }

    async fn lookup_user_id(&self, username: &str) -> Result<String, ApiError> {
        let url = format!("{}/users/by/username/{}", self.api_base, username);
        let response: UserResponse = get_json(&self.http, &self.credentials, &url, &[]).await?;
        match (response.data, response.errors) {
            (Some(user), _) => Ok(user.id),
            (None, Some(errors)) => Err(ApiError::new(join_errors(&errors))),
            (None, None) => Err(ApiError::new(format!("User @{} not found", username))),
        }
    }
}

#[async_trait]
impl PlatformApi for TwitterClient {
    async fn search_recent(
        &self,
        keyword: &str,
        count: usize,
        since_id: Option<&str>,
        since_time: DateTime<Utc>,
    ) -> Result<Vec<Post>, ApiError> {
        let url = format!("{}/tweets/search/recent", self.api_base);
        let max_results = count.clamp(SEARCH_MIN_RESULTS, SEARCH_MAX_RESULTS).to_string();

        let (start_key, start_value) = match search_start(since_id, since_time, Utc::now()) {
            SearchStart::SinceId(id) => ("since_id", id),
            SearchStart::StartTime(time) => {
                if let Some(id) = since_id {
                    log::info!(
                        "Twitter: Post {} is outside the recent search window, searching from {}",
                        id,
                        time
                    );
                }
                ("start_time", time.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        };

        let params: Vec<(&str, &str)> = vec![
            ("query", keyword),
            ("max_results", max_results.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", "author_id"),
            ("user.fields", "username"),
            (start_key, start_value.as_str()),
        ];

        let response: TweetsResponse = get_json(&self.http, &self.credentials, &url, &params).await?;
        if response.data.is_none() {
            if let Some(errors) = &response.errors {
                return Err(ApiError::new(join_errors(errors)));
            }
        }

        Ok(posts_from_response(response, count))
    }

    async fn follow(&self, username: &str) -> Result<(), ApiError> {
        let target_user_id = self.lookup_user_id(username).await?;
        let url = format!("{}/users/{}/following", self.api_base, self.user_id);
        let body = json!({ "target_user_id": target_user_id });

        let response: FollowResponse = post_json(&self.http, &self.credentials, &url, &body).await?;
        match (response.data, response.errors) {
            (Some(data), _) => {
                if data.pending_follow {
                    log::info!("Twitter: Follow request to @{} is pending approval", username);
                } else if data.following {
                    log::debug!("Twitter: Now following @{}", username);
                }
                Ok(())
            }
            (None, Some(errors)) => Err(ApiError::new(join_errors(&errors))),
            (None, None) => Err(ApiError::new("Unexpected response format from follow endpoint")),
        }
    }

    async fn reply(&self, text: &str, in_reply_to_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/tweets", self.api_base);
        let body = json!({
            "text": text,
            "reply": { "in_reply_to_tweet_id": in_reply_to_id },
        });

        let response: PostTweetResponse = post_json(&self.http, &self.credentials, &url, &body).await?;
        match (response.data, response.errors) {
            (Some(posted), _) => Ok(posted.id),
            (None, Some(errors)) => Err(ApiError::new(join_errors(&errors))),
            (None, None) => Err(ApiError::new("Unexpected response format from Twitter API")),
        }
    }

    async fn own_latest_post(&self) -> Result<Option<Post>, ApiError> {
        let url = format!("{}/users/{}/tweets", self.api_base, self.user_id);
        let params = [
            ("max_results", TIMELINE_MIN_RESULTS),
            ("tweet.fields", TWEET_FIELDS),
        ];

        let response: TweetsResponse = get_json(&self.http, &self.credentials, &url, &params).await?;
        let latest = response
            .data
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|tweet| {
                let author_id = self.user_id.clone();
                into_post(tweet, author_id, self.username.clone())
            });
        Ok(latest)
    }
}

/// Where a recent search begins
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchStart {
    SinceId(String),
    StartTime(DateTime<Utc>),
}

/// `since_id` is only accepted while the post it names is inside the search
/// window; otherwise search from `since_time`, clamped into the window.
fn search_start(
    since_id: Option<&str>,
    since_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SearchStart {
    let window_start =
        now - Duration::days(SEARCH_WINDOW_DAYS) + Duration::minutes(SEARCH_WINDOW_MARGIN_MINUTES);

    if let Some(id) = since_id {
        if snowflake_time(id).is_some_and(|created| created > window_start) {
            return SearchStart::SinceId(id.to_string());
        }
    }

    let latest_start = now - Duration::seconds(MIN_START_AGE_SECONDS);
    SearchStart::StartTime(since_time.max(window_start).min(latest_start))
}

/// Creation time encoded in a post id
fn snowflake_time(id: &str) -> Option<DateTime<Utc>> {
    let id: i64 = id.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis((id >> SNOWFLAKE_TIME_SHIFT) + SNOWFLAKE_EPOCH_MS)
}

/// Signed GET returning the decoded JSON body
async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    credentials: &TwitterCredentials,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, ApiError> {
    let auth_header = generate_oauth_header("GET", url, credentials, Some(params));

    let response = http
        .get(url_with_query(url, params))
        .header("Authorization", auth_header)
        .send()
        .await
        .map_err(|e| ApiError::new(format!("Request failed: {}", e)))?;

    RateLimitInfo::from_response(&response).warn_if_low(url);
    decode_response(response).await
}

/// Signed POST with a JSON body (the body is not part of the signature)
async fn post_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    credentials: &TwitterCredentials,
    url: &str,
    body: &serde_json::Value,
) -> Result<T, ApiError> {
    let auth_header = generate_oauth_header("POST", url, credentials, None);

    let response = http
        .post(url)
        .header("Authorization", auth_header)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ApiError::new(format!("Request failed: {}", e)))?;

    RateLimitInfo::from_response(&response).warn_if_low(url);
    decode_response(response).await
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    log::debug!("Twitter response ({}): {}", status, body);

    if !status.is_success() {
        return Err(ApiError::with_status(status.as_u16(), body));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::new(format!("Failed to parse response: {}", e)))
}

/// Resolve authors and convert a search page to posts: newest `count` kept,
/// returned oldest first
fn posts_from_response(response: TweetsResponse, count: usize) -> Vec<Post> {
    let usernames: HashMap<String, String> = response
        .includes
        .and_then(|inc| inc.users)
        .unwrap_or_default()
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let mut posts: Vec<Post> = response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tweet| {
            let Some(author_id) = tweet.author_id.clone() else {
                log::warn!("Twitter: Post {} has no author id, skipping", tweet.id);
                return None;
            };
            let Some(username) = usernames.get(&author_id).cloned() else {
                log::warn!("Twitter: Could not resolve author {} of post {}, skipping", author_id, tweet.id);
                return None;
            };
            into_post(tweet, author_id, username)
        })
        .take(count)
        .collect();

    posts.reverse();
    posts
}

fn into_post(tweet: Tweet, author_id: String, author: String) -> Option<Post> {
    let Some(created_at) = tweet.created_at else {
        log::warn!("Twitter: Post {} has no creation time, skipping", tweet.id);
        return None;
    };
    let is_retweet = tweet
        .referenced_tweets
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|r| r.ref_type == "retweeted");

    Some(Post {
        id: tweet.id,
        author_id,
        author,
        text: tweet.text,
        created_at,
        geo: tweet.geo.and_then(|g| g.place_id),
        is_retweet,
    })
}
