//! Twitter/X platform access
//!
//! `PlatformApi` is the seam between the reply pipeline and the platform: the
//! real implementation talks to API v2 with OAuth 1.0a, tests use a mock.

mod client;
#[cfg(test)]
pub mod mock;
pub mod oauth;

pub use client::TwitterClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum weighted length of a post, as measured by `post_length`
pub const TWEET_MAX_CHARS: usize = 280;

/// Every link is shortened by the platform and counts as this many characters
pub const SHORTENED_URL_CHARS: usize = 23;

/// Code point ranges that count once; everything else counts twice
const SINGLE_WEIGHT_RANGES: [(u32, u32); 4] = [
    (0x0000, 0x10FF),
    (0x2000, 0x200D),
    (0x2010, 0x201F),
    (0x2032, 0x2037),
];

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://\S*[^\s.,!?;:'")\]]"#).expect("valid url pattern"));

/// Longest handle the platform allows (without the leading @)
pub const MAX_HANDLE_CHARS: usize = 15;

/// A post returned by the platform, with its author resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    /// Author handle without the leading @
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Place id when the post carries a geo tag
    pub geo: Option<String>,
    pub is_retweet: bool,
}

/// Error returned by a platform call
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status, absent for transport and decoding failures
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// 401/403 from the platform
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Twitter API error ({}): {}", status, self.message),
            None => write!(f, "Twitter API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Length of `text` as the platform counts it against `TWEET_MAX_CHARS`.
///
/// Links with an explicit scheme count as `SHORTENED_URL_CHARS`; CJK, emoji
/// and other characters outside the single-weight ranges count as 2. Emoji
/// built from several code points are counted per code point, so the result
/// can only overestimate. Bare domains without a scheme are not recognised.
pub fn post_length(text: &str) -> usize {
    let mut length = 0;
    let mut last = 0;
    for url in URL_PATTERN.find_iter(text) {
        length += weighted_chars(&text[last..url.start()]) + SHORTENED_URL_CHARS;
        last = url.end();
    }
    length + weighted_chars(&text[last..])
}

fn weighted_chars(text: &str) -> usize {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if SINGLE_WEIGHT_RANGES
                .iter()
                .any(|&(start, end)| (start..=end).contains(&code))
            {
                1
            } else {
                2
            }
        })
        .sum()
}

/// Platform capabilities consumed by the bot
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Recent posts matching `keyword` newer than `since_id`, oldest first,
    /// at most `count` of them. `since_time` is the creation time of the
    /// last-seen post; implementations fall back to it when `since_id` can no
    /// longer be used.
    async fn search_recent(
        &self,
        keyword: &str,
        count: usize,
        since_id: Option<&str>,
        since_time: DateTime<Utc>,
    ) -> Result<Vec<Post>, ApiError>;

    /// Follow `username` from the bot account
    async fn follow(&self, username: &str) -> Result<(), ApiError>;

    /// Post `text` as a reply to `in_reply_to_id`, returning the new post id
    async fn reply(&self, text: &str, in_reply_to_id: &str) -> Result<String, ApiError>;

    /// The bot account's own most recent post, if it has any
    async fn own_latest_post(&self) -> Result<Option<Post>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_length_plain_text() {
        assert_eq!(post_length(""), 0);
        assert_eq!(post_length("@alice Thanks!"), 14);
        assert_eq!(post_length("café ünïcode"), 12);
    }

    #[test]
    fn test_post_length_counts_wide_characters_twice() {
        assert_eq!(post_length("日本"), 4);
        assert_eq!(post_length("owls 🦉"), 7);
        assert_eq!(post_length("\u{2026}"), 2);
        assert_eq!(post_length("\u{2019}"), 1);
    }

    #[test]
    fn test_post_length_counts_links_as_shortened() {
        assert_eq!(post_length("https://x.co"), SHORTENED_URL_CHARS);
        let long = format!("https://youtu.be/{}", "a".repeat(100));
        assert_eq!(post_length(&long), SHORTENED_URL_CHARS);
        assert_eq!(
            post_length("Watch https://youtu.be/neonharbor now!"),
            6 + SHORTENED_URL_CHARS + 5
        );
        assert_eq!(post_length("see https://youtu.be/x!"), 4 + SHORTENED_URL_CHARS + 1);
    }
}
