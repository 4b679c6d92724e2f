//! In-memory `PlatformApi` for tests: canned search results plus a log of
//! every action the pipeline issued.

use super::{ApiError, PlatformApi, Post};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Search {
        keyword: String,
        count: usize,
        since_id: Option<String>,
        since_time: DateTime<Utc>,
    },
    Follow(String),
    Reply {
        text: String,
        in_reply_to_id: String,
    },
}

#[derive(Default)]
pub struct MockPlatform {
    search_results: Vec<Post>,
    own_post: Option<Post>,
    /// Reply to this post id fails with a 403
    fail_reply_to: Option<String>,
    actions: Mutex<Vec<Action>>,
}

impl MockPlatform {
    pub fn new(search_results: Vec<Post>) -> Self {
        Self {
            search_results,
            ..Default::default()
        }
    }

    pub fn with_own_post(mut self, post: Post) -> Self {
        self.own_post = Some(post);
        self
    }

    pub fn failing_reply_to(mut self, post_id: &str) -> Self {
        self.fail_reply_to = Some(post_id.to_string());
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Reply { text, in_reply_to_id } => Some((text, in_reply_to_id)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn search_recent(
        &self,
        keyword: &str,
        count: usize,
        since_id: Option<&str>,
        since_time: DateTime<Utc>,
    ) -> Result<Vec<Post>, ApiError> {
        self.record(Action::Search {
            keyword: keyword.to_string(),
            count,
            since_id: since_id.map(|s| s.to_string()),
            since_time,
        });
        Ok(self.search_results.iter().take(count).cloned().collect())
    }

    async fn follow(&self, username: &str) -> Result<(), ApiError> {
        self.record(Action::Follow(username.to_string()));
        Ok(())
    }

    async fn reply(&self, text: &str, in_reply_to_id: &str) -> Result<String, ApiError> {
        if self.fail_reply_to.as_deref() == Some(in_reply_to_id) {
            return Err(ApiError::with_status(403, "You are not allowed to reply to this post"));
        }
        self.record(Action::Reply {
            text: text.to_string(),
            in_reply_to_id: in_reply_to_id.to_string(),
        });
        Ok(format!("reply-to-{}", in_reply_to_id))
    }

    async fn own_latest_post(&self) -> Result<Option<Post>, ApiError> {
        Ok(self.own_post.clone())
    }
}

/// Fixed instant used by test posts: 2024-05-02 12:00:00 UTC plus `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// A plain (non-retweet, untagged) post
pub fn post(id: &str, author: &str, text: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        id: id.to_string(),
        author_id: format!("uid-{}", author),
        author: author.to_string(),
        text: text.to_string(),
        created_at,
        geo: None,
        is_retweet: false,
    }
}
