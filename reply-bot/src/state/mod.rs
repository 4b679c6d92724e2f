//! Bot memory: last-seen pointer, contacted users, last reply and the
//! interaction log.

pub mod store;

pub use store::StateStore;

use crate::twitter::Post;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Leading "@handle " of a reply post
static LEADING_MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@\w+\s*").expect("valid mention pattern"));

/// How far back a freshly seeded state starts looking
const FRESH_LOOKBACK_DAYS: i64 = 1;

/// Everything stored about one post the bot replied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub post_id: String,
    pub author: String,
    pub text: String,
    pub geo: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Reply body without the mention prefix
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    pub last_seen_timestamp: DateTime<Utc>,
    pub last_seen_id: Option<String>,
    /// Author handles already replied to, in contact order, no duplicates
    pub contacted_users: Vec<String>,
    pub last_sent_reply: String,
    /// Keyed by post id
    pub interaction_log: BTreeMap<String, InteractionRecord>,
}

impl BotState {
    /// A state for a bot that has never run, seeded from the account's own
    /// latest post when there is one
    pub fn fresh(own_latest: Option<&Post>, now: DateTime<Utc>) -> Self {
        Self {
            last_seen_timestamp: now - Duration::days(FRESH_LOOKBACK_DAYS),
            last_seen_id: own_latest.map(|p| p.id.clone()),
            contacted_users: Vec::new(),
            last_sent_reply: own_latest
                .map(|p| strip_mention_prefix(&p.text))
                .unwrap_or_default(),
            interaction_log: BTreeMap::new(),
        }
    }

    pub fn has_recorded(&self, post_id: &str) -> bool {
        self.interaction_log.contains_key(post_id)
    }

    pub fn has_contacted(&self, author: &str) -> bool {
        self.contacted_users.iter().any(|u| u == author)
    }

    /// Record that `reply` (the body, without the mention prefix) was sent
    /// for `post`.
    ///
    /// The last-seen pointer only moves forward in time.
    pub fn record_interaction(&mut self, post: &Post, reply: &str) {
        if post.created_at > self.last_seen_timestamp {
            self.last_seen_timestamp = post.created_at;
            self.last_seen_id = Some(post.id.clone());
        }

        self.interaction_log.insert(
            post.id.clone(),
            InteractionRecord {
                post_id: post.id.clone(),
                author: post.author.clone(),
                text: post.text.clone(),
                geo: post.geo.clone(),
                created_at: post.created_at,
                reply: reply.to_string(),
            },
        );

        if !self.has_contacted(&post.author) {
            self.contacted_users.push(post.author.clone());
        }
        self.last_sent_reply = reply.to_string();
    }
}

/// Drop the leading mention of a reply post: "@mike hello" -> "hello"
pub fn strip_mention_prefix(message: &str) -> String {
    LEADING_MENTION_PATTERN.replace(message, "").to_string()
}
