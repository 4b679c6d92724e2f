//! Qualification: decides whether a post gets an automated reply.

use crate::campaign::CampaignConfig;
use crate::state::BotState;
use crate::twitter::Post;
use std::fmt;

/// Lowercased prefix of a manual retweet
pub const RETWEET_MARKER: &str = "rt @";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Retweet,
    AlreadyRecorded,
    BlockedWord(String),
    AlreadyContacted,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Retweet => write!(f, "post is a retweet"),
            Rejection::AlreadyRecorded => write!(f, "post already exists in the interaction log"),
            Rejection::BlockedWord(word) => write!(f, "post contains blocked word '{}'", word),
            Rejection::AlreadyContacted => write!(f, "author was already replied to before"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterPolicy<'a> {
    pub allow_retweets: bool,
    pub blocked_words: &'a [String],
}

impl<'a> FilterPolicy<'a> {
    pub fn from_campaign(campaign: &'a CampaignConfig) -> Self {
        Self {
            allow_retweets: campaign.respond_to_retweets,
            blocked_words: &campaign.blocked_words,
        }
    }
}

/// Check `post` against the rules in order, stopping at the first rejection
pub fn qualify(post: &Post, policy: FilterPolicy<'_>, state: &BotState) -> Result<(), Rejection> {
    let text = post.text.to_lowercase();

    if !policy.allow_retweets && (post.is_retweet || text.starts_with(RETWEET_MARKER)) {
        return Err(Rejection::Retweet);
    }

    if state.has_recorded(&post.id) {
        return Err(Rejection::AlreadyRecorded);
    }

    if let Some(word) = policy
        .blocked_words
        .iter()
        .find(|word| !word.is_empty() && text.contains(&word.to_lowercase()))
    {
        return Err(Rejection::BlockedWord(word.clone()));
    }

    if state.has_contacted(&post.author) {
        return Err(Rejection::AlreadyContacted);
    }

    Ok(())
}
