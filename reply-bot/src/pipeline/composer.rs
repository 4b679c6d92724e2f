//! Reply composition

use crate::campaign::CampaignConfig;
use crate::twitter::{Post, TWEET_MAX_CHARS, post_length};
use rand::Rng;
use rand::seq::SliceRandom;

/// A reply ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPlan {
    /// Full post text, mention prefix included
    pub message: String,
    /// The chosen reply without the mention prefix
    pub body: String,
    pub post_id: String,
    pub username: String,
}

pub fn mention_prefix(username: &str) -> String {
    format!("@{} ", username)
}

/// Pick a reply for `post`.
///
/// Lengths are measured with `post_length`, the platform's weighting.
/// Promotional replies that fit next to the mention are preferred; the
/// placeholder is used when none fit or the post already names the featured
/// item. A pick equal to `last_sent_reply` is redrawn from the fallback pool.
pub fn compose_reply<R>(
    post: &Post,
    last_sent_reply: &str,
    campaign: &CampaignConfig,
    rng: &mut R,
) -> ReplyPlan
where
    R: Rng + ?Sized,
{
    let prefix = mention_prefix(&post.author);
    let budget = TWEET_MAX_CHARS.saturating_sub(post_length(&prefix));
    let fits = |candidate: &str| post_length(candidate) <= budget;

    let fitting: Vec<&String> = campaign
        .promotional_replies
        .iter()
        .filter(|c| fits(c.as_str()))
        .collect();

    let mentions_featured = campaign
        .featured_item
        .as_deref()
        .is_some_and(|item| post.text.to_lowercase().contains(&item.to_lowercase()));

    let mut body = match fitting.choose(rng) {
        Some(candidate) if !mentions_featured => (*candidate).clone(),
        _ => campaign.placeholder_reply.clone(),
    };

    if body == last_sent_reply {
        let fallback: Vec<&String> = campaign
            .fallback_replies
            .iter()
            .filter(|c| fits(c.as_str()) && c.as_str() != last_sent_reply)
            .collect();
        match fallback.choose(rng) {
            Some(candidate) => body = (*candidate).clone(),
            None => log::warn!("No usable fallback reply, repeating the last reply"),
        }
    }

    ReplyPlan {
        message: format!("{}{}", prefix, body),
        body,
        post_id: post.id.clone(),
        username: post.author.clone(),
    }
}
