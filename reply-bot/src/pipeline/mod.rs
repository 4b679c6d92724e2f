//! One bot run: search, qualify, compose, dispatch, record.

pub mod composer;
pub mod dispatcher;
pub mod filter;

#[cfg(test)]
mod pipeline_tests;

use crate::campaign::CampaignConfig;
use crate::state::BotState;
use crate::twitter::{ApiError, PlatformApi};
use composer::compose_reply;
use filter::{FilterPolicy, qualify};
use rand::Rng;
use std::fmt;

/// Characters of post text shown in the log
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub replied: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub enum RunError {
    /// The search itself failed; nothing was processed
    Search(ApiError),
    /// Following or replying failed for `post_id`; posts before it were
    /// completed and recorded
    Action {
        post_id: String,
        error: ApiError,
        summary: RunSummary,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Search(e) => write!(f, "Search failed: {}", e),
            RunError::Action { post_id, error, summary } => write!(
                f,
                "Failed to reply to post {} after {} successful repl{}: {}",
                post_id,
                summary.replied,
                if summary.replied == 1 { "y" } else { "ies" },
                error
            ),
        }
    }
}

impl std::error::Error for RunError {}

/// Process the posts matching the campaign keyword since the last-seen post.
///
/// `state` is updated after every reply that went out, so on an action error
/// it still holds everything completed before the failing post.
pub async fn run_once<A, R>(
    api: &A,
    state: &mut BotState,
    campaign: &CampaignConfig,
    rng: &mut R,
) -> Result<RunSummary, RunError>
where
    A: PlatformApi + ?Sized,
    R: Rng + ?Sized,
{
    log::info!(
        "Searching for posts with keyword '{}' since {} (id {:?})",
        campaign.keyword,
        state.last_seen_timestamp,
        state.last_seen_id
    );
    let posts = api
        .search_recent(
            &campaign.keyword,
            campaign.search_count,
            state.last_seen_id.as_deref(),
            state.last_seen_timestamp,
        )
        .await
        .map_err(RunError::Search)?;

    let mut summary = RunSummary {
        fetched: posts.len(),
        ..Default::default()
    };

    if posts.is_empty() {
        log::info!(
            "No posts with keyword '{}' found since {}",
            campaign.keyword,
            state.last_seen_timestamp
        );
        return Ok(summary);
    }

    log::info!("Iterating over {} post(s)", posts.len());
    let policy = FilterPolicy::from_campaign(campaign);

    for post in &posts {
        if let Err(rejection) = qualify(post, policy, state) {
            log::info!("Skipping post {} from @{}: {}", post.id, post.author, rejection);
            summary.skipped += 1;
            continue;
        }

        let plan = compose_reply(post, &state.last_sent_reply, campaign, rng);

        if let Err(error) = dispatcher::dispatch(api, &plan).await {
            return Err(RunError::Action {
                post_id: post.id.clone(),
                error,
                summary,
            });
        }

        state.record_interaction(post, &plan.body);
        summary.replied += 1;

        log::info!("Post from @{}: {}", post.author, preview(&post.text));
        log::info!("Replied: {}", plan.message);
    }

    Ok(summary)
}

fn preview(text: &str) -> String {
    if text.chars().count() > LOG_PREVIEW_CHARS {
        format!("{}...", text.chars().take(LOG_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}
