//! Campaign settings: what to search for and what to say
//!
//! Loaded from `<config dir>/campaign.ron` at startup.

use crate::twitter::{MAX_HANDLE_CHARS, TWEET_MAX_CHARS, post_length};
use serde::Deserialize;
use std::path::Path;

pub const CAMPAIGN_FILE: &str = "campaign.ron";

const DEFAULT_SEARCH_COUNT: usize = 3;
const DEFAULT_PLACEHOLDER_REPLY: &str = ":)";

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// Search keyword (the band, product, ...)
    pub keyword: String,
    /// Posts fetched per run
    #[serde(default = "default_search_count")]
    pub search_count: usize,
    #[serde(default)]
    pub respond_to_retweets: bool,
    /// Name of the item currently being promoted; posts already mentioning it
    /// get the placeholder reply
    #[serde(default)]
    pub featured_item: Option<String>,
    #[serde(default = "default_placeholder_reply")]
    pub placeholder_reply: String,
    /// Case-insensitive substrings that disqualify a post
    #[serde(default)]
    pub blocked_words: Vec<String>,
    #[serde(default)]
    pub promotional_replies: Vec<String>,
    /// Used when the promotional pick would repeat the last reply
    #[serde(default)]
    pub fallback_replies: Vec<String>,
}

fn default_search_count() -> usize {
    DEFAULT_SEARCH_COUNT
}

fn default_placeholder_reply() -> String {
    DEFAULT_PLACEHOLDER_REPLY.to_string()
}

/// Trim every candidate and drop the blank ones
fn trimmed(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

impl CampaignConfig {
    /// Read and validate `campaign.ron` from `config_dir`
    pub fn load(config_dir: &Path) -> Result<Self, String> {
        let path = config_dir.join(CAMPAIGN_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let campaign = Self::from_ron(&content)
            .map_err(|e| format!("Invalid campaign config {}: {}", path.display(), e))?;

        log::info!(
            "[campaign] Loaded keyword '{}': {} promotional, {} fallback replies, {} blocked words",
            campaign.keyword,
            campaign.promotional_replies.len(),
            campaign.fallback_replies.len(),
            campaign.blocked_words.len()
        );
        Ok(campaign)
    }

    pub fn from_ron(content: &str) -> Result<Self, String> {
        let mut campaign: CampaignConfig = ron::from_str(content).map_err(|e| e.to_string())?;
        campaign.normalize();
        campaign.validate()?;
        Ok(campaign)
    }

    fn normalize(&mut self) {
        self.keyword = self.keyword.trim().to_string();
        self.placeholder_reply = self.placeholder_reply.trim().to_string();
        self.promotional_replies = trimmed(&self.promotional_replies);
        self.fallback_replies = trimmed(&self.fallback_replies);
        self.blocked_words = self
            .blocked_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self.featured_item = self
            .featured_item
            .take()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
    }

    fn validate(&self) -> Result<(), String> {
        if self.keyword.is_empty() {
            return Err("keyword must not be empty".to_string());
        }
        if self.search_count == 0 {
            return Err("search_count must be at least 1".to_string());
        }
        if self.placeholder_reply.is_empty() {
            return Err("placeholder_reply must not be empty".to_string());
        }
        // "@" + longest handle + " "
        let placeholder_budget = TWEET_MAX_CHARS - MAX_HANDLE_CHARS - 2;
        if post_length(&self.placeholder_reply) > placeholder_budget {
            return Err(format!(
                "placeholder_reply must be at most {} characters",
                placeholder_budget
            ));
        }
        Ok(())
    }
}
