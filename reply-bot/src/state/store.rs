//! Flat-file snapshot of `BotState`
//!
//! The whole state is read once at start and written once at the end of a
//! run. Writes go to a sibling temp file that is renamed over the snapshot.

use super::{BotState, InteractionRecord};
use crate::twitter::PlatformApi;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk shape with every field optional, so files missing a field are
/// healed instead of rejected
#[derive(Debug, Default, Deserialize)]
struct StoredState {
    last_seen_timestamp: Option<DateTime<Utc>>,
    last_seen_id: Option<String>,
    contacted_users: Option<Vec<String>>,
    last_sent_reply: Option<String>,
    interaction_log: Option<BTreeMap<String, InteractionRecord>>,
}

impl StoredState {
    fn needs_seed(&self) -> bool {
        self.last_seen_timestamp.is_none() || self.last_sent_reply.is_none()
    }

    fn into_state(self, seed: &BotState) -> BotState {
        let (last_seen_timestamp, last_seen_id) = match self.last_seen_timestamp {
            Some(ts) => (ts, self.last_seen_id),
            None => (seed.last_seen_timestamp, seed.last_seen_id.clone()),
        };

        let mut contacted_users: Vec<String> = Vec::new();
        for user in self.contacted_users.unwrap_or_default() {
            if !contacted_users.contains(&user) {
                contacted_users.push(user);
            }
        }

        BotState {
            last_seen_timestamp,
            last_seen_id,
            contacted_users,
            last_sent_reply: self
                .last_sent_reply
                .unwrap_or_else(|| seed.last_sent_reply.clone()),
            interaction_log: self.interaction_log.unwrap_or_default(),
        }
    }
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, seeding a fresh state (or any missing fields) from
    /// the account's own latest post.
    ///
    /// A snapshot that exists but cannot be parsed is an error: silently
    /// starting over would forget who has already been contacted.
    pub async fn load_or_seed<A>(&self, api: &A) -> Result<BotState, String>
    where
        A: PlatformApi + ?Sized,
    {
        let stored = match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str::<StoredState>(&content).map_err(|e| {
                format!("Failed to parse state file {}: {}", self.path.display(), e)
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "[state] No state file at {}, starting fresh",
                    self.path.display()
                );
                StoredState::default()
            }
            Err(e) => {
                return Err(format!(
                    "Failed to read state file {}: {}",
                    self.path.display(),
                    e
                ));
            }
        };

        let seed = if stored.needs_seed() {
            let own_latest = api
                .own_latest_post()
                .await
                .map_err(|e| format!("Failed to fetch own latest post: {}", e))?;
            match &own_latest {
                Some(post) => log::info!("[state] Seeding defaults from own post {}", post.id),
                None => log::warn!("[state] Account has no posts yet, seeding empty defaults"),
            }
            BotState::fresh(own_latest.as_ref(), Utc::now())
        } else {
            BotState::fresh(None, Utc::now())
        };

        let state = stored.into_state(&seed);
        log::info!(
            "[state] Loaded state: last_seen_id={:?}, {} contacted user(s), {} interaction(s)",
            state.last_seen_id,
            state.contacted_users.len(),
            state.interaction_log.len()
        );
        Ok(state)
    }

    /// Write the full state, replacing the previous snapshot atomically
    pub fn save(&self, state: &BotState) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("Failed to create state directory {}: {}", parent.display(), e)
                })?;
            }
        }

        let mut content = serde_json::to_string_pretty(state)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;
        content.push('\n');

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)
            .map_err(|e| format!("Failed to write {}: {}", tmp_path.display(), e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            format!(
                "Failed to move {} into place at {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            )
        })?;

        log::debug!("[state] Saved state to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
