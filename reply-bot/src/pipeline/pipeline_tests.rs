//! End-to-end runs of `run_once` against the mock platform.

use super::*;
use crate::state::StateStore;
use crate::twitter::mock::{Action, MockPlatform, at, post};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tempfile::tempdir;

fn campaign() -> CampaignConfig {
    CampaignConfig {
        keyword: "midnight owls".to_string(),
        search_count: 3,
        respond_to_retweets: false,
        featured_item: Some("neon harbor".to_string()),
        placeholder_reply: ":)".to_string(),
        blocked_words: vec!["hate".to_string()],
        promotional_replies: vec!["Check out Neon Harbor!".to_string()],
        fallback_replies: vec!["Thanks for listening!".to_string()],
    }
}

fn state_after(last_seen_id: &str) -> BotState {
    BotState {
        last_seen_timestamp: at(0),
        last_seen_id: Some(last_seen_id.to_string()),
        contacted_users: Vec::new(),
        last_sent_reply: String::new(),
        interaction_log: BTreeMap::new(),
    }
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[tokio::test]
async fn test_new_post_is_replied_and_recorded() {
    let api = MockPlatform::new(vec![post("101", "alice", "midnight owls tonight!", at(5))]);
    let mut state = state_after("100");

    let summary = run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            fetched: 1,
            replied: 1,
            skipped: 0
        }
    );
    assert_eq!(
        api.replies(),
        vec![("@alice Check out Neon Harbor!".to_string(), "101".to_string())]
    );
    assert_eq!(state.last_seen_id.as_deref(), Some("101"));
    assert_eq!(state.last_seen_timestamp, at(5));
    assert_eq!(state.contacted_users, vec!["alice".to_string()]);
    assert_eq!(state.last_sent_reply, "Check out Neon Harbor!");
    assert_eq!(state.interaction_log["101"].reply, "Check out Neon Harbor!");
}

#[tokio::test]
async fn test_search_uses_last_seen_id_and_count() {
    let api = MockPlatform::new(vec![]);
    let mut state = state_after("100");

    run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();

    assert_eq!(
        api.actions(),
        vec![Action::Search {
            keyword: "midnight owls".to_string(),
            count: 3,
            since_id: Some("100".to_string()),
            since_time: at(0),
        }]
    );
}

#[tokio::test]
async fn test_retweet_is_skipped_without_touching_state() {
    let api = MockPlatform::new(vec![post("101", "alice", "RT @owls: midnight owls!", at(5))]);
    let mut state = state_after("100");
    let before = state.clone();

    let summary = run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.replied, 0);
    assert!(api.replies().is_empty());
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_second_post_from_same_author_in_one_run_is_skipped() {
    let api = MockPlatform::new(vec![
        post("101", "alice", "midnight owls!", at(1)),
        post("102", "alice", "midnight owls again!", at(2)),
    ]);
    let mut state = state_after("100");

    let summary = run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();

    assert_eq!(summary.replied, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(api.replies().len(), 1);
    assert!(!state.has_recorded("102"));
}

#[tokio::test]
async fn test_consecutive_replies_do_not_repeat() {
    let api = MockPlatform::new(vec![
        post("101", "alice", "midnight owls!", at(1)),
        post("102", "bob", "midnight owls rock", at(2)),
    ]);
    let mut state = state_after("100");

    run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();

    let replies = api.replies();
    assert_eq!(replies[0].0, "@alice Check out Neon Harbor!");
    assert_eq!(replies[1].0, "@bob Thanks for listening!");
    assert_eq!(state.last_seen_id.as_deref(), Some("102"));
}

#[tokio::test]
async fn test_padded_candidate_is_not_repeated() {
    let mut c = campaign();
    c.promotional_replies = vec!["  Neon Harbor out now!".to_string()];
    let api = MockPlatform::new(vec![
        post("101", "alice", "midnight owls!", at(1)),
        post("102", "bob", "midnight owls rock", at(2)),
    ]);
    let mut state = state_after("100");

    run_once(&api, &mut state, &c, &mut rng()).await.unwrap();

    let replies = api.replies();
    assert_eq!(replies[0].0, "@alice   Neon Harbor out now!");
    assert_eq!(replies[1].0, "@bob Thanks for listening!");
    assert_eq!(state.last_sent_reply, "Thanks for listening!");
    assert_eq!(state.interaction_log["101"].reply, "  Neon Harbor out now!");
}

#[tokio::test]
async fn test_empty_run_leaves_state_file_identical() {
    let dir = tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    store.save(&state_after("100")).unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let api = MockPlatform::new(vec![]);
    let mut state = store.load_or_seed(&api).await.unwrap();
    let summary = run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap();
    store.save(&state).unwrap();

    assert_eq!(summary, RunSummary::default());
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[tokio::test]
async fn test_action_failure_keeps_earlier_posts_and_stops() {
    let api = MockPlatform::new(vec![
        post("101", "alice", "midnight owls!", at(1)),
        post("102", "bob", "midnight owls!", at(2)),
        post("103", "carol", "midnight owls!", at(3)),
    ])
    .failing_reply_to("102");
    let mut state = state_after("100");

    let err = run_once(&api, &mut state, &campaign(), &mut rng()).await.unwrap_err();

    match err {
        RunError::Action { post_id, summary, .. } => {
            assert_eq!(post_id, "102");
            assert_eq!(summary.replied, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(api.replies().len(), 1);
    assert!(state.has_recorded("101"));
    assert!(!state.has_recorded("102"));
    assert!(!state.has_recorded("103"));
    assert_eq!(state.last_seen_id.as_deref(), Some("101"));
    assert!(!api.actions().contains(&Action::Follow("carol".to_string())));
}
