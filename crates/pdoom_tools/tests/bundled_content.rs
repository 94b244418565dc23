//! Bundled assets load and play end to end.

use std::path::{Path, PathBuf};

use pdoom_core::prelude::*;
use pdoom_tools::content::load_content;
use pdoom_tools::play::{play_script, PlayOptions, PlayScript};

fn assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

#[test]
fn test_bundled_content_matches_defaults() {
    let content = load_content(&assets().join("data")).unwrap();
    assert_eq!(content.scenario, ScenarioConfig::default());
    assert_eq!(content.events.len(), 8);
}

#[test]
fn test_bundled_script_plays_reproducibly() {
    let content = load_content(&assets().join("data")).unwrap();
    let script = PlayScript::load(&assets().join("scripts/safety_first.ron")).unwrap();
    let options = PlayOptions {
        seed: "bundled".to_string(),
        turns: 30,
        ..PlayOptions::default()
    };

    let (first, _) = play_script(&content, &script, &options).unwrap();
    let (second, _) = play_script(&content, &script, &options).unwrap();

    assert_eq!(first.final_hash, second.final_hash);
    assert!(first.replay_verified);
    assert!(first.turns_played > 0);
}

#[test]
fn test_legendary_dates_resolve_to_turns() {
    let content = load_content(&assets().join("data")).unwrap();
    let session =
        GameSession::start_with_content("calendar", &ScenarioOverrides::default(), content)
            .unwrap();
    // 2017-07-03 + 84 weeks = 2019-02-11; the 14th falls in that week.
    assert_eq!(session.event_engine().scheduled_turn("gpt2_staged_release"), Some(84));
}
