//! Headless scripted play.
//!
//! Drives a session from a RON play script and summarizes the result,
//! including the verification trail and, for finished games, the
//! leaderboard submission.
//!
//! # Example script
//!
//! ```ron
//! PlayScript(
//!     turns: [
//!         ["hire_safety_researcher", "fundraise"],
//!         ["safety_research", "safety_research"],
//!     ],
//!     fallback: Some("fundraise"),
//!     choices: {"funding_round": "accept"},
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use pdoom_core::prelude::*;
use pdoom_core::verification::VerificationEntry;
use serde::{Deserialize, Serialize};

use crate::content::{ContentError, ContentResult};

/// A per-turn action plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayScript {
    /// Actions to queue, one list per turn; cycles when exhausted.
    pub turns: Vec<Vec<String>>,
    /// Queued when nothing in a turn's list was accepted.
    pub fallback: Option<String>,
    /// Option picked for each event id; unlisted events take their first
    /// free option.
    pub choices: BTreeMap<String, String>,
}

impl PlayScript {
    /// Parse a script from RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<script>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a script file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> ContentResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text).map_err(|source| ContentError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }

    fn plan_for(&self, turn: u32) -> &[String] {
        if self.turns.is_empty() {
            return &[];
        }
        &self.turns[turn as usize % self.turns.len()]
    }

    fn choice_for(&self, event: &PendingEvent) -> Option<String> {
        self.choices
            .get(&event.event_id)
            .cloned()
            .or_else(|| event.options.iter().find(|o| o.is_free()).map(|o| o.id.clone()))
    }

    /// Resolve events, queue this turn's plan and end the turn.
    ///
    /// # Errors
    ///
    /// Returns the session's error when an event choice is rejected or
    /// the turn cannot end.
    pub fn play_turn(&self, session: &mut GameSession) -> Result<TurnReport> {
        while session.phase() == Phase::EventResolution {
            let Some(event) = session.state().pending_events.first().cloned() else {
                break;
            };
            let choice = self.choice_for(&event).ok_or_else(|| GameError::UnknownChoice {
                event: event.event_id.clone(),
                choice: "<free option>".to_string(),
            })?;
            session.resolve_event(&event.event_id, &choice)?;
        }

        for action in self.plan_for(session.turn()) {
            if let Err(e) = session.select_action(action) {
                tracing::debug!(action = %action, error = %e, "Scripted action rejected");
            }
        }
        if session.state().queued_actions.is_empty() {
            let fallback = self.fallback.as_deref().unwrap_or("fundraise");
            session.select_action(fallback)?;
        }
        session.end_turn()
    }
}

/// Summary of a scripted session.
#[derive(Debug, Clone, Serialize)]
pub struct PlaySummary {
    /// Session seed.
    pub seed: String,
    /// Turns ended by the script.
    pub turns_played: u32,
    /// Turn the session stopped on.
    pub final_turn: u32,
    /// Doom when play stopped.
    pub final_doom: f64,
    /// Money when play stopped.
    pub final_money: f64,
    /// How the game ended, if it did.
    pub outcome: Option<GameOutcome>,
    /// Chain head, hex.
    pub final_hash: String,
    /// Recoverable errors logged during play.
    pub errors: usize,
    /// Whether re-running the recorded inputs reproduced the chain head.
    pub replay_verified: bool,
    /// Submission payload, for finished games.
    pub submission: Option<LeaderboardSubmission>,
    /// Chain entries, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trail: Vec<VerificationEntry>,
}

/// Options for [`play_script`].
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Session seed.
    pub seed: String,
    /// Maximum turns to play.
    pub turns: u32,
    /// Scenario overrides.
    pub overrides: ScenarioOverrides,
    /// Include the verification trail in the summary.
    pub trail: bool,
}

/// Play `script` on `content` and summarize the session.
///
/// Returns the finished session alongside the summary so callers can
/// record a [`Replay`].
///
/// # Errors
///
/// Returns an error if the session cannot start, a turn cannot be
/// played, or the replay check itself fails.
pub fn play_script(
    content: &GameContent,
    script: &PlayScript,
    options: &PlayOptions,
) -> Result<(PlaySummary, GameSession)> {
    let mut session =
        GameSession::start_with_content(&options.seed, &options.overrides, content.clone())?;
    let mut turns_played = 0;

    while turns_played < options.turns && !session.state().game_over() {
        let report = script.play_turn(&mut session)?;
        turns_played += 1;
        tracing::info!(
            turn = report.turn,
            doom = %report.doom.doom,
            money = %session.state().resources.money,
            actions = report.action_results.len(),
            "Turn played"
        );
    }

    let replay_verified = Replay::from_session(&session).verify(content.clone())?;
    let submission = if session.state().game_over() {
        Some(session.submission()?)
    } else {
        None
    };

    let summary = PlaySummary {
        seed: options.seed.clone(),
        turns_played,
        final_turn: session.turn(),
        final_doom: session.state().doom.to_num(),
        final_money: session.state().resources.money.to_num(),
        outcome: session.state().outcome,
        final_hash: session.final_hash_hex(),
        errors: session.recent_errors().count(),
        replay_verified,
        submission,
        trail: if options.trail {
            session.verification_entries().to_vec()
        } else {
            Vec::new()
        },
    };
    Ok((summary, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdoom_test_utils::fixtures;

    fn options(seed: &str, turns: u32) -> PlayOptions {
        PlayOptions {
            seed: seed.to_string(),
            turns,
            ..PlayOptions::default()
        }
    }

    #[test]
    fn test_parse_script() {
        let script = PlayScript::from_ron_str(
            r#"PlayScript(turns: [["fundraise"], ["buy_compute"]], choices: {"leak": "cover_up"})"#,
        )
        .unwrap();
        assert_eq!(script.turns.len(), 2);
        assert_eq!(script.fallback, None);
        assert_eq!(script.choices.get("leak").map(String::as_str), Some("cover_up"));
    }

    #[test]
    fn test_play_is_reproducible() {
        let script = PlayScript {
            turns: vec![vec!["hire_safety_researcher".into(), "safety_research".into()]],
            ..PlayScript::default()
        };
        let content = GameContent::default();
        let (a, _) = play_script(&content, &script, &options("tools-play", 6)).unwrap();
        let (b, _) = play_script(&content, &script, &options("tools-play", 6)).unwrap();
        assert_eq!(a.turns_played, 6);
        assert_eq!(a.final_hash, b.final_hash);
        assert!(a.replay_verified);
        assert!(a.trail.is_empty());
    }

    #[test]
    fn test_trail_included_on_request() {
        let opts = PlayOptions {
            trail: true,
            ..options("tools-trail", 2)
        };
        let (summary, session) =
            play_script(&GameContent::default(), &PlayScript::default(), &opts).unwrap();
        assert_eq!(summary.trail.len(), session.verification_entries().len());
        assert!(!summary.trail.is_empty());
    }

    #[test]
    fn test_finished_game_gets_submission() {
        let opts = PlayOptions {
            overrides: ScenarioOverrides {
                starting_doom: Some(fixtures::fixed_f(99.9)),
                ..fixtures::no_rivals()
            },
            ..options("tools-doomed", 20)
        };
        let (summary, _) =
            play_script(&GameContent::default(), &PlayScript::default(), &opts).unwrap();
        assert_eq!(summary.turns_played, 1);
        assert_eq!(summary.outcome, Some(GameOutcome::DoomReached));
        let submission = summary.submission.unwrap();
        assert_eq!(submission.final_turn, summary.final_turn);
        assert_eq!(submission.verification_hash, summary.final_hash);
        assert!(!submission.victory);
    }
}
