//! Balance testing utilities for headless sessions.
//!
//! Runs the same scripted player over many seeds and aggregates outcomes
//! and event frequencies, so tuning changes can be checked against
//! expected rates.

use std::collections::{BTreeMap, BTreeSet};

use pdoom_core::prelude::*;

use crate::players::ScriptedPlayer;

/// Result of one simulated session.
#[derive(Debug, Clone)]
pub struct SessionResult {
    /// Seed the session ran with.
    pub seed: String,
    /// How the game ended (None if still running at the turn limit).
    pub outcome: Option<GameOutcome>,
    /// Turns played.
    pub turns: u32,
    /// Doom when play stopped.
    pub final_doom: Fixed,
    /// Every event that fired at least once.
    pub events_seen: BTreeSet<String>,
}

/// Statistics for a batch of sessions.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Total sessions run.
    pub sessions: u32,
    /// Sessions won.
    pub victories: u32,
    /// Sessions lost to doom.
    pub doom_losses: u32,
    /// Sessions lost to bankruptcy.
    pub bankruptcies: u32,
    /// Sessions voided by an integrity failure.
    pub integrity_failures: u32,
    /// Sessions still running at the turn limit.
    pub unfinished: u32,
    /// Number of sessions in which each event fired.
    pub event_sessions: BTreeMap<String, u32>,
    /// Average turns played.
    pub avg_turns: f64,
}

impl BatchStats {
    /// Fold one session into the stats.
    pub fn record(&mut self, result: &SessionResult) {
        let previous = f64::from(self.sessions);
        self.sessions += 1;
        match result.outcome {
            Some(GameOutcome::Victory) => self.victories += 1,
            Some(GameOutcome::DoomReached) => self.doom_losses += 1,
            Some(GameOutcome::Bankrupt) => self.bankruptcies += 1,
            Some(GameOutcome::IntegrityFailure) => self.integrity_failures += 1,
            None => self.unfinished += 1,
        }
        for event in &result.events_seen {
            *self.event_sessions.entry(event.clone()).or_insert(0) += 1;
        }
        self.avg_turns =
            (self.avg_turns * previous + f64::from(result.turns)) / f64::from(self.sessions);
    }

    /// Fraction of sessions in which `event` fired (0.0 to 1.0).
    #[must_use]
    pub fn event_rate(&self, event: &str) -> f64 {
        if self.sessions == 0 {
            return 0.0;
        }
        f64::from(self.event_sessions.get(event).copied().unwrap_or(0)) / f64::from(self.sessions)
    }

    /// Fraction of sessions won (0.0 to 1.0).
    #[must_use]
    pub fn victory_rate(&self) -> f64 {
        if self.sessions == 0 {
            return 0.0;
        }
        f64::from(self.victories) / f64::from(self.sessions)
    }

    /// Check if an event's rate lies within `[min_rate, max_rate]`.
    #[must_use]
    pub fn event_rate_within(&self, event: &str, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.event_rate(event);
        rate >= min_rate && rate <= max_rate
    }
}

/// Play one session to the turn limit or game over.
///
/// # Errors
/// Returns the first error that stops the player.
pub fn run_session(
    seed: &str,
    overrides: &ScenarioOverrides,
    content: GameContent,
    player: &ScriptedPlayer,
    max_turns: u32,
) -> Result<SessionResult> {
    let mut session = GameSession::start_with_content(seed, overrides, content)?;
    let mut events_seen = BTreeSet::new();

    for _ in 0..max_turns {
        if session.state().game_over() {
            break;
        }
        events_seen.extend(session.state().pending_events.iter().map(|e| e.event_id.clone()));
        player.play_turn(&mut session)?;
    }
    events_seen.extend(session.state().pending_events.iter().map(|e| e.event_id.clone()));

    Ok(SessionResult {
        seed: seed.to_string(),
        outcome: session.state().outcome,
        turns: session.turn(),
        final_doom: session.state().doom,
        events_seen,
    })
}

/// Run `player` over every seed and aggregate the results.
///
/// # Errors
/// Returns the first session error.
pub fn run_batch(
    seeds: &[String],
    overrides: &ScenarioOverrides,
    content: &GameContent,
    player: &ScriptedPlayer,
    max_turns: u32,
) -> Result<BatchStats> {
    let mut stats = BatchStats::default();
    for seed in seeds {
        let result = run_session(seed, overrides, content.clone(), player, max_turns)?;
        tracing::trace!(
            seed = %seed,
            outcome = ?result.outcome,
            turns = result.turns,
            "batch session finished"
        );
        stats.record(&result);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn result(outcome: Option<GameOutcome>, turns: u32, events: &[&str]) -> SessionResult {
        SessionResult {
            seed: "s".into(),
            outcome,
            turns,
            final_doom: fixtures::fixed(0),
            events_seen: events.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    #[test]
    fn test_stats_record() {
        let mut stats = BatchStats::default();
        stats.record(&result(Some(GameOutcome::Victory), 10, &["a"]));
        stats.record(&result(Some(GameOutcome::DoomReached), 20, &["a", "b"]));
        stats.record(&result(None, 30, &[]));
        stats.record(&result(Some(GameOutcome::Bankrupt), 20, &[]));

        assert_eq!(stats.sessions, 4);
        assert_eq!(stats.victories, 1);
        assert_eq!(stats.doom_losses, 1);
        assert_eq!(stats.bankruptcies, 1);
        assert_eq!(stats.unfinished, 1);
        assert!((stats.event_rate("a") - 0.5).abs() < f64::EPSILON);
        assert!((stats.event_rate("b") - 0.25).abs() < f64::EPSILON);
        assert!((stats.avg_turns - 20.0).abs() < f64::EPSILON);
        assert!((stats.victory_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats() {
        let stats = BatchStats::default();
        assert_eq!(stats.event_rate("x"), 0.0);
        assert_eq!(stats.victory_rate(), 0.0);
    }

    #[test]
    fn test_legendary_fires_every_session() {
        let content = fixtures::content_with_events(vec![fixtures::legendary_event("summit", 3)]);
        let player = ScriptedPlayer::repeating(&["fundraise"]);
        let stats = run_batch(
            &fixtures::seeds("balance-legendary", 20),
            &ScenarioOverrides::default(),
            &content,
            &player,
            5,
        )
        .unwrap();
        assert_eq!(stats.sessions, 20);
        assert!(stats.event_rate_within("summit", 1.0, 1.0));
    }

    #[test]
    fn test_run_session_respects_turn_limit() {
        let player = ScriptedPlayer::repeating(&["fundraise"]);
        let result = run_session(
            "balance-limit",
            &ScenarioOverrides::default(),
            GameContent::default(),
            &player,
            4,
        )
        .unwrap();
        assert_eq!(result.turns, 4);
        assert!(result.events_seen.is_empty());
    }
}
