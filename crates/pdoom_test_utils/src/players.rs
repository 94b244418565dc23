//! Scripted players that drive sessions without a UI.
//!
//! A [`ScriptedPlayer`] resolves pending events (using a configured
//! choice or the first free option), queues its plan for the turn and
//! ends the turn. Rejected selections are simply skipped; the session
//! records them in its error log.

use std::collections::BTreeMap;

use pdoom_core::prelude::*;

/// Action queued when nothing in the turn's plan was accepted.
pub const DEFAULT_FALLBACK: &str = "fundraise";

/// A deterministic player policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPlayer {
    turns: Vec<Vec<String>>,
    fallback: String,
    choices: BTreeMap<String, String>,
}

impl ScriptedPlayer {
    /// Queue the same actions every turn.
    #[must_use]
    pub fn repeating(actions: &[&str]) -> Self {
        Self::from_plan(vec![actions.iter().map(|a| (*a).to_string()).collect()])
    }

    /// Follow a per-turn plan, cycling when it runs out.
    #[must_use]
    pub fn from_plan(turns: Vec<Vec<String>>) -> Self {
        Self {
            turns,
            fallback: DEFAULT_FALLBACK.to_string(),
            choices: BTreeMap::new(),
        }
    }

    /// Set the fallback action.
    #[must_use]
    pub fn with_fallback(mut self, action: &str) -> Self {
        self.fallback = action.to_string();
        self
    }

    /// Always answer `event` with `choice`.
    #[must_use]
    pub fn with_choice(mut self, event: &str, choice: &str) -> Self {
        self.choices.insert(event.to_string(), choice.to_string());
        self
    }

    /// Actions planned for `turn`.
    #[must_use]
    pub fn plan_for(&self, turn: u32) -> &[String] {
        if self.turns.is_empty() {
            return &[];
        }
        &self.turns[turn as usize % self.turns.len()]
    }

    /// Option this player picks for a pending event.
    #[must_use]
    pub fn choose(&self, event: &PendingEvent) -> Option<String> {
        self.choices
            .get(&event.event_id)
            .cloned()
            .or_else(|| event.options.iter().find(|o| o.is_free()).map(|o| o.id.clone()))
    }

    /// Resolve every pending event.
    ///
    /// # Errors
    /// Returns the session's error if a choice is rejected.
    pub fn resolve_events(&self, session: &mut GameSession) -> Result<()> {
        while session.phase() == Phase::EventResolution {
            let Some(event) = session.state().pending_events.first().cloned() else {
                break;
            };
            let choice = self
                .choose(&event)
                .ok_or_else(|| GameError::UnknownChoice {
                    event: event.event_id.clone(),
                    choice: "<free option>".to_string(),
                })?;
            session.resolve_event(&event.event_id, &choice)?;
        }
        Ok(())
    }

    /// Play one full turn.
    ///
    /// # Errors
    /// Returns the session's error if events cannot be resolved or the
    /// turn cannot be ended.
    pub fn play_turn(&self, session: &mut GameSession) -> Result<TurnReport> {
        self.resolve_events(session)?;
        for action in self.plan_for(session.turn()) {
            let _ = session.select_action(action);
        }
        if session.state().queued_actions.is_empty() {
            session.select_action(&self.fallback)?;
        }
        session.end_turn()
    }

    /// Play up to `turns` turns, stopping early when the game ends.
    ///
    /// # Errors
    /// Stops at the first failing turn.
    pub fn play(&self, session: &mut GameSession, turns: u32) -> Result<Vec<TurnReport>> {
        let mut reports = Vec::new();
        for _ in 0..turns {
            if session.state().game_over() {
                break;
            }
            reports.push(self.play_turn(session)?);
        }
        Ok(reports)
    }
}
