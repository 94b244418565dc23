//! Replay system for recording and re-running sessions.
//!
//! A replay stores the seed, scenario overrides and the stream of
//! accepted player inputs. Re-running those inputs on a fresh session
//! built from the same content must reproduce the recorded chain head.

use serde::{Deserialize, Serialize};

use crate::data::ScenarioOverrides;
use crate::error::Result;
use crate::turn::{GameContent, GameSession};
use crate::verification::ChainHash;

/// One accepted call into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerInput {
    /// `resolve_event(event, choice)`.
    ResolveEvent {
        /// Event id.
        event: String,
        /// Option id.
        choice: String,
    },
    /// `select_action(id)`.
    SelectAction(String),
    /// `reserve_ap(amount)`.
    ReserveAp(u32),
    /// `clear_action_queue()`.
    ClearQueue,
    /// `end_turn()`.
    EndTurn,
}

/// Replay format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Session seed.
    pub seed: String,
    /// Overrides merged onto the base scenario.
    pub overrides: ScenarioOverrides,
    /// Inputs in the order they were accepted.
    pub inputs: Vec<PlayerInput>,
    /// Turn the session was on when recorded.
    pub final_turn: u32,
    /// Chain head when recorded.
    pub final_hash: ChainHash,
}

impl Replay {
    /// Capture a session's inputs and current chain head.
    #[must_use]
    pub fn from_session(session: &GameSession) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed: session.state().seed.clone(),
            overrides: session.overrides().clone(),
            inputs: session.inputs().to_vec(),
            final_turn: session.turn(),
            final_hash: session.final_hash(),
        }
    }

    /// Number of recorded inputs.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Re-run the replay on `content` and compare chain heads.
    ///
    /// # Errors
    /// Returns an error if the session cannot be built or an input that
    /// was accepted originally is rejected on replay.
    pub fn verify(&self, content: GameContent) -> Result<bool> {
        let mut player = ReplayPlayer::new(self.clone(), content)?;
        player.run_to_end()?;
        Ok(player.session().final_hash() == self.final_hash
            && player.session().turn() == self.final_turn)
    }
}

/// Steps a replay through a live session.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    session: GameSession,
    input_index: usize,
}

impl ReplayPlayer {
    /// Start a fresh session for the replay.
    ///
    /// # Errors
    /// Returns an error if the scenario is invalid.
    pub fn new(replay: Replay, content: GameContent) -> Result<Self> {
        let session = GameSession::start_with_content(&replay.seed, &replay.overrides, content)?;
        Ok(Self {
            replay,
            session,
            input_index: 0,
        })
    }

    /// Apply the next input. Returns whether more inputs remain.
    ///
    /// # Errors
    /// Returns whatever the session returns for the input.
    pub fn step(&mut self) -> Result<bool> {
        if let Some(input) = self.replay.inputs.get(self.input_index) {
            self.session.apply_input(input)?;
            self.input_index += 1;
        }
        Ok(!self.is_finished())
    }

    /// Apply every remaining input.
    ///
    /// # Errors
    /// Stops at the first rejected input.
    pub fn run_to_end(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// The session being driven.
    #[must_use]
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    /// Check if every input has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.input_index >= self.replay.inputs.len()
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.replay.inputs.is_empty() {
            100
        } else {
            let done = self.input_index.saturating_mul(100) / self.replay.inputs.len();
            u32::try_from(done).unwrap_or(100)
        }
    }
}
