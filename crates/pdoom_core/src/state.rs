//! Game state: resources, staff, rivals, doom and the AP ledger.
//!
//! [`GameState`] is owned by exactly one session and mutated only through
//! the turn state machine and its subsystems. It also owns the session's
//! [`SessionRng`] so no other source of randomness can leak in.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::data::ScenarioConfig;
use crate::doom::{DoomStatus, RiskInputs};
use crate::error::{GameError, Result};
use crate::events::PendingEvent;
use crate::math::{clamp_reporting, fixed_serde, Fixed, DOOM_MAX};
use crate::resources::{ApLedger, Resource, ResourceMap, Resources};
use crate::rivals::{roster_from_config, RivalLab};
use crate::rng::SessionRng;
use crate::staff::{Researcher, Specialization, Staff};
use crate::turn::Phase;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Doom brought down to zero after the minimum turn.
    Victory,
    /// Doom reached 100.
    DoomReached,
    /// Money went negative.
    Bankrupt,
    /// The verification chain broke; the result is void.
    IntegrityFailure,
}

impl GameOutcome {
    /// Whether this outcome is a win.
    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Victory)
    }
}

/// Mutable state of one session.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Session seed.
    pub seed: String,
    /// Current turn, from 0.
    pub turn: u32,
    /// Current phase.
    pub phase: Phase,
    /// Scalar resources.
    pub resources: Resources,
    /// Doom, 0..100.
    pub doom: Fixed,
    /// Action-point ledger.
    pub ap: ApLedger,
    /// Researchers.
    pub staff: Staff,
    /// Rival labs, in roster order.
    pub rivals: Vec<RivalLab>,
    /// Action ids in execution order.
    pub queued_actions: Vec<String>,
    /// Events awaiting a choice, in trigger order.
    pub pending_events: Vec<PendingEvent>,
    /// Safety work credited this turn.
    pub safety_work: Fixed,
    /// Capability work credited this turn.
    pub capability_work: Fixed,
    /// Set once the game has ended.
    pub outcome: Option<GameOutcome>,
    /// The session's only source of randomness.
    pub rng: SessionRng,
}

impl GameState {
    /// Build the turn-0 state for a seed and merged scenario.
    #[must_use]
    pub fn new(seed: impl Into<String>, config: &ScenarioConfig) -> Self {
        let seed = seed.into();
        let rng = SessionRng::from_seed_str(&seed);
        Self {
            seed,
            turn: 0,
            phase: Phase::TurnStart,
            resources: Resources {
                money: config.starting_money,
                compute: config.starting_compute,
                research: config.starting_research,
                papers: config.starting_papers,
                reputation: config.starting_reputation,
            },
            doom: config.starting_doom.clamp(Fixed::ZERO, DOOM_MAX),
            ap: ApLedger::default(),
            staff: Staff::new(),
            rivals: roster_from_config(&config.rivals),
            queued_actions: Vec::new(),
            pending_events: Vec::new(),
            safety_work: Fixed::ZERO,
            capability_work: Fixed::ZERO,
            outcome: None,
            rng,
        }
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the game ended in victory.
    #[must_use]
    pub fn victory(&self) -> bool {
        self.outcome.is_some_and(GameOutcome::is_victory)
    }

    /// Whether the verification chain broke.
    #[must_use]
    pub fn integrity_failed(&self) -> bool {
        self.outcome == Some(GameOutcome::IntegrityFailure)
    }

    /// Whether every positive cost in `costs` is covered.
    #[must_use]
    pub fn can_afford(&self, costs: &ResourceMap) -> bool {
        self.resources.can_afford(costs)
    }

    /// Deduct `costs` atomically.
    ///
    /// # Errors
    /// Returns [`GameError::InsufficientResources`] naming the first
    /// resource that falls short; nothing is deducted in that case.
    pub fn spend(&mut self, costs: &ResourceMap) -> Result<()> {
        self.resources.spend(costs)
    }

    /// Apply additive deltas. Doom is clamped to 0..100, reputation to
    /// 0..100 and the other resources at zero.
    ///
    /// Returns whether any clamping occurred.
    pub fn apply_effects(&mut self, effects: &ResourceMap) -> bool {
        let mut clamped = false;
        for (resource, delta) in effects.iter() {
            if resource == Resource::Doom {
                let (doom, hit) =
                    clamp_reporting(self.doom.saturating_add(delta), Fixed::ZERO, DOOM_MAX);
                self.doom = doom;
                clamped |= hit;
            } else {
                clamped |= self.resources.add_clamped(resource, delta);
            }
        }
        clamped
    }

    /// AP still free for new actions.
    #[must_use]
    pub const fn get_available_ap(&self) -> u32 {
        self.ap.available()
    }

    /// AP granted per turn: base plus one per two managers.
    #[must_use]
    pub fn action_points_for_turn(&self, base: u32) -> u32 {
        let managers =
            u32::try_from(self.staff.count(Specialization::Management)).unwrap_or(u32::MAX);
        base.saturating_add(managers / 2)
    }

    /// Quantities the doom engine derives its pools from.
    #[must_use]
    pub fn risk_inputs(&self) -> RiskInputs {
        RiskInputs {
            capability: self
                .staff
                .power(Specialization::Capability)
                .saturating_add(self.capability_work),
            safety: self
                .staff
                .power(Specialization::Safety)
                .saturating_add(self.safety_work),
            rivals: self
                .rivals
                .iter()
                .fold(Fixed::ZERO, |acc, r| acc.saturating_add(r.pressure())),
        }
    }

    /// SHA-256 of the canonical encoding of the game state. Used to seal
    /// a turn in the verification chain.
    ///
    /// Covers the state this struct owns. The doom engine's velocity and
    /// risk pools and the event engine's trackers live in the session and
    /// are not part of the digest; they are derived from inputs the chain
    /// already records.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] if the state cannot be encoded.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let digest = StateDigest {
            seed: &self.seed,
            turn: self.turn,
            resources: &self.resources,
            doom: self.doom,
            ap: &self.ap,
            staff: &self.staff,
            rivals: &self.rivals,
            pending_events: self
                .pending_events
                .iter()
                .map(|e| (e.event_id.as_str(), e.triggered_turn))
                .collect(),
            outcome: self.outcome,
            draw_count: self.rng.draw_count(),
        };
        let bytes = bincode::serialize(&digest)
            .map_err(|e| GameError::Integrity(format!("failed to encode state digest: {e}")))?;
        Ok(Sha256::digest(&bytes).into())
    }
}

/// Canonical view of the state that goes into a turn-end digest.
#[derive(Serialize)]
struct StateDigest<'a> {
    seed: &'a str,
    turn: u32,
    resources: &'a Resources,
    #[serde(with = "fixed_serde")]
    doom: Fixed,
    ap: &'a ApLedger,
    staff: &'a Staff,
    rivals: &'a [RivalLab],
    pending_events: Vec<(&'a str, u32)>,
    outcome: Option<GameOutcome>,
    draw_count: u64,
}

/// Read-only view of the state for the presentation layer.
///
/// Risk pools are deliberately absent; only the coarse
/// [`DoomStatus`] is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Session seed.
    pub seed: String,
    /// Current turn.
    pub turn: u32,
    /// Current phase.
    pub phase: Phase,
    /// Scalar resources.
    pub resources: Resources,
    /// Doom, 0..100.
    #[serde(with = "fixed_serde")]
    pub doom: Fixed,
    /// Qualitative doom trend.
    pub doom_status: DoomStatus,
    /// AP ledger.
    pub ap: ApLedger,
    /// Researchers, in id order.
    pub staff: Vec<Researcher>,
    /// Rival labs.
    pub rivals: Vec<RivalLab>,
    /// Events awaiting a choice.
    pub pending_events: Vec<PendingEvent>,
    /// Queued action ids.
    pub queued_actions: Vec<String>,
    /// Whether the game has ended.
    pub game_over: bool,
    /// Whether the game was won.
    pub victory: bool,
    /// How the game ended, if it has.
    pub outcome: Option<GameOutcome>,
}

impl GameSnapshot {
    /// Capture the current state.
    #[must_use]
    pub fn capture(state: &GameState, doom_status: DoomStatus) -> Self {
        Self {
            seed: state.seed.clone(),
            turn: state.turn,
            phase: state.phase,
            resources: state.resources,
            doom: state.doom,
            doom_status,
            ap: state.ap,
            staff: state.staff.researchers().to_vec(),
            rivals: state.rivals.clone(),
            pending_events: state.pending_events.clone(),
            queued_actions: state.queued_actions.clone(),
            game_over: state.game_over(),
            victory: state.victory(),
            outcome: state.outcome,
        }
    }

    /// Number of researchers with a specialization.
    #[must_use]
    pub fn staff_count(&self, specialization: Specialization) -> usize {
        self.staff
            .iter()
            .filter(|r| r.specialization == specialization)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new("state-test", &ScenarioConfig::default())
    }

    #[test]
    fn test_new_state_from_defaults() {
        let state = state();
        assert_eq!(state.turn, 0);
        assert_eq!(state.phase, Phase::TurnStart);
        assert_eq!(state.resources.money, Fixed::from_num(100_000));
        assert_eq!(state.doom, Fixed::from_num(20));
        assert_eq!(state.rivals.len(), 3);
        assert!(!state.game_over());
    }

    #[test]
    fn test_apply_effects_clamps_doom() {
        let mut state = state();
        let clamped =
            state.apply_effects(&ResourceMap::new().with(Resource::Doom, Fixed::from_num(500)));
        assert!(clamped);
        assert_eq!(state.doom, DOOM_MAX);

        let clamped =
            state.apply_effects(&ResourceMap::new().with(Resource::Doom, Fixed::from_num(-250)));
        assert!(clamped);
        assert_eq!(state.doom, Fixed::ZERO);
    }

    #[test]
    fn test_apply_effects_unclamped() {
        let mut state = state();
        let effects = ResourceMap::new()
            .with(Resource::Money, Fixed::from_num(-5000))
            .with(Resource::Research, Fixed::from_num(4));
        assert!(!state.apply_effects(&effects));
        assert_eq!(state.resources.money, Fixed::from_num(95_000));
        assert_eq!(state.resources.research, Fixed::from_num(4));
    }

    #[test]
    fn test_money_clamps_at_zero() {
        let mut state = state();
        assert!(state.apply_effects(
            &ResourceMap::new().with(Resource::Money, Fixed::from_num(-200_000))
        ));
        assert_eq!(state.resources.money, Fixed::ZERO);
    }

    #[test]
    fn test_available_ap() {
        let mut state = state();
        state.ap.reset_for_turn(3);
        state.ap.commit(1).unwrap();
        state.ap.reserve(1).unwrap();
        assert_eq!(state.get_available_ap(), 1);
    }

    #[test]
    fn test_digest_changes_with_state() {
        let mut state = state();
        let before = state.digest().unwrap();
        assert_eq!(before, state.digest().unwrap());
        state.resources.papers += 1;
        assert_ne!(before, state.digest().unwrap());
    }
}
