//! Turn phase state machine.
//!
//! A [`GameSession`] owns the game state and every subsystem and exposes
//! the four entry points (`start_turn`, `select_action`, `resolve_event`,
//! `end_turn`) plus read-only snapshots. Callers must serialize calls; the
//! session never blocks or polls.
//!
//! ## Turn Order
//!
//! 1. `start_turn`: advance the turn, refresh AP, re-evaluate risk, roll
//!    events. Pending events put the session in `EventResolution`.
//! 2. `resolve_event` until no events are pending.
//! 3. `select_action` in `ActionSelection`.
//! 4. `end_turn`: execute the queue, staff, rivals, doom, payroll,
//!    game-over checks, seal the turn, then loop to step 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actions::{self, ActionCatalog, ActionResult};
use crate::data::{ScenarioConfig, ScenarioOverrides};
use crate::doom::{DoomEngine, DoomSettlement, DoomStatus};
use crate::error::{ErrorLog, ErrorRecord, GameError, Result};
use crate::events::{EventCatalog, EventEngine, PendingEvent};
use crate::math::{Fixed, DOOM_MAX};
use crate::notify::{GameObserver, Notification, Observers};
use crate::replay::PlayerInput;
use crate::resources::Resource;
use crate::rivals::{simulate_rivals, RivalReport};
use crate::state::{GameOutcome, GameSnapshot, GameState};
use crate::staff::ResearcherId;
use crate::verification::{
    to_hex, ChainHash, LeaderboardSubmission, VerificationEntry, VerificationTracker,
};

/// Turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Between turns; `start_turn` is the only legal call.
    TurnStart,
    /// Events are pending; action selection is blocked.
    EventResolution,
    /// The player may queue actions, reserve AP and end the turn.
    ActionSelection,
    /// The queue is executing.
    TurnEnd,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TurnStart => "TURN_START",
            Self::EventResolution => "EVENT_RESOLUTION",
            Self::ActionSelection => "ACTION_SELECTION",
            Self::TurnEnd => "TURN_END",
        };
        f.write_str(label)
    }
}

/// Content a session is built from.
#[derive(Debug, Clone, Default)]
pub struct GameContent {
    /// Base scenario, before overrides.
    pub scenario: ScenarioConfig,
    /// Event catalog.
    pub events: EventCatalog,
    /// Action catalog.
    pub actions: ActionCatalog,
}

/// Returned by a successful `select_action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSelected {
    /// Queued action id.
    pub action_id: String,
    /// AP committed.
    pub ap_cost: u32,
    /// AP still free.
    pub available_ap: u32,
    /// Human-readable summary.
    pub message: String,
}

/// Returned by a successful `resolve_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventResolved {
    /// Whether this resolution moved the session to action selection.
    pub phase_transitioned: bool,
    /// Whether any effect hit a clamp.
    pub clamped: bool,
}

/// Everything `end_turn` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Turn that ended.
    pub turn: u32,
    /// Queued actions in execution order.
    pub action_results: Vec<ActionResult>,
    /// Researchers who quit.
    pub departures: Vec<ResearcherId>,
    /// Rival moves in roster order.
    pub rival_moves: Vec<RivalReport>,
    /// Doom settlement.
    pub doom: DoomSettlement,
    /// Salary paid this turn.
    pub payroll: Fixed,
    /// Events fired at the start of the next turn.
    pub triggered_events: Vec<PendingEvent>,
    /// Set when the game ended this turn.
    pub outcome: Option<GameOutcome>,
}

/// One game, from seed to final hash.
#[derive(Debug)]
pub struct GameSession {
    state: GameState,
    config: ScenarioConfig,
    overrides: ScenarioOverrides,
    actions: ActionCatalog,
    events: EventEngine,
    doom: DoomEngine,
    tracker: VerificationTracker,
    errors: ErrorLog,
    observers: Observers,
    inputs: Vec<PlayerInput>,
    started: bool,
}

impl GameSession {
    /// Start a game with the standard actions, no events and the default
    /// scenario merged with `overrides`.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidContent`] if the merged scenario is
    /// invalid.
    pub fn start_new_game(seed: &str, overrides: &ScenarioOverrides) -> Result<Self> {
        Self::start_with_content(seed, overrides, GameContent::default())
    }

    /// Start a game from explicit content and run the first `start_turn`.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidContent`] if the merged scenario is
    /// invalid.
    pub fn start_with_content(
        seed: &str,
        overrides: &ScenarioOverrides,
        content: GameContent,
    ) -> Result<Self> {
        let mut session = Self::new(seed, overrides, content)?;
        session.start_turn()?;
        Ok(session)
    }

    /// Build a session in `TurnStart` without starting turn 0.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidContent`] if the merged scenario is
    /// invalid.
    pub fn new(seed: &str, overrides: &ScenarioOverrides, content: GameContent) -> Result<Self> {
        let config = content.scenario.with_overrides(overrides);
        config.validate()?;
        let state = GameState::new(seed, &config);
        let events = EventEngine::new(content.events, &config.calendar());
        tracing::info!(seed, scenario = %config.name, "New game session");
        Ok(Self {
            state,
            doom: DoomEngine::new(config.doom),
            config,
            overrides: overrides.clone(),
            actions: content.actions,
            events,
            tracker: VerificationTracker::new(seed),
            errors: ErrorLog::default(),
            observers: Observers::default(),
            inputs: Vec::new(),
            started: false,
        })
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Begin the next turn (turn 0 on the first call).
    ///
    /// Returns the events that fired.
    ///
    /// # Errors
    /// Fails outside `TurnStart`, after game over, or on an integrity
    /// failure.
    pub fn start_turn(&mut self) -> Result<Vec<PendingEvent>> {
        let result = self.try_start_turn();
        self.finish(result)
    }

    /// Queue an action, committing its AP.
    ///
    /// # Errors
    /// Fails outside `ActionSelection`, for unknown ids, unmet
    /// preconditions, unaffordable costs, or insufficient remaining AP.
    /// Nothing is mutated on failure.
    pub fn select_action(&mut self, action_id: &str) -> Result<ActionSelected> {
        let result = self.try_select_action(action_id);
        self.finish(result)
    }

    /// Choose an option for a pending event.
    ///
    /// # Errors
    /// Fails outside `EventResolution`, for unknown events or options, or
    /// when the option's costs or AP cannot be paid.
    pub fn resolve_event(&mut self, event_id: &str, choice_id: &str) -> Result<EventResolved> {
        let result = self.try_resolve_event(event_id, choice_id);
        self.finish(result)
    }

    /// Execute the queue and advance the game.
    ///
    /// # Errors
    /// Fails outside `ActionSelection`, with an empty queue, or on an
    /// integrity failure. Unaffordable queued actions are skipped and
    /// reported in the [`TurnReport`], not returned as errors.
    pub fn end_turn(&mut self) -> Result<TurnReport> {
        let result = self.try_end_turn();
        self.finish(result)
    }

    /// Hold back AP for next turn's event responses.
    ///
    /// Returns the total reserved.
    ///
    /// # Errors
    /// Fails outside `ActionSelection`, for zero, or when more than the
    /// free AP is requested.
    pub fn reserve_ap(&mut self, amount: u32) -> Result<u32> {
        let result = self.try_reserve_ap(amount);
        self.finish(result)
    }

    /// Drop every queued action and refund its AP.
    ///
    /// Returns the AP refunded.
    ///
    /// # Errors
    /// Fails outside `ActionSelection`.
    pub fn clear_action_queue(&mut self) -> Result<u32> {
        let result = self.try_clear_action_queue();
        self.finish(result)
    }

    /// Replay one recorded input through the matching entry point.
    ///
    /// # Errors
    /// Whatever the entry point returns.
    pub fn apply_input(&mut self, input: &PlayerInput) -> Result<()> {
        match input {
            PlayerInput::ResolveEvent { event, choice } => {
                self.resolve_event(event, choice).map(drop)
            }
            PlayerInput::SelectAction(id) => self.select_action(id).map(drop),
            PlayerInput::ReserveAp(amount) => self.reserve_ap(*amount).map(drop),
            PlayerInput::ClearQueue => self.clear_action_queue().map(drop),
            PlayerInput::EndTurn => self.end_turn().map(drop),
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Read-only snapshot for the presentation layer.
    #[must_use]
    pub fn get_game_state(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.state, self.doom_status())
    }

    /// Direct read access to the state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Current turn.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn
    }

    /// Qualitative doom label.
    #[must_use]
    pub fn doom_status(&self) -> DoomStatus {
        self.doom.status(self.state.doom)
    }

    /// Merged scenario configuration.
    #[must_use]
    pub const fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Overrides the session was started with.
    #[must_use]
    pub const fn overrides(&self) -> &ScenarioOverrides {
        &self.overrides
    }

    /// Action catalog.
    #[must_use]
    pub const fn actions(&self) -> &ActionCatalog {
        &self.actions
    }

    /// Event engine, for schedule inspection.
    #[must_use]
    pub const fn event_engine(&self) -> &EventEngine {
        &self.events
    }

    /// Current chain head. Meaningful as a final result once the game is
    /// over.
    #[must_use]
    pub const fn final_hash(&self) -> ChainHash {
        self.tracker.final_hash()
    }

    /// Hex-encoded chain head.
    #[must_use]
    pub fn final_hash_hex(&self) -> String {
        to_hex(&self.tracker.final_hash())
    }

    /// The verification trail.
    #[must_use]
    pub fn verification_entries(&self) -> &[VerificationEntry] {
        self.tracker.entries()
    }

    /// Accepted player inputs, in order.
    #[must_use]
    pub fn inputs(&self) -> &[PlayerInput] {
        &self.inputs
    }

    /// Recent errors, oldest first.
    pub fn recent_errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter()
    }

    /// Subscribe to notifications.
    pub fn subscribe(&mut self, observer: Box<dyn GameObserver + Send>) {
        self.observers.subscribe(observer);
    }

    /// The leaderboard tuple for a finished game.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] when the chain broke and
    /// [`GameError::InvalidPhase`] while the game is still running.
    pub fn submission(&self) -> Result<LeaderboardSubmission> {
        if self.state.integrity_failed() {
            return Err(GameError::Integrity(
                "verification chain broken; result cannot be submitted".to_string(),
            ));
        }
        if !self.state.game_over() {
            return Err(GameError::InvalidPhase {
                operation: "submission".to_string(),
                phase: self.state.phase,
            });
        }
        Ok(LeaderboardSubmission {
            final_turn: self.state.turn,
            verification_hash: self.final_hash_hex(),
            seed: self.state.seed.clone(),
            final_resources: self.state.resources,
            victory: self.state.victory(),
        })
    }

    // ------------------------------------------------------------------
    // Implementation
    // ------------------------------------------------------------------

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.report_error(error);
        }
        result
    }

    fn report_error(&mut self, error: &GameError) {
        let turn = self.state.turn;
        if error.is_fatal() {
            tracing::error!(turn, %error, "Verification integrity lost; session terminated");
            self.state.outcome = Some(GameOutcome::IntegrityFailure);
        } else {
            tracing::warn!(turn, %error, "Call rejected");
        }
        let record = ErrorRecord::from_error(turn, error);
        self.errors.push(record.clone());
        self.observers.publish(&Notification::ErrorOccurred(record));
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state.game_over() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    fn expect_phase(&self, expected: Phase, operation: &str) -> Result<()> {
        self.ensure_active()?;
        if self.state.phase != expected {
            return Err(GameError::InvalidPhase {
                operation: operation.to_string(),
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.state.phase;
        if from != to {
            self.state.phase = to;
            self.observers
                .publish(&Notification::TurnPhaseChanged { from, to });
        }
    }

    fn enter_action_selection(&mut self) {
        self.state.ap.release_reserve();
        self.set_phase(Phase::ActionSelection);
    }

    fn absorb_draws(&mut self) -> Result<()> {
        let draws = self.state.rng.take_draws();
        self.tracker.record_draws(&draws)
    }

    fn state_updated(&mut self) {
        self.observers.publish(&Notification::GameStateUpdated {
            turn: self.state.turn,
        });
    }

    fn try_start_turn(&mut self) -> Result<Vec<PendingEvent>> {
        self.expect_phase(Phase::TurnStart, "start_turn")?;
        if self.started {
            self.state.turn += 1;
        }
        self.started = true;
        let turn = self.state.turn;
        self.state.rng.set_turn(turn);

        let ap = self.state.action_points_for_turn(self.config.base_action_points);
        self.state.ap.reset_for_turn(ap);
        self.state.safety_work = Fixed::ZERO;
        self.state.capability_work = Fixed::ZERO;

        self.doom.begin_turn(&self.state.risk_inputs());
        let fired = self.events.evaluate(&mut self.state);
        self.doom.add_instability(fired.len());
        self.absorb_draws()?;

        for event in &fired {
            self.observers.publish(&Notification::EventTriggered {
                event_id: event.event_id.clone(),
                turn,
            });
        }
        self.state.pending_events.extend(fired.iter().cloned());
        tracing::debug!(turn, action_points = ap, events = fired.len(), "Turn started");

        if self.state.pending_events.is_empty() {
            self.enter_action_selection();
        } else {
            self.set_phase(Phase::EventResolution);
        }
        self.state_updated();
        Ok(fired)
    }

    fn try_select_action(&mut self, action_id: &str) -> Result<ActionSelected> {
        self.expect_phase(Phase::ActionSelection, "select_action")?;
        let def = self.actions.require(action_id)?;
        actions::commit_selection(def, &mut self.state)?;
        let ap_cost = def.ap_cost;

        self.state.queued_actions.push(action_id.to_string());
        self.inputs.push(PlayerInput::SelectAction(action_id.to_string()));
        let available_ap = self.state.get_available_ap();
        tracing::debug!(turn = self.state.turn, action = action_id, available_ap, "Action queued");
        self.state_updated();
        Ok(ActionSelected {
            action_id: action_id.to_string(),
            ap_cost,
            available_ap,
            message: format!("{action_id} queued, {available_ap} AP left"),
        })
    }

    fn try_resolve_event(&mut self, event_id: &str, choice_id: &str) -> Result<EventResolved> {
        self.expect_phase(Phase::EventResolution, "resolve_event")?;
        let index = self
            .state
            .pending_events
            .iter()
            .position(|e| e.event_id == event_id)
            .ok_or_else(|| GameError::UnknownEvent(event_id.to_string()))?;
        let option = self.state.pending_events[index]
            .option(choice_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownChoice {
                event: event_id.to_string(),
                choice: choice_id.to_string(),
            })?;

        if option.ap_cost > self.state.ap.reserved {
            return Err(GameError::InsufficientActionPoints {
                required: option.ap_cost,
                available: self.state.ap.reserved,
            });
        }
        self.state.resources.check_affordable(&option.costs)?;

        self.state.ap.spend_reserved(option.ap_cost)?;
        self.state.spend(&option.costs)?;
        let clamped = self.state.apply_effects(&option.effects);
        self.state.pending_events.remove(index);

        let turn = self.state.turn;
        self.tracker.record_event_choice(turn, event_id, choice_id)?;
        self.inputs.push(PlayerInput::ResolveEvent {
            event: event_id.to_string(),
            choice: choice_id.to_string(),
        });
        tracing::debug!(turn, event = event_id, choice = choice_id, "Event resolved");

        let phase_transitioned = self.state.pending_events.is_empty();
        if phase_transitioned {
            self.enter_action_selection();
        }
        self.state_updated();
        Ok(EventResolved {
            phase_transitioned,
            clamped,
        })
    }

    fn try_reserve_ap(&mut self, amount: u32) -> Result<u32> {
        self.expect_phase(Phase::ActionSelection, "reserve_ap")?;
        if amount == 0 {
            return Err(GameError::InvalidAmount("reserve at least 1 AP".to_string()));
        }
        self.state.ap.reserve(amount)?;
        self.inputs.push(PlayerInput::ReserveAp(amount));
        self.state_updated();
        Ok(self.state.ap.reserved)
    }

    fn try_clear_action_queue(&mut self) -> Result<u32> {
        self.expect_phase(Phase::ActionSelection, "clear_action_queue")?;
        let refunded = self.state.ap.refund_committed();
        self.state.queued_actions.clear();
        self.inputs.push(PlayerInput::ClearQueue);
        tracing::debug!(turn = self.state.turn, refunded, "Action queue cleared");
        self.state_updated();
        Ok(refunded)
    }

    fn try_end_turn(&mut self) -> Result<TurnReport> {
        self.expect_phase(Phase::ActionSelection, "end_turn")?;
        if self.state.queued_actions.is_empty() {
            return Err(GameError::EmptyActionQueue);
        }
        self.inputs.push(PlayerInput::EndTurn);
        self.set_phase(Phase::TurnEnd);
        let turn = self.state.turn;

        let queue = std::mem::take(&mut self.state.queued_actions);
        let mut action_results = Vec::with_capacity(queue.len());
        for action_id in &queue {
            let result = match self.actions.require(action_id) {
                Ok(def) => actions::execute_action(def, &mut self.state, &self.config.staff),
                Err(error) => ActionResult {
                    action_id: action_id.clone(),
                    success: false,
                    message: format!("{action_id} skipped: {error}"),
                    error: Some(error),
                    clamped: false,
                },
            };
            self.absorb_draws()?;
            self.tracker.record_action(turn, action_id, result.success)?;
            if let Some(error) = &result.error {
                self.report_error(error);
            }
            self.observers
                .publish(&Notification::ActionExecuted(result.clone()));
            action_results.push(result);
        }

        let staff_report = self
            .state
            .staff
            .process_turn(&self.config.staff, &mut self.state.rng);
        self.state
            .resources
            .add_clamped(Resource::Research, staff_report.research);
        self.state
            .resources
            .add_clamped(Resource::Compute, staff_report.compute);

        let rival_moves = simulate_rivals(&mut self.state.rivals, &mut self.state.rng);
        self.absorb_draws()?;

        let settlement = self.doom.settle(self.state.doom, &self.state.risk_inputs());
        self.state.doom = settlement.doom;

        let payroll = self.run_payroll(turn);
        self.state.ap.refund_committed();
        #[cfg(feature = "debug-validation")]
        if !self.state.ap.is_consistent() {
            return Err(GameError::Integrity(format!(
                "AP ledger inconsistent after turn {turn}: {:?}",
                self.state.ap
            )));
        }

        let outcome = self.check_game_over();
        if let Some(outcome) = outcome {
            self.state.outcome = Some(outcome);
            tracing::info!(turn, ?outcome, doom = %self.state.doom, "Game over");
        }

        let digest = self.state.digest()?;
        self.tracker
            .seal_turn(turn, digest, self.state.rng.draw_count())?;
        self.state_updated();

        let triggered_events = if outcome.is_some() {
            Vec::new()
        } else {
            self.set_phase(Phase::TurnStart);
            self.try_start_turn()?
        };

        Ok(TurnReport {
            turn,
            action_results,
            departures: staff_report.departures,
            rival_moves,
            doom: settlement,
            payroll,
            triggered_events,
            outcome,
        })
    }

    /// Salaries fall due every `payroll_interval` turns and are debited
    /// without clamping.
    fn run_payroll(&mut self, turn: u32) -> Fixed {
        let interval = self.config.payroll_interval;
        if interval == 0 || (turn + 1) % interval != 0 {
            return Fixed::ZERO;
        }
        let headcount = Fixed::saturating_from_num(self.state.staff.len());
        let bill = self.config.salary.saturating_mul(headcount);
        self.state.resources.money = self.state.resources.money.saturating_sub(bill);
        tracing::debug!(turn, %bill, "Payroll");
        bill
    }

    fn check_game_over(&self) -> Option<GameOutcome> {
        if self.state.doom >= DOOM_MAX {
            Some(GameOutcome::DoomReached)
        } else if self.state.resources.money < Fixed::ZERO {
            Some(GameOutcome::Bankrupt)
        } else if self.state.doom == Fixed::ZERO
            && self.state.turn >= self.config.victory_min_turn
        {
            Some(GameOutcome::Victory)
        } else {
            None
        }
    }
}
