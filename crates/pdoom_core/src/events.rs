//! Event catalog and rarity-tiered trigger engine.
//!
//! The catalog is immutable content. The engine keeps a per-session
//! tracker for each entry and evaluates the whole catalog once per turn,
//! drawing from the session RNG for every probabilistic roll.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{Calendar, EventCondition, EventDefinition, EventOption, Rarity, TriggerMode};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::state::GameState;

/// Validated, immutable list of event definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
}

impl EventCatalog {
    /// Build a catalog, validating every definition and id uniqueness.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidContent`] for the first bad entry.
    pub fn new(events: Vec<EventDefinition>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for event in &events {
            event.validate()?;
            if !seen.insert(event.id.as_str()) {
                return Err(GameError::InvalidContent(format!(
                    "duplicate event id '{}'",
                    event.id
                )));
            }
        }
        Ok(Self { events })
    }

    /// Parse a RON list of [`EventDefinition`] and validate it.
    ///
    /// # Errors
    /// Returns [`GameError::DataParseError`] on malformed RON and
    /// [`GameError::InvalidContent`] on invalid definitions.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let events: Vec<EventDefinition> =
            ron::from_str(ron).map_err(|e| GameError::DataParseError {
                path: "<events>".to_string(),
                message: e.to_string(),
            })?;
        Self::new(events)
    }

    /// Definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.iter()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A triggered event awaiting the player's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    /// Definition id.
    pub event_id: String,
    /// Localization key for the name.
    pub name: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Turn on which it fired.
    pub triggered_turn: u32,
    /// Choices offered.
    pub options: Vec<EventOption>,
}

impl PendingEvent {
    fn from_definition(def: &EventDefinition, turn: u32) -> Self {
        Self {
            event_id: def.id.clone(),
            name: def.name.clone(),
            rarity: def.rarity,
            triggered_turn: turn,
            options: def.options.clone(),
        }
    }

    /// Option by id.
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&EventOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Per-session scheduling state of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct EventTracker {
    /// Turn a legendary event is scheduled for.
    scheduled_turn: Option<u32>,
    last_fired: Option<u32>,
    lapsed: bool,
}

/// Evaluates the catalog each turn.
#[derive(Debug, Clone)]
pub struct EventEngine {
    catalog: EventCatalog,
    trackers: Vec<EventTracker>,
}

impl EventEngine {
    /// Create an engine, resolving legendary dates against `calendar`.
    #[must_use]
    pub fn new(catalog: EventCatalog, calendar: &Calendar) -> Self {
        let trackers = catalog
            .iter()
            .map(|def| {
                let scheduled_turn = if def.rarity == Rarity::Legendary {
                    def.fixed_turn
                        .or_else(|| def.trigger_date.and_then(|d| calendar.turn_for_date(d)))
                } else {
                    None
                };
                if def.rarity == Rarity::Legendary && scheduled_turn.is_none() {
                    tracing::warn!(
                        event = %def.id,
                        "Legendary event date precedes the scenario; it will never fire"
                    );
                }
                EventTracker {
                    scheduled_turn,
                    ..EventTracker::default()
                }
            })
            .collect();
        Self { catalog, trackers }
    }

    /// The catalog this engine evaluates.
    #[must_use]
    pub const fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// Turn a legendary event will fire on, if it has one.
    #[must_use]
    pub fn scheduled_turn(&self, id: &str) -> Option<u32> {
        self.index_of(id).and_then(|i| self.trackers[i].scheduled_turn)
    }

    /// Whether a rare event's window closed without it firing.
    #[must_use]
    pub fn has_lapsed(&self, id: &str) -> bool {
        self.index_of(id).is_some_and(|i| self.trackers[i].lapsed)
    }

    /// Turn an event last fired on.
    #[must_use]
    pub fn last_fired(&self, id: &str) -> Option<u32> {
        self.index_of(id).and_then(|i| self.trackers[i].last_fired)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.catalog.iter().position(|e| e.id == id)
    }

    /// Evaluate every entry for the state's current turn and return the
    /// events that fired, in catalog order.
    pub fn evaluate(&mut self, state: &mut GameState) -> Vec<PendingEvent> {
        let turn = state.turn;
        let mut fired = Vec::new();

        for (def, tracker) in self.catalog.events.iter().zip(self.trackers.iter_mut()) {
            if tracker.lapsed {
                continue;
            }
            let cooling = tracker
                .last_fired
                .is_some_and(|last| turn < last.saturating_add(def.cooldown()));
            if cooling || turn < def.min_turn {
                continue;
            }

            let triggered = match def.trigger_mode() {
                TriggerMode::Deterministic => {
                    tracker.last_fired.is_none() && tracker.scheduled_turn == Some(turn)
                }
                TriggerMode::ProbabilisticWindow => {
                    let closes = def
                        .window()
                        .map_or(u32::MAX, |w| def.min_turn.saturating_add(w));
                    if turn >= closes {
                        if tracker.last_fired.is_none() {
                            tracing::debug!(event = %def.id, turn, "Rare event window lapsed");
                        }
                        tracker.lapsed = true;
                        continue;
                    }
                    conditions_hold(def, state)
                        && state.rng.chance(def.probability(), format!("event:{}", def.id))
                }
                TriggerMode::RandomAfterEligible => {
                    conditions_hold(def, state)
                        && state.rng.chance(def.probability(), format!("event:{}", def.id))
                }
            };

            if triggered {
                tracker.last_fired = Some(turn);
                tracing::debug!(event = %def.id, turn, "Event triggered");
                fired.push(PendingEvent::from_definition(def, turn));
            }
        }
        fired
    }
}

/// Whether every eligibility condition of `def` holds.
#[must_use]
pub fn conditions_hold(def: &EventDefinition, state: &GameState) -> bool {
    def.conditions.iter().all(|c| condition_holds(*c, state))
}

fn condition_holds(condition: EventCondition, state: &GameState) -> bool {
    let res = &state.resources;
    match condition {
        EventCondition::MinDoom(v) => state.doom >= Fixed::from(v),
        EventCondition::MaxDoom(v) => state.doom <= Fixed::from(v),
        EventCondition::MinMoney(v) => res.money >= Fixed::from(v),
        EventCondition::MaxMoney(v) => res.money <= Fixed::from(v),
        EventCondition::MinReputation(v) => res.reputation >= Fixed::from(v),
        EventCondition::MinStaff(n) => state.staff.len() >= n as usize,
        EventCondition::MinPapers(n) => res.papers >= n,
        EventCondition::MinTurn(n) => state.turn >= n,
    }
}
