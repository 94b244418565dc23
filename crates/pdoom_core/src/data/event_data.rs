//! Event content definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{option_decimal_serde, Decimal, Fixed};
use crate::resources::ResourceMap;

/// Rarity tier of an event; fixes its scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Eligible from `min_turn` forever, fires with a fixed probability.
    Common,
    /// Eligible inside a fixed-width window, lapses when it closes.
    Rare,
    /// Fires exactly once, on a scheduled turn.
    Legendary,
}

/// Scheduling policy implied by a [`Rarity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Probability 1.0 on one exact turn.
    Deterministic,
    /// Independent roll on each turn of a closing window.
    ProbabilisticWindow,
    /// Independent roll on each turn after eligibility, no closing window.
    RandomAfterEligible,
}

impl Rarity {
    /// Scheduling policy for this rarity.
    #[must_use]
    pub const fn trigger_mode(self) -> TriggerMode {
        match self {
            Self::Common => TriggerMode::RandomAfterEligible,
            Self::Rare => TriggerMode::ProbabilisticWindow,
            Self::Legendary => TriggerMode::Deterministic,
        }
    }

    /// Default per-turn trigger probability.
    #[must_use]
    pub fn default_probability(self) -> Fixed {
        match self {
            Self::Common => Fixed::from_num(0.15),
            Self::Rare => Fixed::from_num(0.06),
            Self::Legendary => Fixed::ONE,
        }
    }

    /// Default turns before the event may fire again.
    #[must_use]
    pub const fn default_cooldown(self) -> u32 {
        match self {
            Self::Common => 4,
            Self::Rare => 12,
            Self::Legendary => u32::MAX,
        }
    }

    /// Default eligibility window width (rare only).
    #[must_use]
    pub const fn default_window(self) -> Option<u32> {
        match self {
            Self::Rare => Some(26),
            Self::Common | Self::Legendary => None,
        }
    }
}

/// An eligibility predicate over the current game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCondition {
    /// Doom at least this value.
    MinDoom(Decimal),
    /// Doom at most this value.
    MaxDoom(Decimal),
    /// Money at least this value.
    MinMoney(Decimal),
    /// Money at most this value.
    MaxMoney(Decimal),
    /// Reputation at least this value.
    MinReputation(Decimal),
    /// At least this many researchers.
    MinStaff(u32),
    /// At least this many papers.
    MinPapers(u32),
    /// Turn at least this value (on top of `min_turn`).
    MinTurn(u32),
}

/// One choice offered by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOption {
    /// Option identifier, unique within its event.
    pub id: String,
    /// Localization key or display text.
    #[serde(default)]
    pub label: String,
    /// Resources deducted when chosen.
    #[serde(default)]
    pub costs: ResourceMap,
    /// Resource deltas applied when chosen.
    #[serde(default)]
    pub effects: ResourceMap,
    /// AP paid from the reserve when chosen.
    #[serde(default)]
    pub ap_cost: u32,
}

impl EventOption {
    /// Create an option with no costs.
    #[must_use]
    pub fn new(id: impl Into<String>, effects: ResourceMap) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            costs: ResourceMap::new(),
            effects,
            ap_cost: 0,
        }
    }

    /// Builder-style cost.
    #[must_use]
    pub fn with_costs(mut self, costs: ResourceMap) -> Self {
        self.costs = costs;
        self
    }

    /// Builder-style AP cost.
    #[must_use]
    pub fn with_ap_cost(mut self, ap_cost: u32) -> Self {
        self.ap_cost = ap_cost;
        self
    }

    /// Whether this option can always be taken.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.ap_cost == 0 && self.costs.iter().all(|(_, amount)| amount <= Fixed::ZERO)
    }
}

/// Complete event definition, as supplied by the content loader.
///
/// # Example RON
///
/// ```ron
/// EventDefinition(
///     id: "funding_round",
///     name: "event.funding_round.name",
///     rarity: Common,
///     min_turn: 2,
///     conditions: [MaxMoney(50000.0)],
///     options: [
///         EventOption(id: "accept", effects: {"money": 40000.0, "reputation": -2.0}),
///         EventOption(id: "decline"),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Unique event identifier.
    pub id: String,
    /// Localization key for the event name.
    #[serde(default)]
    pub name: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// First eligible turn.
    #[serde(default)]
    pub min_turn: u32,
    /// Scheduled turn (legendary).
    #[serde(default)]
    pub fixed_turn: Option<u32>,
    /// Scheduled calendar date (legendary); converted via the scenario calendar.
    #[serde(default)]
    pub trigger_date: Option<NaiveDate>,
    /// Per-turn probability override.
    #[serde(default, with = "option_decimal_serde")]
    pub probability: Option<Fixed>,
    /// Window width override (rare).
    #[serde(default)]
    pub window: Option<u32>,
    /// Cooldown override.
    #[serde(default)]
    pub cooldown: Option<u32>,
    /// Additional eligibility predicates; all must hold.
    #[serde(default)]
    pub conditions: Vec<EventCondition>,
    /// Choices offered to the player.
    pub options: Vec<EventOption>,
}

impl EventDefinition {
    /// Create a definition with default policy values and no conditions.
    #[must_use]
    pub fn new(id: impl Into<String>, rarity: Rarity, options: Vec<EventOption>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            rarity,
            min_turn: 0,
            fixed_turn: None,
            trigger_date: None,
            probability: None,
            window: None,
            cooldown: None,
            conditions: Vec::new(),
            options,
        }
    }

    /// Builder-style first eligible turn.
    #[must_use]
    pub fn with_min_turn(mut self, min_turn: u32) -> Self {
        self.min_turn = min_turn;
        self
    }

    /// Builder-style scheduled turn.
    #[must_use]
    pub fn with_fixed_turn(mut self, turn: u32) -> Self {
        self.fixed_turn = Some(turn);
        self
    }

    /// Builder-style scheduled date.
    #[must_use]
    pub fn with_trigger_date(mut self, date: NaiveDate) -> Self {
        self.trigger_date = Some(date);
        self
    }

    /// Builder-style probability.
    #[must_use]
    pub fn with_probability(mut self, probability: Fixed) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Builder-style window.
    #[must_use]
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = Some(window);
        self
    }

    /// Builder-style cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Builder-style condition.
    #[must_use]
    pub fn with_condition(mut self, condition: EventCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Scheduling policy.
    #[must_use]
    pub const fn trigger_mode(&self) -> TriggerMode {
        self.rarity.trigger_mode()
    }

    /// Effective per-turn probability.
    #[must_use]
    pub fn probability(&self) -> Fixed {
        self.probability
            .unwrap_or_else(|| self.rarity.default_probability())
    }

    /// Effective cooldown.
    #[must_use]
    pub fn cooldown(&self) -> u32 {
        self.cooldown.unwrap_or(self.rarity.default_cooldown())
    }

    /// Effective window width, for rare events.
    #[must_use]
    pub fn window(&self) -> Option<u32> {
        self.window.or(self.rarity.default_window())
    }

    /// Find an option by id.
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&EventOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Structural validation of a single definition.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| {
            Err(GameError::InvalidContent(format!("event '{}': {msg}", self.id)))
        };

        if self.id.is_empty() {
            return Err(GameError::InvalidContent("event with empty id".into()));
        }
        if self.options.is_empty() {
            return fail("has no options".into());
        }
        for (i, option) in self.options.iter().enumerate() {
            if self.options[..i].iter().any(|o| o.id == option.id) {
                return fail(format!("duplicate option '{}'", option.id));
            }
        }
        if !self.options.iter().any(EventOption::is_free) {
            return fail("needs at least one option without costs".into());
        }
        if let Some(p) = self.probability {
            if p < Fixed::ZERO || p > Fixed::ONE {
                return fail(format!("probability {p} outside 0..1"));
            }
        }
        match self.rarity {
            Rarity::Legendary => {
                if self.fixed_turn.is_none() && self.trigger_date.is_none() {
                    return fail("legendary events need fixed_turn or trigger_date".into());
                }
                if let Some(turn) = self.fixed_turn.filter(|t| *t < self.min_turn) {
                    return fail(format!("fixed_turn {turn} is before min_turn {}", self.min_turn));
                }
                if !self.conditions.is_empty() {
                    return fail(
                        "legendary events fire unconditionally and cannot carry conditions".into(),
                    );
                }
            }
            Rarity::Rare => {
                if self.window() == Some(0) {
                    return fail("window must be at least 1 turn".into());
                }
            }
            Rarity::Common => {}
        }
        Ok(())
    }
}
