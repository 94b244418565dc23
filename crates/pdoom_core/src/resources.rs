//! Scalar resources, cost/effect maps and the action-point ledger.
//!
//! All calculations use fixed-point math for deterministic simulation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GameError, Result};
use crate::math::{fixed_from_decimal, fixed_serde, floor_zero_reporting, Fixed};

/// A resource that costs and effects can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Funding.
    Money,
    /// Compute capacity.
    Compute,
    /// Accumulated research points.
    Research,
    /// Published papers (integral).
    Papers,
    /// Public reputation, 0..100.
    Reputation,
    /// Doom, 0..100. Only meaningful in effect maps.
    Doom,
}

impl Resource {
    /// All resources in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Money,
        Self::Compute,
        Self::Research,
        Self::Papers,
        Self::Reputation,
        Self::Doom,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Compute => "compute",
            Self::Research => "research",
            Self::Papers => "papers",
            Self::Reputation => "reputation",
            Self::Doom => "doom",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| GameError::InvalidContent(format!("unknown resource '{s}'")))
    }
}

/// Sparse map of resource amounts, used for both costs and effects.
///
/// Serialized as `{"money": -5000.0}`; iteration order is the canonical
/// [`Resource`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap(BTreeMap<Resource, Fixed>);

impl ResourceMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, resource: Resource, amount: impl Into<Fixed>) -> Self {
        self.insert(resource, amount.into());
        self
    }

    /// Set an amount, replacing any previous one.
    pub fn insert(&mut self, resource: Resource, amount: Fixed) {
        self.0.insert(resource, amount);
    }

    /// Amount for a resource, zero when absent.
    #[must_use]
    pub fn get(&self, resource: Resource) -> Fixed {
        self.0.get(&resource).copied().unwrap_or(Fixed::ZERO)
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, Fixed)> + '_ {
        self.0.iter().map(|(r, a)| (*r, *a))
    }

    /// Whether no amounts are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|a| *a == Fixed::ZERO)
    }
}

impl Serialize for ResourceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let wire: BTreeMap<&str, f64> = self
            .0
            .iter()
            .map(|(r, a)| (r.name(), a.to_num::<f64>()))
            .collect();
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let mut map = Self::new();
        for (name, raw) in wire {
            let resource = name.parse::<Resource>().map_err(D::Error::custom)?;
            let amount = fixed_from_decimal(raw).ok_or_else(|| {
                D::Error::custom(format!("{name}: value {raw} is out of fixed-point range"))
            })?;
            map.insert(resource, amount);
        }
        Ok(map)
    }
}

/// The player's scalar resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Funding.
    #[serde(with = "fixed_serde")]
    pub money: Fixed,
    /// Compute capacity.
    #[serde(with = "fixed_serde")]
    pub compute: Fixed,
    /// Research points.
    #[serde(with = "fixed_serde")]
    pub research: Fixed,
    /// Published papers.
    pub papers: u32,
    /// Reputation, 0..100.
    #[serde(with = "fixed_serde")]
    pub reputation: Fixed,
}

impl Resources {
    /// Current amount of a spendable resource. Doom is not held here.
    #[must_use]
    pub fn amount(&self, resource: Resource) -> Fixed {
        match resource {
            Resource::Money => self.money,
            Resource::Compute => self.compute,
            Resource::Research => self.research,
            Resource::Papers => Fixed::saturating_from_num(self.papers),
            Resource::Reputation => self.reputation,
            Resource::Doom => Fixed::ZERO,
        }
    }

    /// First resource in `costs` that cannot be covered, as an error.
    pub fn check_affordable(&self, costs: &ResourceMap) -> Result<()> {
        for (resource, required) in costs.iter() {
            if required <= Fixed::ZERO {
                continue;
            }
            let available = self.amount(resource);
            if resource == Resource::Doom || available < required {
                return Err(GameError::InsufficientResources {
                    resource,
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Whether every positive cost can be covered.
    #[must_use]
    pub fn can_afford(&self, costs: &ResourceMap) -> bool {
        self.check_affordable(costs).is_ok()
    }

    /// Deduct `costs` atomically: either every component is deducted or
    /// nothing changes.
    pub fn spend(&mut self, costs: &ResourceMap) -> Result<()> {
        self.check_affordable(costs)?;
        for (resource, amount) in costs.iter() {
            if amount <= Fixed::ZERO {
                continue;
            }
            match resource {
                Resource::Money => self.money -= amount,
                Resource::Compute => self.compute -= amount,
                Resource::Research => self.research -= amount,
                Resource::Papers => {
                    self.papers = self.papers.saturating_sub(whole_units(amount));
                }
                Resource::Reputation => self.reputation -= amount,
                Resource::Doom => {}
            }
        }
        Ok(())
    }

    /// Add a (possibly negative) delta to one non-doom resource, clamping
    /// at zero. Returns whether clamping occurred.
    pub(crate) fn add_clamped(&mut self, resource: Resource, delta: Fixed) -> bool {
        let reputation_max = Fixed::from_num(100);
        match resource {
            Resource::Money => clamp_into(&mut self.money, delta),
            Resource::Compute => clamp_into(&mut self.compute, delta),
            Resource::Research => clamp_into(&mut self.research, delta),
            Resource::Papers => {
                let current = i64::from(self.papers);
                let next = current.saturating_add(delta.to_num::<i64>());
                let clamped = next < 0 || next > i64::from(u32::MAX);
                self.papers = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
                clamped
            }
            Resource::Reputation => {
                let mut clamped = clamp_into(&mut self.reputation, delta);
                if self.reputation > reputation_max {
                    self.reputation = reputation_max;
                    clamped = true;
                }
                clamped
            }
            Resource::Doom => false,
        }
    }
}

fn clamp_into(slot: &mut Fixed, delta: Fixed) -> bool {
    let (value, clamped) = floor_zero_reporting(slot.saturating_add(delta));
    *slot = value;
    clamped
}

/// Round a cost up to whole units for integral resources.
fn whole_units(amount: Fixed) -> u32 {
    amount.ceil().saturating_to_num::<u32>()
}

/// Per-turn action-point bookkeeping.
///
/// Invariant: `action_points - committed - reserved >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApLedger {
    /// AP granted this turn.
    pub action_points: u32,
    /// AP already spent on queued actions.
    pub committed: u32,
    /// AP held back for event responses.
    pub reserved: u32,
}

impl ApLedger {
    /// AP still free for new actions.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.action_points
            .saturating_sub(self.committed)
            .saturating_sub(self.reserved)
    }

    /// Whether the ledger invariant holds.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match self.committed.checked_add(self.reserved) {
            Some(used) => used <= self.action_points,
            None => false,
        }
    }

    /// Commit AP to a queued action.
    pub fn commit(&mut self, amount: u32) -> Result<()> {
        let available = self.available();
        if amount > available {
            return Err(GameError::InsufficientActionPoints {
                required: amount,
                available,
            });
        }
        self.committed += amount;
        Ok(())
    }

    /// Move free AP into the reserve.
    pub fn reserve(&mut self, amount: u32) -> Result<()> {
        let available = self.available();
        if amount > available {
            return Err(GameError::InsufficientActionPoints {
                required: amount,
                available,
            });
        }
        self.reserved += amount;
        Ok(())
    }

    /// Pay an event response out of the reserve.
    pub fn spend_reserved(&mut self, amount: u32) -> Result<()> {
        if amount > self.reserved {
            return Err(GameError::InsufficientActionPoints {
                required: amount,
                available: self.reserved,
            });
        }
        self.reserved -= amount;
        self.action_points -= amount;
        Ok(())
    }

    /// Return all committed AP. Returns how much was refunded.
    pub fn refund_committed(&mut self) -> u32 {
        std::mem::take(&mut self.committed)
    }

    /// Start a new turn with a fresh grant of `action_points`.
    ///
    /// The reserve held back last turn is carried on top of the grant, so
    /// an event response paid from it costs nothing out of this turn.
    pub fn reset_for_turn(&mut self, action_points: u32) {
        self.action_points = action_points.saturating_add(self.reserved);
        self.committed = 0;
    }

    /// Release whatever is left of the reserve into the free pool.
    /// Returns how much was released.
    pub fn release_reserve(&mut self) -> u32 {
        std::mem::take(&mut self.reserved)
    }
}
