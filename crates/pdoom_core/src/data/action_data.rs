//! Player action definitions.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{Decimal, Fixed};
use crate::resources::ResourceMap;
use crate::staff::Specialization;

/// One effect of an executed action. Effects apply in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionEffect {
    /// Additive resource deltas (doom included).
    Resources(ResourceMap),
    /// Hire one researcher with a rolled skill level.
    Hire(Specialization),
    /// Remove the most burnt-out researcher.
    FireMostBurnedOut,
    /// Raise `base + roll(0..=spread)` money.
    Fundraise {
        /// Guaranteed amount.
        base: Decimal,
        /// Upper bound of the random bonus.
        spread: u32,
    },
    /// Lower every researcher's burnout.
    ReduceBurnout(Decimal),
    /// Safety work credited to this turn's risk evaluation.
    SafetyWork(Decimal),
    /// Capability work credited to this turn's risk evaluation.
    CapabilityWork(Decimal),
    /// Lower every rival's aggression.
    SuppressRivals(Decimal),
}

impl ActionEffect {
    /// Whether the effect needs at least one researcher on staff.
    #[must_use]
    pub const fn requires_staff(&self) -> bool {
        matches!(self, Self::FireMostBurnedOut)
    }
}

/// A player action.
///
/// # Example RON
///
/// ```ron
/// ActionDefinition(
///     id: "buy_compute",
///     name: "action.buy_compute.name",
///     ap_cost: 1,
///     costs: {"money": 10000.0},
///     effects: [Resources({"compute": 100.0})],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Unique action identifier.
    pub id: String,
    /// Localization key for the action name.
    #[serde(default)]
    pub name: String,
    /// AP committed at selection.
    pub ap_cost: u32,
    /// Resources deducted at execution.
    #[serde(default)]
    pub costs: ResourceMap,
    /// Effects applied at execution, in order.
    #[serde(default)]
    pub effects: Vec<ActionEffect>,
}

impl ActionDefinition {
    /// Create an action with no costs or effects.
    #[must_use]
    pub fn new(id: impl Into<String>, ap_cost: u32) -> Self {
        let id = id.into();
        Self {
            name: format!("action.{id}.name"),
            id,
            ap_cost,
            costs: ResourceMap::new(),
            effects: Vec::new(),
        }
    }

    /// Builder-style costs.
    #[must_use]
    pub fn with_costs(mut self, costs: ResourceMap) -> Self {
        self.costs = costs;
        self
    }

    /// Builder-style effect.
    #[must_use]
    pub fn with_effect(mut self, effect: ActionEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether any effect needs staff on hand.
    #[must_use]
    pub fn requires_staff(&self) -> bool {
        self.effects.iter().any(ActionEffect::requires_staff)
    }

    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(GameError::InvalidContent("action with empty id".into()));
        }
        if self.ap_cost == 0 {
            return Err(GameError::InvalidContent(format!(
                "action '{}' must cost at least 1 AP",
                self.id
            )));
        }
        if self.costs.iter().any(|(_, amount)| amount < Fixed::ZERO) {
            return Err(GameError::InvalidContent(format!(
                "action '{}' has a negative cost",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;

    #[test]
    fn test_parse_ron_action() {
        let action: ActionDefinition = ron::from_str(
            r#"ActionDefinition(
                id: "buy_compute",
                ap_cost: 1,
                costs: {"money": 10000.0},
                effects: [Resources({"compute": 100.0}), Hire(Safety)],
            )"#,
        )
        .unwrap();
        assert_eq!(action.costs.get(Resource::Money), Fixed::from_num(10_000));
        assert_eq!(action.effects.len(), 2);
        action.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_ap() {
        assert!(ActionDefinition::new("free_lunch", 0).validate().is_err());
    }

    #[test]
    fn test_requires_staff() {
        let fire = ActionDefinition::new("fire", 1).with_effect(ActionEffect::FireMostBurnedOut);
        assert!(fire.requires_staff());
        assert!(!ActionDefinition::new("idle", 1).requires_staff());
    }
}
