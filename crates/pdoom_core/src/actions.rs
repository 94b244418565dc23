//! Action economy: the action catalog, selection checks and queued
//! execution.
//!
//! AP and affordability are checked when an action is selected. Costs are
//! deducted and effects applied only when the queue executes at turn end,
//! in queue order, so a later action can find the pool already drained.

use std::collections::BTreeMap;

use crate::data::{ActionDefinition, ActionEffect, StaffTuning};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::resources::{Resource, ResourceMap};
use crate::staff::Specialization;
use crate::state::GameState;

/// Catalog of player actions keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    actions: BTreeMap<String, ActionDefinition>,
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionCatalog {
    /// Build a catalog from definitions, validating each.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidContent`] on an invalid or duplicate
    /// definition.
    pub fn new(definitions: Vec<ActionDefinition>) -> Result<Self> {
        let mut actions = BTreeMap::new();
        for def in definitions {
            def.validate()?;
            if actions.contains_key(&def.id) {
                return Err(GameError::InvalidContent(format!(
                    "duplicate action id '{}'",
                    def.id
                )));
            }
            actions.insert(def.id.clone(), def);
        }
        Ok(Self { actions })
    }

    /// Parse a RON list of [`ActionDefinition`].
    ///
    /// # Errors
    /// Returns [`GameError::DataParseError`] on malformed RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let definitions: Vec<ActionDefinition> =
            ron::from_str(ron).map_err(|e| GameError::DataParseError {
                path: "<actions>".to_string(),
                message: e.to_string(),
            })?;
        Self::new(definitions)
    }

    /// The built-in action set.
    #[must_use]
    pub fn standard() -> Self {
        let money = |amount: i32| ResourceMap::new().with(Resource::Money, Fixed::from_num(amount));
        let hire = |id: &str, cost: i32, spec: Specialization| {
            ActionDefinition::new(id, 1)
                .with_costs(money(cost))
                .with_effect(ActionEffect::Hire(spec))
        };
        let definitions = vec![
            hire("hire_safety_researcher", 25_000, Specialization::Safety),
            hire("hire_capability_researcher", 25_000, Specialization::Capability),
            hire("hire_compute_engineer", 20_000, Specialization::Compute),
            hire("hire_manager", 30_000, Specialization::Management),
            ActionDefinition::new("fire_researcher", 1)
                .with_effect(ActionEffect::FireMostBurnedOut)
                .with_effect(ActionEffect::Resources(
                    ResourceMap::new().with(Resource::Reputation, Fixed::from_num(-2)),
                )),
            ActionDefinition::new("buy_compute", 1)
                .with_costs(money(10_000))
                .with_effect(ActionEffect::Resources(
                    ResourceMap::new().with(Resource::Compute, Fixed::from_num(100)),
                )),
            ActionDefinition::new("safety_research", 1)
                .with_costs(ResourceMap::new().with(Resource::Compute, Fixed::from_num(20)))
                .with_effect(ActionEffect::Resources(
                    ResourceMap::new().with(Resource::Research, Fixed::from_num(5)),
                ))
                .with_effect(ActionEffect::SafetyWork(Fixed::from_num(3).into())),
            ActionDefinition::new("capability_research", 1)
                .with_costs(ResourceMap::new().with(Resource::Compute, Fixed::from_num(20)))
                .with_effect(ActionEffect::Resources(
                    ResourceMap::new().with(Resource::Research, Fixed::from_num(8)),
                ))
                .with_effect(ActionEffect::CapabilityWork(Fixed::from_num(3).into())),
            ActionDefinition::new("publish_paper", 1)
                .with_costs(ResourceMap::new().with(Resource::Research, Fixed::from_num(20)))
                .with_effect(ActionEffect::Resources(
                    ResourceMap::new()
                        .with(Resource::Papers, Fixed::ONE)
                        .with(Resource::Reputation, Fixed::from_num(3)),
                )),
            ActionDefinition::new("fundraise", 2).with_effect(ActionEffect::Fundraise {
                base: Fixed::from_num(30_000).into(),
                spread: 30_000,
            }),
            ActionDefinition::new("team_retreat", 1)
                .with_costs(money(5_000))
                .with_effect(ActionEffect::ReduceBurnout(Fixed::from_num(20).into())),
            ActionDefinition::new("lobby_government", 2)
                .with_costs(money(20_000).with(Resource::Reputation, Fixed::from_num(5)))
                .with_effect(ActionEffect::SuppressRivals(Fixed::from_num(0.05).into())),
        ];
        let actions = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Self { actions }
    }

    /// Definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    /// Definition by id, or [`GameError::UnknownAction`].
    ///
    /// # Errors
    /// Returns [`GameError::UnknownAction`] for unknown ids.
    pub fn require(&self, id: &str) -> Result<&ActionDefinition> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownAction(id.to_string()))
    }

    /// Action ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Outcome of one queued action at turn end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Action id.
    pub action_id: String,
    /// Whether costs were paid and effects applied.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Why the action was skipped, when it was.
    pub error: Option<GameError>,
    /// Whether any effect hit a clamp.
    pub clamped: bool,
}

impl ActionResult {
    fn executed(action_id: &str, clamped: bool) -> Self {
        Self {
            action_id: action_id.to_string(),
            success: true,
            message: format!("{action_id} executed"),
            error: None,
            clamped,
        }
    }

    fn skipped(action_id: &str, error: GameError) -> Self {
        Self {
            action_id: action_id.to_string(),
            success: false,
            message: format!("{action_id} skipped: {error}"),
            error: Some(error),
            clamped: false,
        }
    }
}

/// Check an action's preconditions against the current state.
///
/// # Errors
/// Returns [`GameError::PreconditionFailed`] when an effect needs staff
/// and nobody is employed.
pub fn check_preconditions(def: &ActionDefinition, state: &GameState) -> Result<()> {
    if def.requires_staff() && state.staff.is_empty() {
        return Err(GameError::PreconditionFailed {
            action: def.id.clone(),
            reason: "no researchers on staff".to_string(),
        });
    }
    Ok(())
}

/// Selection-time checks: preconditions, affordability and remaining AP.
/// On success the AP is committed.
///
/// # Errors
/// Returns the first failing check; nothing is committed in that case.
pub fn commit_selection(def: &ActionDefinition, state: &mut GameState) -> Result<()> {
    check_preconditions(def, state)?;
    state.resources.check_affordable(&def.costs)?;
    state.ap.commit(def.ap_cost)
}

/// Execute one queued action: recheck preconditions, pay costs, apply
/// effects in order. A failure skips only this action.
pub fn execute_action(
    def: &ActionDefinition,
    state: &mut GameState,
    tuning: &StaffTuning,
) -> ActionResult {
    if let Err(error) = check_preconditions(def, state).and_then(|()| state.spend(&def.costs)) {
        tracing::warn!(action = %def.id, turn = state.turn, %error, "Queued action skipped");
        return ActionResult::skipped(&def.id, error);
    }

    let mut clamped = false;
    for effect in &def.effects {
        clamped |= apply_effect(effect, state, tuning);
    }
    tracing::debug!(action = %def.id, turn = state.turn, "Action executed");
    ActionResult::executed(&def.id, clamped)
}

fn apply_effect(effect: &ActionEffect, state: &mut GameState, tuning: &StaffTuning) -> bool {
    match effect {
        ActionEffect::Resources(deltas) => state.apply_effects(deltas),
        ActionEffect::Hire(spec) => {
            state.staff.hire(*spec, tuning, &mut state.rng);
            false
        }
        ActionEffect::FireMostBurnedOut => {
            state.staff.fire_most_burned_out();
            false
        }
        ActionEffect::Fundraise { base, spread } => {
            let bonus = state
                .rng
                .below(u64::from(*spread) + 1, "fundraise");
            let raised = Fixed::from(*base).saturating_add(Fixed::saturating_from_num(bonus));
            state.apply_effects(&ResourceMap::new().with(Resource::Money, raised))
        }
        ActionEffect::ReduceBurnout(amount) => {
            state.staff.relieve_burnout((*amount).into());
            false
        }
        ActionEffect::SafetyWork(amount) => {
            state.safety_work = state.safety_work.saturating_add((*amount).into());
            false
        }
        ActionEffect::CapabilityWork(amount) => {
            state.capability_work = state.capability_work.saturating_add((*amount).into());
            false
        }
        ActionEffect::SuppressRivals(amount) => {
            for rival in &mut state.rivals {
                rival.suppress((*amount).into());
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScenarioConfig;

    fn state() -> GameState {
        let mut state = GameState::new("actions", &ScenarioConfig::default());
        state.ap.reset_for_turn(3);
        state
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = ActionCatalog::standard();
        assert_eq!(catalog.len(), 12);
        for def in catalog.iter() {
            def.validate().unwrap();
        }
        assert_eq!(catalog.require("fundraise").unwrap().ap_cost, 2);
        assert!(matches!(
            catalog.require("teleport"),
            Err(GameError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_selection_commits_ap() {
        let catalog = ActionCatalog::standard();
        let mut state = state();
        commit_selection(catalog.require("buy_compute").unwrap(), &mut state).unwrap();
        assert_eq!(state.ap.committed, 1);
        assert_eq!(state.get_available_ap(), 2);
    }

    #[test]
    fn test_selection_rejects_over_cost_against_remaining_ap() {
        let catalog = ActionCatalog::standard();
        let mut state = state();
        state.ap.reserve(2).unwrap();
        let err = commit_selection(catalog.require("fundraise").unwrap(), &mut state).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientActionPoints {
                required: 2,
                available: 1
            }
        );
        assert_eq!(state.ap.committed, 0);
    }

    #[test]
    fn test_fire_needs_staff() {
        let catalog = ActionCatalog::standard();
        let mut state = state();
        let err =
            commit_selection(catalog.require("fire_researcher").unwrap(), &mut state).unwrap_err();
        assert!(matches!(err, GameError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_execute_pays_and_applies() {
        let catalog = ActionCatalog::standard();
        let tuning = StaffTuning::default();
        let mut state = state();
        let result = execute_action(
            catalog.require("hire_safety_researcher").unwrap(),
            &mut state,
            &tuning,
        );
        assert!(result.success);
        assert_eq!(state.resources.money, Fixed::from_num(75_000));
        assert_eq!(state.staff.count(Specialization::Safety), 1);
    }

    #[test]
    fn test_execute_skips_unaffordable() {
        let catalog = ActionCatalog::standard();
        let tuning = StaffTuning::default();
        let mut state = state();
        state.resources.compute = Fixed::from_num(10);
        let result =
            execute_action(catalog.require("safety_research").unwrap(), &mut state, &tuning);
        assert!(!result.success);
        assert!(matches!(result.error, Some(GameError::InsufficientResources { .. })));
        assert_eq!(state.resources.compute, Fixed::from_num(10));
        assert_eq!(state.safety_work, Fixed::ZERO);
    }

    #[test]
    fn test_fundraise_range() {
        let catalog = ActionCatalog::standard();
        let tuning = StaffTuning::default();
        let mut state = state();
        execute_action(catalog.require("fundraise").unwrap(), &mut state, &tuning);
        let raised = state.resources.money - Fixed::from_num(100_000);
        assert!(raised >= Fixed::from_num(30_000));
        assert!(raised <= Fixed::from_num(60_000));
        assert_eq!(state.rng.draw_count(), 1);
    }

    #[test]
    fn test_lobbying_suppresses_every_rival() {
        let catalog = ActionCatalog::standard();
        let tuning = StaffTuning::default();
        let mut state = state();
        let before: Vec<Fixed> = state.rivals.iter().map(|r| r.aggression).collect();
        assert!(
            execute_action(catalog.require("lobby_government").unwrap(), &mut state, &tuning)
                .success
        );
        for (rival, old) in state.rivals.iter().zip(before) {
            assert!(rival.aggression < old);
        }
    }

    #[test]
    fn test_catalog_from_ron() {
        let catalog = ActionCatalog::from_ron_str(
            r#"[ActionDefinition(id: "rest", ap_cost: 1, effects: [ReduceBurnout(5.0)])]"#,
        )
        .unwrap();
        assert!(catalog.get("rest").is_some());
    }
}
