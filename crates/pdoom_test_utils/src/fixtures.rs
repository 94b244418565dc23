//! Test fixtures and helpers.
//!
//! Pre-built sessions, scenarios and event definitions for consistent
//! testing.

use fixed::types::I32F32;
use pdoom_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// An option with no costs and no effects.
#[must_use]
pub fn free_option(id: &str) -> EventOption {
    EventOption::new(id, ResourceMap::new())
}

/// A legendary event fixed to `turn`.
#[must_use]
pub fn legendary_event(id: &str, turn: u32) -> EventDefinition {
    EventDefinition::new(id, Rarity::Legendary, vec![free_option("acknowledge")])
        .with_fixed_turn(turn)
}

/// A rare event with explicit probability and window, eligible from turn 0.
#[must_use]
pub fn rare_event(id: &str, probability: f64, window: u32) -> EventDefinition {
    EventDefinition::new(id, Rarity::Rare, vec![free_option("acknowledge")])
        .with_probability(fixed_f(probability))
        .with_window(window)
}

/// A common event with explicit probability and cooldown.
#[must_use]
pub fn common_event(id: &str, probability: f64, cooldown: u32) -> EventDefinition {
    EventDefinition::new(id, Rarity::Common, vec![free_option("acknowledge")])
        .with_probability(fixed_f(probability))
        .with_cooldown(cooldown)
}

/// Default scenario and actions with the given events.
///
/// # Panics
/// Panics if the events do not form a valid catalog.
#[must_use]
pub fn content_with_events(events: Vec<EventDefinition>) -> GameContent {
    GameContent {
        events: EventCatalog::new(events).expect("fixture events must be valid"),
        ..GameContent::default()
    }
}

/// Started session on default content.
///
/// # Panics
/// Panics if the default scenario is invalid.
#[must_use]
pub fn standard_session(seed: &str) -> GameSession {
    GameSession::start_new_game(seed, &ScenarioOverrides::default())
        .expect("default scenario is valid")
}

/// Started session on the given content.
///
/// # Panics
/// Panics if the scenario is invalid.
#[must_use]
pub fn session_with_content(seed: &str, content: GameContent) -> GameSession {
    GameSession::start_with_content(seed, &ScenarioOverrides::default(), content)
        .expect("fixture scenario is valid")
}

/// Overrides that set only the starting money.
#[must_use]
pub fn money_overrides(amount: i32) -> ScenarioOverrides {
    ScenarioOverrides::money(fixed(amount))
}

/// Overrides with no rivals, for isolating player-driven doom.
#[must_use]
pub fn no_rivals() -> ScenarioOverrides {
    ScenarioOverrides {
        rivals: Some(Vec::new()),
        ..ScenarioOverrides::default()
    }
}

/// Seeds `"{prefix}-0"` .. `"{prefix}-{count-1}"`.
#[must_use]
pub fn seeds(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}
