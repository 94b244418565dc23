//! Data structures for scenario, event and action content.
//!
//! This module contains pure data structures that define the content the
//! kernel consumes. All structs are designed to be deserialized from RON.
//!
//! **Note:** This module contains no file IO - it only defines data types
//! and parses strings. Loading files is handled by `pdoom_tools`.

mod action_data;
mod event_data;
mod scenario_data;

pub use action_data::{ActionDefinition, ActionEffect};
pub use event_data::{EventCondition, EventDefinition, EventOption, Rarity, TriggerMode};
pub use scenario_data::{
    Calendar, DoomTuning, RivalConfig, ScenarioConfig, ScenarioOverrides, StaffTuning,
};
