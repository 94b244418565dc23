//! # P(Doom) Core
//!
//! Deterministic turn simulation kernel for a doom-risk management game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No file or network IO
//! - No system randomness
//! - No floating-point math in simulation state (uses fixed-point)
//!
//! This separation enables:
//! - Bit-identical results from (seed, inputs) on every platform
//! - Tamper-evident verification chains for leaderboards
//! - Headless tooling and replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`turn`] - Turn phase state machine and the game session
//! - [`state`] - Game state and read-only snapshots
//! - [`actions`] - Action catalog, selection and queued execution
//! - [`events`] - Event catalog and rarity-tiered trigger engine
//! - [`doom`] - Hidden risk pools and doom settlement
//! - [`verification`] - Hash chain and leaderboard submission
//! - [`rng`] - The session's logged, seeded RNG
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod data;
pub mod doom;
pub mod error;
pub mod events;
pub mod math;
pub mod notify;
pub mod replay;
pub mod resources;
pub mod rivals;
pub mod rng;
pub mod staff;
pub mod state;
pub mod turn;
pub mod verification;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{ActionCatalog, ActionResult};
    pub use crate::data::{
        ActionDefinition, EventDefinition, EventOption, Rarity, ScenarioConfig, ScenarioOverrides,
    };
    pub use crate::doom::DoomStatus;
    pub use crate::error::{ErrorCategory, ErrorRecord, GameError, Result, Severity};
    pub use crate::events::{EventCatalog, PendingEvent};
    pub use crate::math::Fixed;
    pub use crate::notify::{GameObserver, Notification};
    pub use crate::replay::{PlayerInput, Replay};
    pub use crate::resources::{Resource, ResourceMap};
    pub use crate::staff::Specialization;
    pub use crate::state::{GameOutcome, GameSnapshot};
    pub use crate::turn::{GameContent, GameSession, Phase, TurnReport};
    pub use crate::verification::{LeaderboardSubmission, VerificationTracker};
}
