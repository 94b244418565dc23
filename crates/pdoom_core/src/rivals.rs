//! Autonomous rival labs.
//!
//! Each rival picks one move per turn, weighted by its aggression. All
//! draws go through the session RNG and therefore into the verification
//! chain.

use serde::{Deserialize, Serialize};

use crate::data::RivalConfig;
use crate::math::{fixed_serde, Fixed};
use crate::rng::SessionRng;

/// Rival identifier (index in the scenario roster).
pub type RivalId = u32;

/// A competing lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RivalLab {
    /// Roster index.
    pub id: RivalId,
    /// Display name.
    pub name: String,
    /// Capability level.
    #[serde(with = "fixed_serde")]
    pub capabilities: Fixed,
    /// Funds.
    #[serde(with = "fixed_serde")]
    pub money: Fixed,
    /// Aggression, 0..1.
    #[serde(with = "fixed_serde")]
    pub aggression: Fixed,
}

/// What a rival did on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RivalMove {
    /// Spend money on capabilities.
    CapabilityPush,
    /// Raise money.
    Fundraise,
    /// Publicly commit to safety, lowering aggression.
    SafetyPledge,
}

/// Record of one rival's move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RivalReport {
    /// Which rival moved.
    pub rival: RivalId,
    /// Chosen move.
    pub chosen: RivalMove,
}

const PUSH_COST: i32 = 10;
const FUNDRAISE_GAIN: i32 = 15;

impl RivalLab {
    /// Create a rival from its scenario configuration.
    #[must_use]
    pub fn from_config(id: RivalId, config: &RivalConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            capabilities: config.capabilities,
            money: config.money,
            aggression: config.aggression.clamp(Fixed::ZERO, Fixed::ONE),
        }
    }

    /// Selection weights in [`RivalMove`] declaration order.
    #[must_use]
    pub fn move_weights(&self) -> [Fixed; 3] {
        let calm = (Fixed::ONE - self.aggression) / Fixed::from_num(2);
        [
            self.aggression,
            calm + Fixed::from_num(0.1),
            calm,
        ]
    }

    /// Pressure this rival puts on doom: `aggression * capabilities / 10`.
    #[must_use]
    pub fn pressure(&self) -> Fixed {
        self.aggression.saturating_mul(self.capabilities) / Fixed::from_num(10)
    }

    /// Lower aggression, not below zero.
    pub fn suppress(&mut self, amount: Fixed) {
        self.aggression = (self.aggression - amount).max(Fixed::ZERO);
    }

    /// Draw and apply this rival's move for the turn.
    pub fn take_turn(&mut self, rng: &mut SessionRng) -> RivalReport {
        let weights = self.move_weights();
        let picked = rng.weighted_index(&weights, format!("rival:{}", self.name));
        let mut chosen = match picked {
            Some(0) => RivalMove::CapabilityPush,
            Some(2) => RivalMove::SafetyPledge,
            _ => RivalMove::Fundraise,
        };
        if chosen == RivalMove::CapabilityPush && self.money < Fixed::from_num(PUSH_COST) {
            chosen = RivalMove::Fundraise;
        }

        match chosen {
            RivalMove::CapabilityPush => {
                let gain = Fixed::from_num(2) + Fixed::from_num(3).saturating_mul(self.aggression);
                self.capabilities = self.capabilities.saturating_add(gain);
                self.money -= Fixed::from_num(PUSH_COST);
            }
            RivalMove::Fundraise => {
                self.money = self.money.saturating_add(Fixed::from_num(FUNDRAISE_GAIN));
            }
            RivalMove::SafetyPledge => {
                self.suppress(Fixed::from_num(0.05));
                self.capabilities = self.capabilities.saturating_add(Fixed::from_num(0.5));
            }
        }
        tracing::debug!(rival = %self.name, ?chosen, "Rival moved");
        RivalReport {
            rival: self.id,
            chosen,
        }
    }
}

/// Build the roster for a scenario.
#[must_use]
pub fn roster_from_config(configs: &[RivalConfig]) -> Vec<RivalLab> {
    configs
        .iter()
        .zip(0..)
        .map(|(config, id)| RivalLab::from_config(id, config))
        .collect()
}

/// Run one turn for every rival, in roster order.
pub fn simulate_rivals(rivals: &mut [RivalLab], rng: &mut SessionRng) -> Vec<RivalReport> {
    rivals.iter_mut().map(|rival| rival.take_turn(rng)).collect()
}
