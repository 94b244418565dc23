//! Doom/risk engine.
//!
//! Hidden risk pools are re-evaluated at the start of each turn and again
//! when doom is settled at the end of it. The per-turn delta is smoothed
//! against the previous one so doom does not whipsaw between turns.

use serde::{Deserialize, Serialize};

use crate::data::DoomTuning;
use crate::math::{clamp_reporting, fixed_serde, Fixed, DOOM_MAX};

/// Which hidden pool a [`RiskPool`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    /// Capability staff power plus capability work.
    Capability,
    /// Safety staff power plus safety work.
    Safety,
    /// Summed rival pressure.
    Rivals,
    /// Unresolved turbulence from triggered events.
    Instability,
}

impl PoolKind {
    /// All pools in evaluation order.
    pub const ALL: [Self; 4] = [Self::Capability, Self::Safety, Self::Rivals, Self::Instability];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Capability => "capability",
            Self::Safety => "safety",
            Self::Rivals => "rivals",
            Self::Instability => "instability",
        }
    }
}

/// One hidden risk pool. Never exposed in player snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskPool {
    /// Pool identity.
    pub kind: PoolKind,
    /// Current value.
    #[serde(with = "fixed_serde")]
    pub value: Fixed,
    /// Change since the previous evaluation.
    #[serde(with = "fixed_serde")]
    pub trend: Fixed,
}

impl RiskPool {
    fn new(kind: PoolKind) -> Self {
        Self {
            kind,
            value: Fixed::ZERO,
            trend: Fixed::ZERO,
        }
    }

    fn set(&mut self, value: Fixed) {
        self.trend = value - self.value;
        self.value = value;
    }
}

/// Observed quantities the pools are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskInputs {
    /// Capability staff power plus this turn's capability work.
    pub capability: Fixed,
    /// Safety staff power plus this turn's safety work.
    pub safety: Fixed,
    /// Summed rival pressure.
    pub rivals: Fixed,
}

/// Coarse, player-facing doom label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoomStatus {
    /// Doom is flat or falling.
    Stable,
    /// Doom is climbing.
    Rising,
    /// Doom is high or climbing fast.
    Critical,
}

/// Result of settling doom at turn end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoomSettlement {
    /// Doom before settlement.
    pub previous: Fixed,
    /// Doom after settlement.
    pub doom: Fixed,
    /// Unsmoothed delta.
    pub raw_delta: Fixed,
    /// Smoothed delta actually applied.
    pub velocity: Fixed,
    /// Whether the result hit 0 or 100.
    pub clamped: bool,
}

/// Computes doom from hidden risk pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoomEngine {
    tuning: DoomTuning,
    pools: [RiskPool; 4],
    #[serde(with = "fixed_serde")]
    velocity: Fixed,
}

impl DoomEngine {
    /// Create an engine with all pools empty.
    #[must_use]
    pub fn new(tuning: DoomTuning) -> Self {
        Self {
            tuning,
            pools: PoolKind::ALL.map(RiskPool::new),
            velocity: Fixed::ZERO,
        }
    }

    /// Current value of a pool.
    #[must_use]
    pub fn pool(&self, kind: PoolKind) -> RiskPool {
        self.pools[kind as usize]
    }

    /// All pools, in [`PoolKind::ALL`] order.
    #[must_use]
    pub fn pools(&self) -> &[RiskPool] {
        &self.pools
    }

    /// Smoothed delta applied at the last settlement.
    #[must_use]
    pub const fn velocity(&self) -> Fixed {
        self.velocity
    }

    /// Start-of-turn evaluation: instability decays by half, the other
    /// pools track their inputs.
    pub fn begin_turn(&mut self, inputs: &RiskInputs) {
        let instability = self.pool(PoolKind::Instability).value / Fixed::from_num(2);
        self.pools[PoolKind::Instability as usize].set(instability);
        self.evaluate(inputs);
    }

    /// Re-derive the input-driven pools.
    pub fn evaluate(&mut self, inputs: &RiskInputs) {
        self.pools[PoolKind::Capability as usize].set(inputs.capability);
        self.pools[PoolKind::Safety as usize].set(inputs.safety);
        self.pools[PoolKind::Rivals as usize].set(inputs.rivals);
    }

    /// Each triggered event adds one unit of instability.
    pub fn add_instability(&mut self, events: usize) {
        if events == 0 {
            return;
        }
        let pool = &mut self.pools[PoolKind::Instability as usize];
        let value = pool.value.saturating_add(Fixed::saturating_from_num(events));
        pool.trend = pool.trend.saturating_add(value - pool.value);
        pool.value = value;
    }

    /// Unsmoothed delta from the current pools.
    #[must_use]
    pub fn raw_delta(&self) -> Fixed {
        let t = &self.tuning;
        let weighted = |kind: PoolKind, weight: Fixed| self.pool(kind).value.saturating_mul(weight);
        t.base_drift
            .saturating_add(weighted(PoolKind::Capability, t.capability_weight))
            .saturating_sub(weighted(PoolKind::Safety, t.safety_weight))
            .saturating_add(weighted(PoolKind::Rivals, t.rival_weight))
            .saturating_add(weighted(PoolKind::Instability, t.instability_weight))
    }

    /// End-of-turn settlement: smooth the delta and clamp doom to 0..100.
    pub fn settle(&mut self, doom: Fixed, inputs: &RiskInputs) -> DoomSettlement {
        self.evaluate(inputs);
        let raw_delta = self.raw_delta();
        let momentum = self.tuning.momentum;
        let velocity = momentum
            .saturating_mul(self.velocity)
            .saturating_add((Fixed::ONE - momentum).saturating_mul(raw_delta));
        self.velocity = velocity;
        let (next, clamped) = clamp_reporting(doom.saturating_add(velocity), Fixed::ZERO, DOOM_MAX);
        tracing::debug!(%doom, %next, %raw_delta, %velocity, "Doom settled");
        DoomSettlement {
            previous: doom,
            doom: next,
            raw_delta,
            velocity,
            clamped,
        }
    }

    /// Qualitative label for `doom` given the current velocity.
    #[must_use]
    pub fn status(&self, doom: Fixed) -> DoomStatus {
        if doom >= Fixed::from_num(80) || self.velocity >= Fixed::from_num(2) {
            DoomStatus::Critical
        } else if self.velocity > Fixed::ZERO {
            DoomStatus::Rising
        } else {
            DoomStatus::Stable
        }
    }
}
