//! Researchers owned by the player's lab.
//!
//! Researchers are created by hire actions and removed by firing or
//! attrition. Iteration is always in id order so that staff processing
//! is deterministic.

use serde::{Deserialize, Serialize};

use crate::data::StaffTuning;
use crate::math::{fixed_serde, Fixed, DOOM_MAX};
use crate::rng::SessionRng;

/// Unique researcher identifier.
pub type ResearcherId = u32;

/// Area a researcher works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Specialization {
    /// Alignment and safety work; mitigates doom.
    Safety,
    /// Capability work; produces research but feeds doom.
    Capability,
    /// Infrastructure; produces compute.
    Compute,
    /// Management; relieves burnout and adds AP.
    Management,
}

impl Specialization {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Capability => "capability",
            Self::Compute => "compute",
            Self::Management => "management",
        }
    }
}

/// A researcher on staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Researcher {
    /// Unique id.
    pub id: ResearcherId,
    /// Area of work.
    pub specialization: Specialization,
    /// Skill level.
    #[serde(with = "fixed_serde")]
    pub skill_level: Fixed,
    /// Burnout, 0..100.
    #[serde(with = "fixed_serde")]
    pub burnout: Fixed,
}

impl Researcher {
    /// Effective output multiplier: `skill * (1 - burnout / 200)`.
    #[must_use]
    pub fn effective_power(&self) -> Fixed {
        let fatigue = self.burnout / Fixed::from_num(200);
        self.skill_level.saturating_mul(Fixed::ONE - fatigue)
    }
}

/// What the staff produced during one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffReport {
    /// Research generated.
    pub research: Fixed,
    /// Compute generated.
    pub compute: Fixed,
    /// Researchers who quit from burnout.
    pub departures: Vec<ResearcherId>,
}

/// The player's staff roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    researchers: Vec<Researcher>,
    next_id: ResearcherId,
}

impl Default for Staff {
    fn default() -> Self {
        Self::new()
    }
}

impl Staff {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            researchers: Vec::new(),
            next_id: 1,
        }
    }

    /// Researchers in id order.
    #[must_use]
    pub fn researchers(&self) -> &[Researcher] {
        &self.researchers
    }

    /// Number of researchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.researchers.len()
    }

    /// Whether nobody is on staff.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.researchers.is_empty()
    }

    /// Count researchers with a specialization.
    #[must_use]
    pub fn count(&self, specialization: Specialization) -> usize {
        self.researchers
            .iter()
            .filter(|r| r.specialization == specialization)
            .count()
    }

    /// Summed effective power of a specialization.
    #[must_use]
    pub fn power(&self, specialization: Specialization) -> Fixed {
        self.researchers
            .iter()
            .filter(|r| r.specialization == specialization)
            .fold(Fixed::ZERO, |acc, r| acc.saturating_add(r.effective_power()))
    }

    /// Hire a researcher, rolling their skill. Returns the new id.
    pub fn hire(
        &mut self,
        specialization: Specialization,
        tuning: &StaffTuning,
        rng: &mut SessionRng,
    ) -> ResearcherId {
        let roll = rng.below(u64::from(tuning.hire_skill_spread), "hire_skill");
        let skill = u64::from(tuning.hire_skill_base) + roll;
        let id = self.next_id;
        self.next_id += 1;
        self.researchers.push(Researcher {
            id,
            specialization,
            skill_level: Fixed::saturating_from_num(skill),
            burnout: Fixed::ZERO,
        });
        tracing::debug!(
            researcher = id,
            specialization = specialization.name(),
            %skill,
            "Hired researcher"
        );
        id
    }

    /// Remove the most burnt-out researcher (lowest id on ties).
    pub fn fire_most_burned_out(&mut self) -> Option<Researcher> {
        let index = self
            .researchers
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.burnout.cmp(&b.burnout).then(ib.cmp(ia)))
            .map(|(i, _)| i)?;
        Some(self.researchers.remove(index))
    }

    /// Lower everyone's burnout by `amount`, not below zero.
    pub fn relieve_burnout(&mut self, amount: Fixed) {
        for researcher in &mut self.researchers {
            researcher.burnout = (researcher.burnout - amount).max(Fixed::ZERO);
        }
    }

    /// Run one turn of staff output, burnout and attrition.
    pub fn process_turn(&mut self, tuning: &StaffTuning, rng: &mut SessionRng) -> StaffReport {
        let mut report = StaffReport {
            research: self
                .power(Specialization::Safety)
                .saturating_mul(tuning.safety_output)
                .saturating_add(
                    self.power(Specialization::Capability)
                        .saturating_mul(tuning.capability_output),
                ),
            compute: self
                .power(Specialization::Compute)
                .saturating_mul(tuning.compute_output),
            departures: Vec::new(),
        };

        let managers = Fixed::saturating_from_num(self.count(Specialization::Management));
        let gain = (tuning.burnout_per_turn - managers.saturating_mul(tuning.manager_relief))
            .max(Fixed::ZERO);
        for researcher in &mut self.researchers {
            if researcher.specialization != Specialization::Management {
                researcher.burnout = (researcher.burnout + gain).min(DOOM_MAX);
            }
        }

        let mut kept = Vec::with_capacity(self.researchers.len());
        for researcher in std::mem::take(&mut self.researchers) {
            let at_risk = researcher.burnout >= tuning.attrition_threshold;
            if at_risk
                && rng.chance(
                    tuning.attrition_chance,
                    format!("attrition:{}", researcher.id),
                )
            {
                tracing::debug!(researcher = researcher.id, "Researcher quit from burnout");
                report.departures.push(researcher.id);
            } else {
                kept.push(researcher);
            }
        }
        self.researchers = kept;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hire_n(staff: &mut Staff, spec: Specialization, n: usize, rng: &mut SessionRng) {
        let tuning = StaffTuning::default();
        for _ in 0..n {
            staff.hire(spec, &tuning, rng);
        }
    }

    #[test]
    fn test_hire_assigns_ids_and_skill() {
        let mut rng = SessionRng::from_seed_str("staff");
        let mut staff = Staff::new();
        hire_n(&mut staff, Specialization::Safety, 3, &mut rng);
        let ids: Vec<_> = staff.researchers().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        for r in staff.researchers() {
            assert!(r.skill_level >= Fixed::from_num(3));
            assert!(r.skill_level <= Fixed::from_num(7));
        }
        assert_eq!(rng.draw_count(), 3);
    }

    #[test]
    fn test_fire_most_burned_out_prefers_lowest_id_on_tie() {
        let mut rng = SessionRng::from_seed_str("fire");
        let mut staff = Staff::new();
        hire_n(&mut staff, Specialization::Capability, 3, &mut rng);
        let fired = staff.fire_most_burned_out().unwrap();
        assert_eq!(fired.id, 1);

        staff.researchers[1].burnout = Fixed::from_num(40);
        let fired = staff.fire_most_burned_out().unwrap();
        assert_eq!(fired.id, 3);
        assert_eq!(staff.len(), 1);
    }

    #[test]
    fn test_managers_relieve_burnout() {
        let mut rng = SessionRng::from_seed_str("burnout");
        let tuning = StaffTuning::default();
        let mut staff = Staff::new();
        hire_n(&mut staff, Specialization::Safety, 1, &mut rng);
        staff.process_turn(&tuning, &mut rng);
        assert_eq!(staff.researchers()[0].burnout, Fixed::from_num(3));

        hire_n(&mut staff, Specialization::Management, 2, &mut rng);
        staff.process_turn(&tuning, &mut rng);
        // two managers fully offset the per-turn gain
        assert_eq!(staff.researchers()[0].burnout, Fixed::from_num(3));
        assert_eq!(staff.researchers()[1].burnout, Fixed::ZERO);
    }

    #[test]
    fn test_output_scales_with_specialization() {
        let mut rng = SessionRng::from_seed_str("output");
        let tuning = StaffTuning::default();
        let mut staff = Staff::new();
        hire_n(&mut staff, Specialization::Compute, 1, &mut rng);
        let skill = staff.researchers()[0].skill_level;
        let report = staff.process_turn(&tuning, &mut rng);
        assert_eq!(report.compute, skill);
        assert_eq!(report.research, Fixed::ZERO);
    }

    #[test]
    fn test_attrition_only_rolls_for_burnt_out() {
        let mut rng = SessionRng::from_seed_str("attrition");
        let tuning = StaffTuning {
            attrition_chance: Fixed::ONE,
            ..StaffTuning::default()
        };
        let mut staff = Staff::new();
        hire_n(&mut staff, Specialization::Safety, 2, &mut rng);
        staff.researchers[0].burnout = Fixed::from_num(90);
        let before = rng.draw_count();
        let report = staff.process_turn(&tuning, &mut rng);
        assert_eq!(report.departures, vec![1]);
        assert_eq!(staff.len(), 1);
        assert_eq!(rng.draw_count(), before + 1);
    }
}
