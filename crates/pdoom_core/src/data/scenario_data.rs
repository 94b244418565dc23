//! Scenario configuration and sparse overrides.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{decimal_serde, option_decimal_serde, Fixed, DOOM_MAX};

/// Starting configuration for one rival lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RivalConfig {
    /// Display name, also the rival's stable identifier.
    pub name: String,
    /// Starting capability level.
    #[serde(with = "decimal_serde")]
    pub capabilities: Fixed,
    /// Starting funds.
    #[serde(with = "decimal_serde")]
    pub money: Fixed,
    /// Aggression, 0..1.
    #[serde(with = "decimal_serde")]
    pub aggression: Fixed,
}

impl RivalConfig {
    /// Create a rival configuration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        capabilities: Fixed,
        money: Fixed,
        aggression: Fixed,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities,
            money,
            aggression,
        }
    }
}

/// Weights of the doom equation.
///
/// `raw = base_drift + capability_weight * capability - safety_weight * safety
///        + rival_weight * rivals + instability_weight * instability`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoomTuning {
    /// Constant per-turn drift.
    #[serde(with = "decimal_serde")]
    pub base_drift: Fixed,
    /// Weight of the capability pool.
    #[serde(with = "decimal_serde")]
    pub capability_weight: Fixed,
    /// Weight of the safety pool.
    #[serde(with = "decimal_serde")]
    pub safety_weight: Fixed,
    /// Weight of the rival pool.
    #[serde(with = "decimal_serde")]
    pub rival_weight: Fixed,
    /// Weight of the instability pool.
    #[serde(with = "decimal_serde")]
    pub instability_weight: Fixed,
    /// Share of the previous delta carried into the next, 0..1.
    #[serde(with = "decimal_serde")]
    pub momentum: Fixed,
}

impl Default for DoomTuning {
    fn default() -> Self {
        Self {
            base_drift: Fixed::from_num(0.3),
            capability_weight: Fixed::from_num(0.15),
            safety_weight: Fixed::from_num(0.2),
            rival_weight: Fixed::from_num(0.02),
            instability_weight: Fixed::from_num(0.25),
            momentum: Fixed::from_num(0.5),
        }
    }
}

/// Researcher output, burnout and attrition parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffTuning {
    /// Research per skill point from safety researchers.
    #[serde(with = "decimal_serde")]
    pub safety_output: Fixed,
    /// Research per skill point from capability researchers.
    #[serde(with = "decimal_serde")]
    pub capability_output: Fixed,
    /// Compute per skill point from compute engineers.
    #[serde(with = "decimal_serde")]
    pub compute_output: Fixed,
    /// Burnout gained per turn by non-managers.
    #[serde(with = "decimal_serde")]
    pub burnout_per_turn: Fixed,
    /// Burnout gain removed per manager.
    #[serde(with = "decimal_serde")]
    pub manager_relief: Fixed,
    /// Burnout at which a researcher may quit.
    #[serde(with = "decimal_serde")]
    pub attrition_threshold: Fixed,
    /// Chance per turn that a burnt-out researcher quits.
    #[serde(with = "decimal_serde")]
    pub attrition_chance: Fixed,
    /// Minimum skill of a new hire.
    pub hire_skill_base: u32,
    /// Number of skill values above the base a hire can roll.
    pub hire_skill_spread: u32,
}

impl Default for StaffTuning {
    fn default() -> Self {
        Self {
            safety_output: Fixed::from_num(0.5),
            capability_output: Fixed::from_num(0.8),
            compute_output: Fixed::ONE,
            burnout_per_turn: Fixed::from_num(3),
            manager_relief: Fixed::from_num(1.5),
            attrition_threshold: Fixed::from_num(80),
            attrition_chance: Fixed::from_num(0.25),
            hire_skill_base: 3,
            hire_skill_spread: 5,
        }
    }
}

/// Maps real-world dates onto turn numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    /// Date of turn 0.
    pub start_date: NaiveDate,
    /// In-game days per turn.
    pub days_per_turn: u32,
}

impl Calendar {
    /// Turn on which `date` falls, `None` when before the start date.
    #[must_use]
    pub fn turn_for_date(&self, date: NaiveDate) -> Option<u32> {
        let days = (date - self.start_date).num_days();
        if days < 0 || self.days_per_turn == 0 {
            return None;
        }
        u32::try_from(days / i64::from(self.days_per_turn)).ok()
    }

    /// Date on which `turn` starts.
    #[must_use]
    pub fn date_for_turn(&self, turn: u32) -> NaiveDate {
        let days = u64::from(turn) * u64::from(self.days_per_turn);
        self.start_date
            .checked_add_days(chrono::Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 7, 3).unwrap_or(NaiveDate::MIN)
}

/// Complete scenario configuration.
///
/// Loaded from RON or built from [`ScenarioConfig::default`] plus a
/// [`ScenarioOverrides`] map.
///
/// # Example RON
///
/// ```ron
/// ScenarioConfig(
///     name: "Standard",
///     starting_money: 100000.0,
///     base_action_points: 3,
///     start_date: "2017-07-03",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Scenario name.
    pub name: String,
    /// Starting funds.
    #[serde(with = "decimal_serde")]
    pub starting_money: Fixed,
    /// Starting compute.
    #[serde(with = "decimal_serde")]
    pub starting_compute: Fixed,
    /// Starting research.
    #[serde(with = "decimal_serde")]
    pub starting_research: Fixed,
    /// Starting papers.
    pub starting_papers: u32,
    /// Starting reputation, 0..100.
    #[serde(with = "decimal_serde")]
    pub starting_reputation: Fixed,
    /// Starting doom, 0..100.
    #[serde(with = "decimal_serde")]
    pub starting_doom: Fixed,
    /// AP granted each turn before manager bonuses.
    pub base_action_points: u32,
    /// Calendar date of turn 0.
    pub start_date: NaiveDate,
    /// In-game days per turn.
    pub days_per_turn: u32,
    /// Earliest turn on which doom reaching 0 counts as victory.
    pub victory_min_turn: u32,
    /// Staff are paid every this many turns.
    pub payroll_interval: u32,
    /// Salary per researcher per payroll.
    #[serde(with = "decimal_serde")]
    pub salary: Fixed,
    /// Rival roster.
    pub rivals: Vec<RivalConfig>,
    /// Doom equation weights.
    pub doom: DoomTuning,
    /// Staff parameters.
    pub staff: StaffTuning,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "Standard".to_string(),
            starting_money: Fixed::from_num(100_000),
            starting_compute: Fixed::from_num(100),
            starting_research: Fixed::ZERO,
            starting_papers: 0,
            starting_reputation: Fixed::from_num(50),
            starting_doom: Fixed::from_num(20),
            base_action_points: 3,
            start_date: default_start_date(),
            days_per_turn: 7,
            victory_min_turn: 20,
            payroll_interval: 4,
            salary: Fixed::from_num(1_000),
            rivals: vec![
                RivalConfig::new(
                    "Apex Intelligence",
                    Fixed::from_num(20),
                    Fixed::from_num(100),
                    Fixed::from_num(0.7),
                ),
                RivalConfig::new(
                    "Frontier Dynamics",
                    Fixed::from_num(15),
                    Fixed::from_num(80),
                    Fixed::from_num(0.5),
                ),
                RivalConfig::new(
                    "Helix Labs",
                    Fixed::from_num(10),
                    Fixed::from_num(60),
                    Fixed::from_num(0.3),
                ),
            ],
            doom: DoomTuning::default(),
            staff: StaffTuning::default(),
        }
    }
}

impl ScenarioConfig {
    /// Parse a full configuration from RON. Missing fields take defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<scenario>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a sparse override map onto this configuration.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ScenarioOverrides) -> Self {
        if let Some(name) = &overrides.name {
            self.name.clone_from(name);
        }
        if let Some(v) = overrides.starting_money {
            self.starting_money = v;
        }
        if let Some(v) = overrides.starting_compute {
            self.starting_compute = v;
        }
        if let Some(v) = overrides.starting_research {
            self.starting_research = v;
        }
        if let Some(v) = overrides.starting_papers {
            self.starting_papers = v;
        }
        if let Some(v) = overrides.starting_reputation {
            self.starting_reputation = v;
        }
        if let Some(v) = overrides.starting_doom {
            self.starting_doom = v;
        }
        if let Some(v) = overrides.base_action_points {
            self.base_action_points = v;
        }
        if let Some(v) = overrides.start_date {
            self.start_date = v;
        }
        if let Some(v) = overrides.days_per_turn {
            self.days_per_turn = v;
        }
        if let Some(v) = overrides.victory_min_turn {
            self.victory_min_turn = v;
        }
        if let Some(v) = overrides.payroll_interval {
            self.payroll_interval = v;
        }
        if let Some(v) = overrides.salary {
            self.salary = v;
        }
        if let Some(rivals) = &overrides.rivals {
            self.rivals.clone_from(rivals);
        }
        if let Some(doom) = overrides.doom {
            self.doom = doom;
        }
        if let Some(staff) = overrides.staff {
            self.staff = staff;
        }
        self
    }

    /// Calendar derived from this configuration.
    #[must_use]
    pub const fn calendar(&self) -> Calendar {
        Calendar {
            start_date: self.start_date,
            days_per_turn: self.days_per_turn,
        }
    }

    /// Check ranges and structural requirements.
    pub fn validate(&self) -> Result<()> {
        let unit = |label: &str, v: Fixed| -> Result<()> {
            if v < Fixed::ZERO || v > Fixed::ONE {
                return Err(GameError::InvalidContent(format!(
                    "{label} must be within 0..1, got {v}"
                )));
            }
            Ok(())
        };
        let non_negative = |label: &str, v: Fixed| -> Result<()> {
            if v < Fixed::ZERO {
                return Err(GameError::InvalidContent(format!(
                    "{label} must not be negative, got {v}"
                )));
            }
            Ok(())
        };

        if self.base_action_points == 0 {
            return Err(GameError::InvalidContent(
                "base_action_points must be at least 1".into(),
            ));
        }
        if self.days_per_turn == 0 {
            return Err(GameError::InvalidContent("days_per_turn must be at least 1".into()));
        }
        if self.payroll_interval == 0 {
            return Err(GameError::InvalidContent(
                "payroll_interval must be at least 1".into(),
            ));
        }
        if self.starting_doom < Fixed::ZERO || self.starting_doom > DOOM_MAX {
            return Err(GameError::InvalidContent(format!(
                "starting_doom must be within 0..100, got {}",
                self.starting_doom
            )));
        }
        if self.starting_reputation < Fixed::ZERO || self.starting_reputation > DOOM_MAX {
            return Err(GameError::InvalidContent(format!(
                "starting_reputation must be within 0..100, got {}",
                self.starting_reputation
            )));
        }
        non_negative("starting_money", self.starting_money)?;
        non_negative("starting_compute", self.starting_compute)?;
        non_negative("starting_research", self.starting_research)?;
        non_negative("salary", self.salary)?;
        unit("doom.momentum", self.doom.momentum)?;
        if self.doom.momentum == Fixed::ONE {
            return Err(GameError::InvalidContent(
                "doom.momentum must be below 1".into(),
            ));
        }
        unit("staff.attrition_chance", self.staff.attrition_chance)?;

        let mut names: Vec<&str> = Vec::with_capacity(self.rivals.len());
        for rival in &self.rivals {
            if names.contains(&rival.name.as_str()) {
                return Err(GameError::InvalidContent(format!(
                    "duplicate rival '{}'",
                    rival.name
                )));
            }
            names.push(&rival.name);
            unit(&format!("rival '{}' aggression", rival.name), rival.aggression)?;
            non_negative(&format!("rival '{}' capabilities", rival.name), rival.capabilities)?;
        }
        Ok(())
    }
}

/// Sparse override map merged onto [`ScenarioConfig::default`].
///
/// Every field is optional; absent fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOverrides {
    /// Scenario name.
    pub name: Option<String>,
    /// Starting funds.
    #[serde(with = "option_decimal_serde")]
    pub starting_money: Option<Fixed>,
    /// Starting compute.
    #[serde(with = "option_decimal_serde")]
    pub starting_compute: Option<Fixed>,
    /// Starting research.
    #[serde(with = "option_decimal_serde")]
    pub starting_research: Option<Fixed>,
    /// Starting papers.
    pub starting_papers: Option<u32>,
    /// Starting reputation.
    #[serde(with = "option_decimal_serde")]
    pub starting_reputation: Option<Fixed>,
    /// Starting doom.
    #[serde(with = "option_decimal_serde")]
    pub starting_doom: Option<Fixed>,
    /// Base AP per turn.
    pub base_action_points: Option<u32>,
    /// Calendar date of turn 0.
    pub start_date: Option<NaiveDate>,
    /// Days per turn.
    pub days_per_turn: Option<u32>,
    /// Earliest victory turn.
    pub victory_min_turn: Option<u32>,
    /// Payroll interval.
    pub payroll_interval: Option<u32>,
    /// Salary per researcher.
    #[serde(with = "option_decimal_serde")]
    pub salary: Option<Fixed>,
    /// Replacement rival roster.
    pub rivals: Option<Vec<RivalConfig>>,
    /// Replacement doom tuning.
    pub doom: Option<DoomTuning>,
    /// Replacement staff tuning.
    pub staff: Option<StaffTuning>,
}

impl ScenarioOverrides {
    /// Parse overrides from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<overrides>".to_string(),
            message: e.to_string(),
        })
    }

    /// Override only the starting money.
    #[must_use]
    pub fn money(amount: Fixed) -> Self {
        Self {
            starting_money: Some(amount),
            ..Self::default()
        }
    }
}
