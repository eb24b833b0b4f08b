//! Progression Configuration
//!
//! 모든 튜닝 상수를 한 곳에서 관리하는 설정 구조체.
//!
//! The configuration is a plain value passed into every ledger call. Nothing
//! in the crate caches derived quantities, so swapping the config between two
//! calls (e.g. lowering `max_level`) takes effect on the next mutation of each
//! record.
//!
//! ```rust
//! use progression_core::config::ProgressionConfig;
//!
//! let config = ProgressionConfig::default();
//! assert_eq!(config.max_level, 25);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progression::attributes::Attribute;
use crate::progression::level_curve::LevelCurve;

const DEFAULT_CONFIG_YAML: &str = include_str!("progression_defaults.yaml");
static DEFAULT_CONFIG: OnceLock<ProgressionConfig> = OnceLock::new();

/// Upper bound accepted for `max_level`; keeps cumulative XP well inside i64.
pub const MAX_LEVEL_CAP: i32 = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Level curve constants: `base + linear·l + quadratic·l²`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub base: i64,
    pub linear: i64,
    pub quadratic: i64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self { base: 100, linear: 50, quadratic: 20 }
    }
}

/// Kill award tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardConfig {
    /// Opponents at or above this max health count as bosses
    pub boss_health_threshold: f64,
    pub boss_multiplier: f64,
    pub min_award: i64,
    pub max_award: i64,
}

impl Default for AwardConfig {
    fn default() -> Self {
        Self { boss_health_threshold: 200.0, boss_multiplier: 1.5, min_award: 1, max_award: 1000 }
    }
}

/// Per-ability upgrade policy.
///
/// Upgrade cost at level `l` is `base_cost + cost_step·l` (see `AbilitySpec::cost`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySpec {
    pub max_level: i32,
    #[serde(default = "default_base_cost")]
    pub base_cost: u32,
    #[serde(default)]
    pub cost_step: u32,
}

fn default_base_cost() -> u32 {
    1
}

fn default_max_level() -> i32 {
    25
}

fn default_xp_multiplier() -> f64 {
    0.35
}

fn default_base_attribute() -> i32 {
    10
}

fn default_ability_points_per_level() -> i32 {
    1
}

/// Process-wide progression tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_max_level")]
    pub max_level: i32,

    /// Kill award multiplier applied to opponent max health
    #[serde(default = "default_xp_multiplier")]
    pub xp_multiplier: f64,

    #[serde(default)]
    pub curve: CurveConfig,

    /// Starting value of every attribute
    #[serde(default = "default_base_attribute")]
    pub base_attribute: i32,

    #[serde(default = "default_ability_points_per_level")]
    pub ability_points_per_level: i32,

    #[serde(default)]
    pub award: AwardConfig,

    #[serde(default)]
    pub abilities: BTreeMap<String, AbilitySpec>,

    /// Effect coefficients per attribute id, read by external appliers
    #[serde(default)]
    pub attribute_effects: BTreeMap<String, f64>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self::embedded().clone()
    }
}

impl ProgressionConfig {
    /// Embedded defaults from `progression_defaults.yaml`
    pub fn embedded() -> &'static ProgressionConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            Self::from_yaml_str(DEFAULT_CONFIG_YAML).expect("embedded progression defaults invalid")
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ProgressionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&yaml)?;
        log::info!("Loaded progression config from {:?}", path);
        Ok(config)
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn level_curve(&self) -> LevelCurve {
        LevelCurve::new(self.curve, self.max_level)
    }

    pub fn ability(&self, ability_id: &str) -> Option<&AbilitySpec> {
        self.abilities.get(ability_id)
    }

    pub fn attribute_effect(&self, attribute: Attribute) -> Option<f64> {
        self.attribute_effects.get(attribute.id()).copied()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LEVEL_CAP).contains(&self.max_level) {
            return Err(invalid(format!(
                "max_level {} outside 1..={}",
                self.max_level, MAX_LEVEL_CAP
            )));
        }
        if !self.xp_multiplier.is_finite() || self.xp_multiplier <= 0.0 {
            return Err(invalid(format!("xp_multiplier {} must be > 0", self.xp_multiplier)));
        }
        if self.curve.base < 1 || self.curve.linear < 0 || self.curve.quadratic < 0 {
            return Err(invalid(format!("curve {:?} must have base >= 1 and non-negative terms", self.curve)));
        }
        if self.base_attribute < 1 {
            return Err(invalid(format!("base_attribute {} must be >= 1", self.base_attribute)));
        }
        if self.ability_points_per_level < 0 {
            return Err(invalid(format!(
                "ability_points_per_level {} must be >= 0",
                self.ability_points_per_level
            )));
        }

        let award = &self.award;
        if !award.boss_health_threshold.is_finite() || award.boss_health_threshold < 0.0 {
            return Err(invalid("award.boss_health_threshold must be >= 0".to_string()));
        }
        if !award.boss_multiplier.is_finite() || award.boss_multiplier < 0.0 {
            return Err(invalid("award.boss_multiplier must be >= 0".to_string()));
        }
        if award.min_award < 0 || award.min_award > award.max_award {
            return Err(invalid(format!(
                "award bounds [{}, {}] invalid",
                award.min_award, award.max_award
            )));
        }

        for (id, spec) in &self.abilities {
            if id.trim().is_empty() {
                return Err(invalid("ability id is empty".to_string()));
            }
            if spec.max_level < 0 {
                return Err(invalid(format!("ability {} max_level must be >= 0", id)));
            }
            if spec.base_cost == 0 {
                return Err(invalid(format!("ability {} base_cost must be >= 1", id)));
            }
        }

        for key in self.attribute_effects.keys() {
            if Attribute::from_id(key).is_none() {
                return Err(invalid(format!("attribute_effects has unknown key {}", key)));
            }
        }

        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}
