//! Progression Ledger
//!
//! One record per tracked actor. The struct is also the persisted layout:
//! `schemaVersion, level, totalXp, spendHistory, str, dex, con, intl, end, cha`
//! plus the ability fields (defaulted when absent).
//!
//! ## 불변 조건
//! - `level == level_for(total_xp)` after every mutation
//! - `spend_history.len() <= level - 1`
//! - every attribute score >= 1
//!
//! Level is always derived from XP. Anything that rewinds XP (admin
//! correction, a lower max level) unwinds the unearned stat points in LIFO
//! order on the next resync.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::attributes::Attribute;
use crate::config::ProgressionConfig;
use crate::save::migration::CURRENT_SCHEMA_VERSION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionLedger {
    pub(crate) schema_version: i32,
    pub(crate) level: i32,
    pub(crate) total_xp: i64,
    pub(crate) spend_history: Vec<String>,

    #[serde(rename = "str")]
    pub(crate) strength: i32,
    #[serde(rename = "dex")]
    pub(crate) dexterity: i32,
    #[serde(rename = "con")]
    pub(crate) constitution: i32,
    #[serde(rename = "intl")]
    pub(crate) intellect: i32,
    #[serde(rename = "end")]
    pub(crate) endurance: i32,
    #[serde(rename = "cha")]
    pub(crate) charisma: i32,

    #[serde(default)]
    pub(crate) ability_levels: BTreeMap<String, i32>,
    #[serde(default)]
    pub(crate) ability_history: Vec<String>,
}

/// What a resync changed. Callers may ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncReport {
    pub previous_level: i32,
    pub level: i32,
    /// Stat points rolled back, most recent first
    pub refunded_stat_points: Vec<Attribute>,
    /// Ability upgrades rolled back, most recent first
    pub refunded_abilities: Vec<String>,
}

impl ResyncReport {
    pub fn levels_gained(&self) -> i32 {
        self.level - self.previous_level
    }

    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }

    pub fn rolled_back(&self) -> bool {
        !self.refunded_stat_points.is_empty() || !self.refunded_abilities.is_empty()
    }
}

/// Read model for stats pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub schema_version: i32,
    pub level: i32,
    pub max_level: i32,
    pub total_xp: i64,
    pub xp_into_level: i64,
    pub xp_to_next_level: i64,
    pub earned_stat_points: i32,
    pub available_stat_points: i32,
    pub attributes: BTreeMap<Attribute, i32>,
    pub ability_levels: BTreeMap<String, i32>,
    pub available_ability_points: i64,
}

impl ProgressionLedger {
    /// Fresh record: level 1, no XP, every attribute at the configured base.
    pub fn new(config: &ProgressionConfig) -> Self {
        let base = config.base_attribute.max(1);
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            level: 1,
            total_xp: 0,
            spend_history: Vec::new(),
            strength: base,
            dexterity: base,
            constitution: base,
            intellect: base,
            endurance: base,
            charisma: base,
            ability_levels: BTreeMap::new(),
            ability_history: Vec::new(),
        }
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProgressionLedger)
    }

    // ========================
    // XP / Level
    // ========================

    /// Adds XP. Negative deltas count as zero; the total saturates at `i64::MAX`.
    pub fn grant_xp(&mut self, config: &ProgressionConfig, delta: i64) -> ResyncReport {
        self.total_xp = self.total_xp.saturating_add(delta.max(0));
        self.resync(config)
    }

    pub fn set_total_xp(&mut self, config: &ProgressionConfig, value: i64) -> ResyncReport {
        self.total_xp = value.max(0);
        self.resync(config)
    }

    /// Snaps XP to the floor of `target` (clamped to `[1, max_level]`).
    /// Partial progress toward the next level is discarded.
    pub fn set_level(&mut self, config: &ProgressionConfig, target: i32) -> ResyncReport {
        let curve = config.level_curve();
        let target = target.clamp(1, curve.max_level());
        self.total_xp = curve.total_xp_for(target);
        self.resync(config)
    }

    /// Re-derives level from XP and reconciles both point economies.
    ///
    /// Single pass: the stat history is truncated to the earned count in one
    /// split, so attribute decrements never feed back into level derivation.
    pub fn resync(&mut self, config: &ProgressionConfig) -> ResyncReport {
        let previous_level = self.level;
        self.level = config.level_curve().level_for(self.total_xp);

        let earned = self.earned_stat_points() as usize;
        let mut refunded_stat_points = Vec::new();
        if self.spend_history.len() > earned {
            let reclaimed = self.spend_history.split_off(earned);
            for id in reclaimed.into_iter().rev() {
                match Attribute::from_id(&id) {
                    Some(attribute) => {
                        let score = self.score_mut(attribute);
                        *score = (*score - 1).max(1);
                        refunded_stat_points.push(attribute);
                    }
                    None => log::warn!("Dropped unknown attribute '{}' from spend history", id),
                }
            }
        }

        for attribute in Attribute::ALL {
            let score = self.score_mut(attribute);
            *score = (*score).max(1);
        }

        let refunded_abilities = super::ability::reconcile_abilities(self, config);

        if self.level != previous_level {
            log::debug!("Level {} -> {} (xp {})", previous_level, self.level, self.total_xp);
        }
        if !refunded_stat_points.is_empty() {
            log::debug!("Rolled back {} stat points", refunded_stat_points.len());
        }

        ResyncReport { previous_level, level: self.level, refunded_stat_points, refunded_abilities }
    }

    // ========================
    // Stat economy
    // ========================

    /// Spends one stat point on `attribute`. Returns false (no mutation) when
    /// no point is available. Attribute ceilings are the caller's policy.
    pub fn spend_stat_point(&mut self, attribute: Attribute) -> bool {
        if self.available_stat_points() <= 0 {
            return false;
        }
        self.spend_history.push(attribute.id().to_string());
        let score = self.score_mut(attribute);
        *score = score.saturating_add(1).max(1);
        true
    }

    /// Same as `spend_stat_point` for a raw identifier; unknown ids fail.
    pub fn spend_stat_point_by_id(&mut self, attribute_id: &str) -> bool {
        match Attribute::from_id(attribute_id) {
            Some(attribute) => self.spend_stat_point(attribute),
            None => false,
        }
    }

    /// Rolls back the most recent allocation.
    ///
    /// Returns `None` on empty history. A retired id on top of the stack is
    /// discarded without touching any score and also yields `None`.
    pub fn undo_last_stat_point(&mut self) -> Option<Attribute> {
        let id = self.spend_history.pop()?;
        let attribute = Attribute::from_id(&id)?;
        let score = self.score_mut(attribute);
        *score = (*score - 1).max(1);
        Some(attribute)
    }

    /// Administrative override. Not recorded in the spend history.
    pub fn set_attribute(&mut self, attribute: Attribute, value: i32) {
        *self.score_mut(attribute) = value.max(1);
    }

    pub fn reset_to_defaults(&mut self, config: &ProgressionConfig) -> ResyncReport {
        let previous_level = self.level;
        *self = Self::new(config);
        let mut report = self.resync(config);
        report.previous_level = previous_level;
        report
    }

    // ========================
    // Accessors
    // ========================

    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn total_xp(&self) -> i64 {
        self.total_xp
    }

    pub fn xp_into_level(&self, config: &ProgressionConfig) -> i64 {
        self.total_xp - config.level_curve().total_xp_for(self.level)
    }

    pub fn xp_to_next_level(&self, config: &ProgressionConfig) -> i64 {
        let curve = config.level_curve();
        if self.level >= curve.max_level() {
            return 0;
        }
        (curve.xp_to_next(self.level) - self.xp_into_level(config)).max(0)
    }

    pub fn earned_stat_points(&self) -> i32 {
        (self.level - 1).max(0)
    }

    pub fn available_stat_points(&self) -> i32 {
        let spent = i32::try_from(self.spend_history.len()).unwrap_or(i32::MAX);
        (self.earned_stat_points() - spent).max(0)
    }

    pub fn spend_history(&self) -> &[String] {
        &self.spend_history
    }

    pub fn attribute(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intellect => self.intellect,
            Attribute::Endurance => self.endurance,
            Attribute::Charisma => self.charisma,
        }
    }

    pub fn attributes(&self) -> BTreeMap<Attribute, i32> {
        Attribute::ALL.into_iter().map(|a| (a, self.attribute(a))).collect()
    }

    pub fn snapshot(&self, config: &ProgressionConfig) -> ProgressionSnapshot {
        ProgressionSnapshot {
            schema_version: self.schema_version,
            level: self.level,
            max_level: config.level_curve().max_level(),
            total_xp: self.total_xp,
            xp_into_level: self.xp_into_level(config),
            xp_to_next_level: self.xp_to_next_level(config),
            earned_stat_points: self.earned_stat_points(),
            available_stat_points: self.available_stat_points(),
            attributes: self.attributes(),
            ability_levels: self.ability_levels.clone(),
            available_ability_points: self.available_ability_points(config),
        }
    }

    pub(crate) fn score_mut(&mut self, attribute: Attribute) -> &mut i32 {
        match attribute {
            Attribute::Strength => &mut self.strength,
            Attribute::Dexterity => &mut self.dexterity,
            Attribute::Constitution => &mut self.constitution,
            Attribute::Intellect => &mut self.intellect,
            Attribute::Endurance => &mut self.endurance,
            Attribute::Charisma => &mut self.charisma,
        }
    }
}
