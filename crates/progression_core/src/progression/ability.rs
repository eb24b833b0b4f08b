//! Ability Economy
//!
//! Per-ability levels drawing from one shared ability-point pool.
//!
//! - earned = (level - 1) × `ability_points_per_level`
//! - spent  = Σ cost of every level already bought, under the current config
//! - cost(l) = `base_cost + cost_step·l`, `None` at max level
//!
//! `ability_history` records upgrades most-recent-last so overspending (level
//! loss, a pricier cost curve) is undone in LIFO order.

use std::collections::BTreeMap;

use super::ledger::ProgressionLedger;
use crate::config::{AbilitySpec, ProgressionConfig};

impl AbilitySpec {
    /// Points needed to go from `current_level` to the next one.
    pub fn cost(&self, current_level: i32) -> Option<u32> {
        if current_level >= self.max_level {
            return None;
        }
        let level = u32::try_from(current_level.max(0)).unwrap_or(0);
        Some(self.base_cost.saturating_add(self.cost_step.saturating_mul(level)))
    }

    /// Total points invested to reach `level`.
    pub fn total_cost(&self, level: i32) -> i64 {
        (0..level.min(self.max_level)).filter_map(|l| self.cost(l)).map(i64::from).sum()
    }
}

impl ProgressionLedger {
    pub fn ability_levels(&self) -> &BTreeMap<String, i32> {
        &self.ability_levels
    }

    pub fn ability_history(&self) -> &[String] {
        &self.ability_history
    }

    pub fn ability_level(&self, ability_id: &str) -> i32 {
        self.ability_levels.get(ability_id).copied().unwrap_or(0)
    }

    pub fn earned_ability_points(&self, config: &ProgressionConfig) -> i64 {
        i64::from(self.earned_stat_points()) * i64::from(config.ability_points_per_level.max(0))
    }

    pub fn spent_ability_points(&self, config: &ProgressionConfig) -> i64 {
        self.ability_levels
            .iter()
            .filter_map(|(id, level)| config.ability(id).map(|spec| spec.total_cost(*level)))
            .sum()
    }

    pub fn available_ability_points(&self, config: &ProgressionConfig) -> i64 {
        (self.earned_ability_points(config) - self.spent_ability_points(config)).max(0)
    }

    /// Cost of the next upgrade, `None` for unknown or maxed abilities.
    pub fn next_upgrade_cost(&self, config: &ProgressionConfig, ability_id: &str) -> Option<u32> {
        config.ability(ability_id)?.cost(self.ability_level(ability_id))
    }

    /// Buys one level of `ability_id`. Fails without mutation on unknown
    /// ability, max level, or insufficient points.
    pub fn upgrade_ability(&mut self, config: &ProgressionConfig, ability_id: &str) -> bool {
        let Some(cost) = self.next_upgrade_cost(config, ability_id) else {
            return false;
        };
        if self.available_ability_points(config) < i64::from(cost) {
            return false;
        }

        *self.ability_levels.entry(ability_id.to_string()).or_insert(0) += 1;
        self.ability_history.push(ability_id.to_string());
        true
    }
}

/// Restores ability invariants after a level or config change.
///
/// Returns the rolled back ability ids, most recent first.
pub(crate) fn reconcile_abilities(
    ledger: &mut ProgressionLedger,
    config: &ProgressionConfig,
) -> Vec<String> {
    normalize_abilities(ledger, config);

    let earned = ledger.earned_ability_points(config);
    let mut spent = ledger.spent_ability_points(config);
    let mut refunded = Vec::new();

    while spent > earned {
        let Some(id) = ledger.ability_history.pop() else {
            break;
        };
        let Some(level) = ledger.ability_levels.get_mut(&id) else {
            continue;
        };
        *level -= 1;
        let new_level = *level;
        if new_level <= 0 {
            ledger.ability_levels.remove(&id);
        }
        if let Some(cost) = config.ability(&id).and_then(|spec| spec.cost(new_level)) {
            spent -= i64::from(cost);
        }
        refunded.push(id);
    }

    if !refunded.is_empty() {
        log::debug!("Rolled back {} ability upgrades", refunded.len());
    }
    refunded
}

/// Drops abilities missing from the config, clamps levels to their max and
/// makes the history hold exactly one entry per owned level.
///
/// Entries beyond an ability's level are trimmed from the newest end; levels
/// without history (older records) are prepended as the oldest purchases.
fn normalize_abilities(ledger: &mut ProgressionLedger, config: &ProgressionConfig) {
    ledger.ability_levels.retain(|id, level| match config.ability(id) {
        Some(spec) => {
            *level = (*level).min(spec.max_level);
            *level > 0
        }
        None => {
            log::warn!("Dropped ability '{}' missing from config", id);
            false
        }
    });

    let mut seen: BTreeMap<&str, i32> = BTreeMap::new();
    let mut kept = Vec::with_capacity(ledger.ability_history.len());
    for id in &ledger.ability_history {
        let owned = ledger.ability_levels.get(id).copied().unwrap_or(0);
        let count = seen.entry(id.as_str()).or_insert(0);
        if *count < owned {
            *count += 1;
            kept.push(id.clone());
        }
    }

    let mut missing = Vec::new();
    for (id, level) in &ledger.ability_levels {
        let recorded = seen.get(id.as_str()).copied().unwrap_or(0);
        for _ in recorded..*level {
            missing.push(id.clone());
        }
    }

    if !missing.is_empty() || kept.len() != ledger.ability_history.len() {
        missing.extend(kept);
        ledger.ability_history = missing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    #[test]
    fn test_cost_curve_non_decreasing() {
        let spec = AbilitySpec { max_level: 5, base_cost: 1, cost_step: 1 };
        let costs: Vec<Option<u32>> = (0..=5).map(|l| spec.cost(l)).collect();
        assert_eq!(costs, vec![Some(1), Some(2), Some(3), Some(4), Some(5), None]);
        assert_eq!(spec.total_cost(3), 6);
        assert_eq!(spec.total_cost(9), 15);
        assert_eq!(spec.total_cost(0), 0);
    }

    #[test]
    fn test_flat_cost_curve() {
        let spec = AbilitySpec { max_level: 1, base_cost: 3, cost_step: 0 };
        assert_eq!(spec.cost(0), Some(3));
        assert_eq!(spec.cost(1), None);
    }

    #[test]
    fn test_upgrade_debits_pool() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 4);
        assert_eq!(ledger.available_ability_points(&cfg), 3);

        assert!(ledger.upgrade_ability(&cfg, "power_strike"));
        assert!(ledger.upgrade_ability(&cfg, "power_strike"));
        assert_eq!(ledger.ability_level("power_strike"), 2);
        assert_eq!(ledger.available_ability_points(&cfg), 0);
        assert!(!ledger.upgrade_ability(&cfg, "iron_skin"));
        assert_eq!(ledger.ability_history(), &["power_strike", "power_strike"]);
    }

    #[test]
    fn test_upgrade_refuses_unknown_and_maxed() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 25);

        assert!(!ledger.upgrade_ability(&cfg, "fireball"));
        assert!(ledger.upgrade_ability(&cfg, "second_wind"));
        assert!(!ledger.upgrade_ability(&cfg, "second_wind"));
        assert_eq!(ledger.next_upgrade_cost(&cfg, "second_wind"), None);
        assert_eq!(ledger.ability_level("second_wind"), 1);
    }

    #[test]
    fn test_stat_and_ability_points_are_separate() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 2);

        assert!(ledger.upgrade_ability(&cfg, "iron_skin"));
        assert_eq!(ledger.available_stat_points(), 1);
        assert!(ledger.spend_stat_point(crate::progression::Attribute::Strength));
        assert_eq!(ledger.available_ability_points(&cfg), 0);
    }

    #[test]
    fn test_level_loss_rolls_back_abilities_lifo() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 6);

        assert!(ledger.upgrade_ability(&cfg, "iron_skin")); // 1
        assert!(ledger.upgrade_ability(&cfg, "swift_step")); // 2
        assert!(ledger.upgrade_ability(&cfg, "iron_skin")); // 2
        assert_eq!(ledger.available_ability_points(&cfg), 0);

        // 2 points earned: iron_skin(2) then swift_step(2) must go
        let report = ledger.set_level(&cfg, 3);
        assert_eq!(report.refunded_abilities, vec!["iron_skin", "swift_step"]);
        assert_eq!(ledger.ability_level("iron_skin"), 1);
        assert_eq!(ledger.ability_level("swift_step"), 0);
        assert!(!ledger.ability_levels().contains_key("swift_step"));
        assert_eq!(ledger.available_ability_points(&cfg), 1);
    }

    #[test]
    fn test_pricier_config_reconciles() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 3);
        assert!(ledger.upgrade_ability(&cfg, "power_strike"));

        let mut pricey = cfg.clone();
        if let Some(spec) = pricey.abilities.get_mut("power_strike") {
            spec.base_cost = 5;
        }
        let report = ledger.resync(&pricey);
        assert_eq!(report.refunded_abilities, vec!["power_strike"]);
        assert_eq!(ledger.ability_level("power_strike"), 0);
    }

    #[test]
    fn test_removed_ability_is_dropped() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 3);
        assert!(ledger.upgrade_ability(&cfg, "swift_step"));

        let mut trimmed = cfg.clone();
        trimmed.abilities.remove("swift_step");
        ledger.resync(&trimmed);

        assert!(ledger.ability_levels().is_empty());
        assert!(ledger.ability_history().is_empty());
        assert_eq!(ledger.available_ability_points(&trimmed), 2);
    }

    #[test]
    fn test_levels_without_history_are_backfilled() {
        let cfg = config();
        let mut ledger = ProgressionLedger::new(&cfg);
        ledger.set_level(&cfg, 10);
        ledger.ability_levels.insert("iron_skin".to_string(), 2);
        ledger.ability_levels.insert("power_strike".to_string(), 1);
        ledger.ability_history = vec!["power_strike".to_string()];

        ledger.resync(&cfg);
        assert_eq!(ledger.ability_history(), &["iron_skin", "iron_skin", "power_strike"]);

        // 1 point left after losing levels: newest purchases go first
        let report = ledger.set_level(&cfg, 2);
        assert_eq!(report.refunded_abilities, vec!["power_strike", "iron_skin"]);
        assert_eq!(ledger.ability_level("iron_skin"), 1);
    }
}
