use crate::config::ProgressionConfig;
use crate::progression::{Attribute, ProgressionLedger};
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: i32 = 4;

/// Attribute id used for intellect before schema 4
pub const RETIRED_INTELLECT_ID: &str = "int";

type StepFn = fn(&mut ProgressionLedger, &ProgressionConfig);

/// One schema upgrade. Applies when `schema_version <= from`.
pub struct MigrationStep {
    pub from: i32,
    pub to: i32,
    pub description: &'static str,
    apply: StepFn,
}

pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        from: 0,
        to: 1,
        description: "Mark records that predate any schema",
        apply: mark_initial_schema,
    },
    MigrationStep {
        from: 1,
        to: 2,
        description: "Recompute level from stored experience",
        apply: recompute_level,
    },
    MigrationStep {
        from: 2,
        to: 3,
        description: "Reset incompatible stat spend history",
        apply: clear_spend_history,
    },
    MigrationStep {
        from: 3,
        to: 4,
        description: "Rename retired intellect identifier",
        apply: rename_retired_intellect,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    UpToDate,
    Migrated { from: i32, to: i32 },
    /// Written by a newer build; left untouched
    FutureVersion { found: i32 },
}

impl ProgressionLedger {
    /// Upgrades a freshly loaded record to the current schema.
    ///
    /// Every step is gated on the stored version, so a second call is a no-op.
    pub fn migrate_if_needed(&mut self, config: &ProgressionConfig) -> MigrationOutcome {
        migrate_ledger(self, config)
    }
}

pub fn migrate_ledger(ledger: &mut ProgressionLedger, config: &ProgressionConfig) -> MigrationOutcome {
    let original_version = ledger.schema_version;

    if original_version > CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Loading record from future schema {} (current: {})",
            original_version,
            CURRENT_SCHEMA_VERSION
        );
        return MigrationOutcome::FutureVersion { found: original_version };
    }
    if original_version == CURRENT_SCHEMA_VERSION {
        return MigrationOutcome::UpToDate;
    }

    for step in MIGRATIONS {
        if ledger.schema_version <= step.from {
            log::info!("Migrating record from schema {} to {}: {}", step.from, step.to, step.description);
            (step.apply)(ledger, config);
            ledger.schema_version = step.to;
        }
    }

    log::info!("Migrated record from schema {} to {}", original_version, ledger.schema_version);
    MigrationOutcome::Migrated { from: original_version, to: ledger.schema_version }
}

pub fn needs_migration(ledger: &ProgressionLedger) -> bool {
    ledger.schema_version < CURRENT_SCHEMA_VERSION
}

/// Migration summary for UI display
pub fn migration_description(from_version: i32, to_version: i32) -> String {
    let steps: Vec<&str> = MIGRATIONS
        .iter()
        .filter(|s| s.from >= from_version && s.to <= to_version)
        .map(|s| s.description)
        .collect();

    if steps.is_empty() {
        format!("Updating record format from version {} to {}", from_version, to_version)
    } else {
        steps.join("; ")
    }
}

fn mark_initial_schema(_ledger: &mut ProgressionLedger, _config: &ProgressionConfig) {}

fn recompute_level(ledger: &mut ProgressionLedger, config: &ProgressionConfig) {
    ledger.resync(config);
}

/// One-time amnesty: spent points become available again, scores stay.
fn clear_spend_history(ledger: &mut ProgressionLedger, config: &ProgressionConfig) {
    let cleared = ledger.spend_history.len();
    ledger.spend_history.clear();
    ledger.resync(config);
    if cleared > 0 {
        log::info!("Refunded {} stat points from incompatible history", cleared);
    }
}

fn rename_retired_intellect(ledger: &mut ProgressionLedger, config: &ProgressionConfig) {
    let mut renamed = 0;
    for entry in ledger.spend_history.iter_mut() {
        if entry == RETIRED_INTELLECT_ID {
            *entry = Attribute::Intellect.id().to_string();
            renamed += 1;
        }
    }
    let score = ledger.score_mut(Attribute::Intellect);
    *score = score.saturating_add(renamed);
    ledger.resync(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    fn legacy_record(version: i32) -> ProgressionLedger {
        let mut record = ProgressionLedger::new(&config());
        record.schema_version = version;
        record
    }

    #[test]
    fn test_table_is_contiguous() {
        for (i, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.from, i as i32);
            assert_eq!(step.to, step.from + 1);
        }
        assert_eq!(MIGRATIONS.last().map(|s| s.to), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_no_migration_needed() {
        let cfg = config();
        let mut record = ProgressionLedger::new(&cfg);
        let before = record.clone();
        assert_eq!(record.migrate_if_needed(&cfg), MigrationOutcome::UpToDate);
        assert_eq!(record, before);
        assert!(!needs_migration(&record));
    }

    #[test]
    fn test_v1_recomputes_stale_level() {
        let cfg = config();
        let mut record = legacy_record(1);
        record.total_xp = 300;
        record.level = 9;
        record.spend_history = vec!["str".into(), "str".into(), "dex".into()];
        record.strength = 12;
        record.dexterity = 11;

        let outcome = record.migrate_if_needed(&cfg);

        assert_eq!(outcome, MigrationOutcome::Migrated { from: 1, to: 4 });
        assert_eq!(record.level(), 3);
        // v<3 clears history; scores are kept
        assert!(record.spend_history().is_empty());
        assert_eq!(record.attribute(Attribute::Strength), 12);
        assert_eq!(record.available_stat_points(), 2);
    }

    #[test]
    fn test_v2_history_amnesty() {
        let cfg = config();
        let mut record = legacy_record(2);
        record.set_level(&cfg, 3);
        record.spend_stat_point(Attribute::Endurance);
        record.spend_stat_point(Attribute::Endurance);
        record.schema_version = 2;

        record.migrate_if_needed(&cfg);

        assert!(record.spend_history().is_empty());
        assert_eq!(record.attribute(Attribute::Endurance), 12);
        assert_eq!(record.available_stat_points(), 2);
    }

    #[test]
    fn test_v3_renames_retired_intellect() {
        let cfg = config();
        let mut record = legacy_record(3);
        record.set_level(&cfg, 5);
        record.spend_history = vec!["str".into(), "int".into(), "int".into()];
        record.schema_version = 3;

        let outcome = record.migrate_if_needed(&cfg);

        assert_eq!(outcome, MigrationOutcome::Migrated { from: 3, to: 4 });
        assert_eq!(record.spend_history(), &["str", "intl", "intl"]);
        assert_eq!(record.attribute(Attribute::Intellect), 12);
        assert_eq!(record.schema_version(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_rename_then_rollback_keeps_totals_consistent() {
        let cfg = config();
        let mut record = legacy_record(3);
        record.set_total_xp(&cfg, 100);
        record.spend_history = vec!["int".into(), "int".into()];
        record.schema_version = 3;

        record.migrate_if_needed(&cfg);

        // Only one point earned at level 2: one renamed entry is rolled back
        assert_eq!(record.spend_history(), &["intl"]);
        assert_eq!(record.attribute(Attribute::Intellect), 11);
    }

    #[test]
    fn test_pre_schema_record() {
        let cfg = config();
        let mut record = legacy_record(0);
        record.total_xp = 100;
        record.level = 1;

        let outcome = record.migrate_if_needed(&cfg);
        assert_eq!(outcome, MigrationOutcome::Migrated { from: 0, to: 4 });
        assert_eq!(record.level(), 2);

        let mut negative = legacy_record(-3);
        negative.migrate_if_needed(&cfg);
        assert_eq!(negative.schema_version(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let cfg = config();
        let mut record = legacy_record(3);
        record.set_level(&cfg, 4);
        record.spend_history = vec!["int".into()];
        record.schema_version = 3;

        record.migrate_if_needed(&cfg);
        let once = record.clone();
        assert_eq!(record.migrate_if_needed(&cfg), MigrationOutcome::UpToDate);
        assert_eq!(record, once);
    }

    #[test]
    fn test_future_version_untouched() {
        let cfg = config();
        let mut record = legacy_record(99);
        record.level = 7;
        let before = record.clone();

        assert_eq!(record.migrate_if_needed(&cfg), MigrationOutcome::FutureVersion { found: 99 });
        assert_eq!(record, before);
    }

    #[test]
    fn test_migration_description() {
        assert_eq!(migration_description(3, 4), "Rename retired intellect identifier");
        assert!(migration_description(1, 4).contains("Recompute level"));
        assert_eq!(
            migration_description(7, 9),
            "Updating record format from version 7 to 9"
        );
    }
}
