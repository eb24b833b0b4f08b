//! # progression_core - Deterministic Progression Ledger
//!
//! Per-actor experience, level, attribute and ability bookkeeping with
//! versioned persistence.
//!
//! ## Features
//! - Level always derived from total XP via a configurable quadratic curve
//! - Stat points with LIFO rollback when levels are lost
//! - Ability point economy reconciled on every resync
//! - Record migration from any older schema on load
//! - JSON API for command handlers and kill-event hooks

pub mod api;
pub mod config;
pub mod progression;
pub mod save;

// Re-export main API functions
pub use api::{
    apply_command, execute_ledger_command_json, ledger_snapshot_json, LedgerCommand,
    LedgerCommandRequest, LedgerCommandResponse,
};
pub use config::{ConfigError, ProgressionConfig};

// Re-export progression types
pub use progression::{
    experience_award, Attribute, EqualShareDistributor, LevelCurve, PartyDistributor,
    PartyMember, ProgressionLedger, ProgressionSnapshot, ResyncReport, Share,
};

// Re-export save system
pub use save::{MigrationOutcome, RecordStore, SaveError, CURRENT_SCHEMA_VERSION};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_to_party_to_ledger_flow() {
        let cfg = ProgressionConfig::default();
        let distributor = EqualShareDistributor::default();

        let award = experience_award(300.0, &cfg);
        let members = vec![
            PartyMember { actor_id: "a".into(), level: 1 },
            PartyMember { actor_id: "b".into(), level: 1 },
        ];
        let shares = distributor.distribute(award, &members);
        assert_eq!(shares.len(), 2);

        let mut ledger = ProgressionLedger::new(&cfg);
        let report = ledger.grant_xp(&cfg, shares[0].xp);
        assert_eq!(ledger.total_xp(), shares[0].xp);
        assert_eq!(report.level, ledger.level());
        assert_eq!(ledger.schema_version(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
