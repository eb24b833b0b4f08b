//! JSON API for ledger operations
//!
//! Command handlers, stats pages and kill-event hooks talk to the ledger
//! through these envelopes. Policy failures come back as `success: false`
//! with an error code; nothing here panics on bad input.

use crate::config::ProgressionConfig;
use crate::progression::{
    experience_award, Attribute, ProgressionLedger, ProgressionSnapshot, ResyncReport,
};
use crate::save::{validate_record, MigrationOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// API version for schema compatibility
pub const API_VERSION: &str = "v1";

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// One ledger operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerCommand {
    GrantXp { amount: i64 },
    SetTotalXp { value: i64 },
    SetLevel { level: i32 },
    SetAttribute { attribute: String, value: i32 },
    SpendStatPoint { attribute: String },
    UndoStatPoint,
    UpgradeAbility { ability: String },
    ResetToDefaults,
    Migrate,
    /// Grant the award for defeating an opponent with this max health
    AwardKill { max_health: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerCommandRequest {
    pub schema_version: Option<String>,
    /// Missing record means a first-time actor
    pub record: Option<ProgressionLedger>,
    pub command: LedgerCommand,
}

/// What a command did besides mutating the record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEffect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ResyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_xp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ability_level: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerCommandResponse {
    pub record: ProgressionLedger,
    pub snapshot: ProgressionSnapshot,
    pub effect: CommandEffect,
}

impl ApiError {
    pub fn new(code: &str, message: &str) -> Self {
        Self { code: code.to_string(), message: message.to_string() }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn parse_attribute(id: &str) -> Result<Attribute, ApiError> {
    Attribute::from_id(id)
        .ok_or_else(|| ApiError::new("UNKNOWN_ATTRIBUTE", &format!("Unknown attribute: {}", id)))
}

/// Apply one command to an already migrated record.
///
/// On error the record is unchanged.
pub fn apply_command(
    ledger: &mut ProgressionLedger,
    config: &ProgressionConfig,
    command: &LedgerCommand,
) -> Result<CommandEffect, ApiError> {
    let mut effect = CommandEffect::default();

    match command {
        LedgerCommand::GrantXp { amount } => {
            effect.report = Some(ledger.grant_xp(config, *amount));
        }
        LedgerCommand::SetTotalXp { value } => {
            effect.report = Some(ledger.set_total_xp(config, *value));
        }
        LedgerCommand::SetLevel { level } => {
            effect.report = Some(ledger.set_level(config, *level));
        }
        LedgerCommand::SetAttribute { attribute, value } => {
            let attribute = parse_attribute(attribute)?;
            ledger.set_attribute(attribute, *value);
            effect.attribute = Some(attribute);
        }
        LedgerCommand::SpendStatPoint { attribute } => {
            let attribute = parse_attribute(attribute)?;
            if !ledger.spend_stat_point(attribute) {
                return Err(ApiError::new("NO_STAT_POINTS", "No stat points available"));
            }
            effect.attribute = Some(attribute);
        }
        LedgerCommand::UndoStatPoint => {
            if ledger.spend_history().is_empty() {
                return Err(ApiError::new("NOTHING_TO_UNDO", "Spend history is empty"));
            }
            effect.attribute = ledger.undo_last_stat_point();
        }
        LedgerCommand::UpgradeAbility { ability } => {
            if config.ability(ability).is_none() {
                return Err(ApiError::new(
                    "UNKNOWN_ABILITY",
                    &format!("Unknown ability: {}", ability),
                ));
            }
            if !ledger.upgrade_ability(config, ability) {
                let message = match ledger.next_upgrade_cost(config, ability) {
                    None => format!("{} is already at max level", ability),
                    Some(cost) => format!(
                        "{} needs {} ability points, {} available",
                        ability,
                        cost,
                        ledger.available_ability_points(config)
                    ),
                };
                return Err(ApiError::new("ABILITY_UPGRADE_REFUSED", &message));
            }
            effect.ability_level = Some(ledger.ability_level(ability));
        }
        LedgerCommand::ResetToDefaults => {
            effect.report = Some(ledger.reset_to_defaults(config));
        }
        LedgerCommand::Migrate => {
            effect.migration = Some(ledger.migrate_if_needed(config));
        }
        LedgerCommand::AwardKill { max_health } => {
            let xp = experience_award(*max_health, config);
            effect.awarded_xp = Some(xp);
            effect.report = Some(ledger.grant_xp(config, xp));
        }
    }

    Ok(effect)
}

/// Execute a ledger command from a JSON request string
///
/// # Arguments
/// * `request_json` - JSON string containing LedgerCommandRequest
/// * `config` - Current progression config
///
/// # Returns
/// JSON string containing ApiResponse<LedgerCommandResponse>
pub fn execute_ledger_command_json(request_json: &str, config: &ProgressionConfig) -> String {
    debug!("Processing ledger command request");

    let request: LedgerCommandRequest = match serde_json::from_str(request_json) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse LedgerCommandRequest: {}", e);
            let error = ApiError::new("INVALID_JSON", &format!("Invalid JSON format: {}", e));
            return to_response_json::<LedgerCommandResponse>(ApiResponse::error(error));
        }
    };

    let mut ledger = request.record.unwrap_or_else(|| ProgressionLedger::new(config));
    let load_outcome = match prepare_record(&mut ledger, config) {
        Ok(outcome) => outcome,
        Err(error) => return to_response_json::<LedgerCommandResponse>(ApiResponse::error(error)),
    };

    match apply_command(&mut ledger, config, &request.command) {
        Ok(mut effect) => {
            if matches!(request.command, LedgerCommand::Migrate) {
                effect.migration = Some(load_outcome);
            }
            info!("Applied {:?} (level {})", request.command, ledger.level());
            let snapshot = ledger.snapshot(config);
            let response = LedgerCommandResponse { record: ledger, snapshot, effect };
            to_response_json(ApiResponse::success(response))
        }
        Err(error) => {
            warn!("Ledger command refused: {} ({})", error.code, error.message);
            to_response_json::<LedgerCommandResponse>(ApiResponse::error(error))
        }
    }
}

/// Read-only view of a record for stats pages
///
/// # Returns
/// JSON string containing ApiResponse<ProgressionSnapshot>
pub fn ledger_snapshot_json(record_json: &str, config: &ProgressionConfig) -> String {
    let mut ledger: ProgressionLedger = match serde_json::from_str(record_json) {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to parse record: {}", e);
            let error = ApiError::new("INVALID_RECORD", &format!("Invalid record: {}", e));
            return to_response_json::<ProgressionSnapshot>(ApiResponse::error(error));
        }
    };
    if let Err(error) = prepare_record(&mut ledger, config) {
        return to_response_json::<ProgressionSnapshot>(ApiResponse::error(error));
    }
    to_response_json(ApiResponse::success(ledger.snapshot(config)))
}

/// Load step for caller-supplied records: structural checks, migration, then
/// a resync so a stored level never outranks the stored XP.
fn prepare_record(
    ledger: &mut ProgressionLedger,
    config: &ProgressionConfig,
) -> Result<MigrationOutcome, ApiError> {
    if let Err(e) = validate_record(ledger) {
        warn!("Rejected record: {}", e);
        return Err(ApiError::new("INVALID_RECORD", &format!("Invalid record: {}", e)));
    }

    // Migration runs once per load, before the command
    let outcome = ledger.migrate_if_needed(config);
    if let MigrationOutcome::FutureVersion { found } = outcome {
        warn!("Refusing to use record from future schema {}", found);
        return Err(ApiError::new(
            "FUTURE_SCHEMA",
            &format!("Record schema {} is newer than this build", found),
        ));
    }

    ledger.resync(config);
    Ok(outcome)
}

fn to_response_json<T: Serialize>(response: ApiResponse<T>) -> String {
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}
