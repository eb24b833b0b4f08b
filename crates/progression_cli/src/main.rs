//! Progression CLI
//!
//! 저장된 progression record 관리 도구
//! (admin XP/level 보정, 스탯 포인트, 능력 업그레이드, 마이그레이션)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use progression_core::api::{apply_command, CommandEffect, LedgerCommand};
use progression_core::{
    experience_award, EqualShareDistributor, MigrationOutcome, PartyDistributor, PartyMember,
    ProgressionConfig, ProgressionLedger, RecordStore,
};

#[derive(Parser)]
#[command(name = "progression")]
#[command(about = "Inspect and edit progression records", long_about = None)]
struct Cli {
    /// Directory holding <actor>.dat records
    #[arg(long, global = true, default_value = "saves")]
    store: PathBuf,

    /// Progression config YAML (embedded defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of a summary
    #[arg(long, global = true, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh record
    New {
        #[arg(long)]
        actor: String,
    },

    /// Show a record (migrated in memory, not saved)
    Show {
        #[arg(long)]
        actor: String,
    },

    /// List actors with a saved record
    List,

    /// Add (or with a negative amount, remove) experience
    Grant {
        #[arg(long)]
        actor: String,

        #[arg(long, allow_hyphen_values = true)]
        amount: i64,
    },

    /// Set total experience
    SetXp {
        #[arg(long)]
        actor: String,

        #[arg(long, allow_hyphen_values = true)]
        value: i64,
    },

    /// Set level (total experience becomes the level threshold)
    SetLevel {
        #[arg(long)]
        actor: String,

        #[arg(long, allow_hyphen_values = true)]
        level: i32,
    },

    /// Set an attribute score directly
    SetAttr {
        #[arg(long)]
        actor: String,

        /// Attribute id or name (str, dex, con, intl, end, cha)
        #[arg(long)]
        attribute: String,

        #[arg(long, allow_hyphen_values = true)]
        value: i32,
    },

    /// Spend one stat point
    Spend {
        #[arg(long)]
        actor: String,

        #[arg(long)]
        attribute: String,
    },

    /// Undo the most recent stat point
    Undo {
        #[arg(long)]
        actor: String,
    },

    /// Buy one level of an ability
    Upgrade {
        #[arg(long)]
        actor: String,

        #[arg(long)]
        ability: String,
    },

    /// Reset to a fresh record: experience, attributes, both histories and
    /// ability levels are all cleared
    Reset {
        #[arg(long)]
        actor: String,
    },

    /// Migrate a record to the current schema and save it
    Migrate {
        #[arg(long)]
        actor: String,
    },

    /// Award kill experience, split across one or more actors
    Award {
        /// Max health of the defeated opponent
        #[arg(long)]
        max_health: f64,

        /// Recipient (repeat for a party)
        #[arg(long = "actor", required = true)]
        actors: Vec<String>,
    },

    /// Print the JSON schema of the persisted record
    Schema,
}

impl Commands {
    /// Commands that map one-to-one onto a ledger operation
    fn ledger_command(&self) -> Option<(&str, LedgerCommand)> {
        let mapped = match self {
            Commands::Grant { actor, amount } => (actor, LedgerCommand::GrantXp { amount: *amount }),
            Commands::SetXp { actor, value } => (actor, LedgerCommand::SetTotalXp { value: *value }),
            Commands::SetLevel { actor, level } => (actor, LedgerCommand::SetLevel { level: *level }),
            Commands::SetAttr { actor, attribute, value } => (
                actor,
                LedgerCommand::SetAttribute { attribute: attribute.clone(), value: *value },
            ),
            Commands::Spend { actor, attribute } => {
                (actor, LedgerCommand::SpendStatPoint { attribute: attribute.clone() })
            }
            Commands::Undo { actor } => (actor, LedgerCommand::UndoStatPoint),
            Commands::Upgrade { actor, ability } => {
                (actor, LedgerCommand::UpgradeAbility { ability: ability.clone() })
            }
            Commands::Reset { actor } => (actor, LedgerCommand::ResetToDefaults),
            Commands::Migrate { actor } => (actor, LedgerCommand::Migrate),
            _ => return None,
        };
        Some((mapped.0.as_str(), mapped.1))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let store = RecordStore::new(&cli.store);
    debug!("Using record store {}", store.root().display());

    match &cli.command {
        Commands::New { actor } => {
            let record = store.create(actor, &config)?;
            info!("Created record for {}", actor);
            print_record(actor, &record, &config, None, cli.json)?;
        }

        Commands::Show { actor } => {
            let (record, outcome) = store.load(actor, &config)?;
            print_record(actor, &record, &config, Some(outcome), cli.json)?;
        }

        Commands::List => {
            let actors = store.list_actors()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&actors)?);
            } else if actors.is_empty() {
                println!("No records in {}", store.root().display());
            } else {
                for actor in actors {
                    println!("{}", actor);
                }
            }
        }

        Commands::Award { max_health, actors } => {
            run_award(&store, &config, *max_health, actors, cli.json)?;
        }

        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&ProgressionLedger::json_schema())?);
        }

        other => {
            if let Some((actor, command)) = other.ledger_command() {
                run_ledger_command(&store, &config, actor, command, cli.json)?;
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<ProgressionConfig> {
    match path {
        Some(path) => ProgressionConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ProgressionConfig::default()),
    }
}

fn run_ledger_command(
    store: &RecordStore,
    config: &ProgressionConfig,
    actor: &str,
    command: LedgerCommand,
    json: bool,
) -> Result<()> {
    let (mut record, outcome) = store.load_or_create(actor, config)?;
    if let MigrationOutcome::FutureVersion { found } = outcome {
        bail!("record for {} uses schema {} from a newer build; refusing to modify it", actor, found);
    }

    let mut effect = match apply_command(&mut record, config, &command) {
        Ok(effect) => effect,
        Err(err) => bail!("{}: {}", err.code, err.message),
    };
    if matches!(command, LedgerCommand::Migrate) {
        effect.migration = Some(outcome);
    }

    store.save(actor, &record)?;
    info!("Applied {:?} to {}", command, actor);

    if json {
        let output = serde_json::json!({
            "actor": actor,
            "record": record,
            "snapshot": record.snapshot(config),
            "effect": effect,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_effect(&effect);
        print_record(actor, &record, config, None, false)?;
    }
    Ok(())
}

fn run_award(
    store: &RecordStore,
    config: &ProgressionConfig,
    max_health: f64,
    actors: &[String],
    json: bool,
) -> Result<()> {
    let award = experience_award(max_health, config);

    // One share per actor, however often it was named
    let mut seen = BTreeSet::new();
    let actors: Vec<&String> = actors.iter().filter(|actor| seen.insert(*actor)).collect();

    let mut records = Vec::with_capacity(actors.len());
    for actor in &actors {
        let (record, outcome) = store.load_or_create(actor, config)?;
        if let MigrationOutcome::FutureVersion { found } = outcome {
            bail!("record for {} uses schema {} from a newer build", actor, found);
        }
        records.push(record);
    }

    let members: Vec<PartyMember> = actors
        .iter()
        .zip(&records)
        .map(|(actor, record)| PartyMember { actor_id: actor.to_string(), level: record.level() })
        .collect();
    let shares = EqualShareDistributor::default().distribute(award, &members);

    let mut results = Vec::with_capacity(shares.len());
    for (share, mut record) in shares.into_iter().zip(records) {
        let report = record.grant_xp(config, share.xp);
        store.save(&share.actor_id, &record)?;
        results.push((share, report));
    }

    if json {
        let output: Vec<_> = results
            .iter()
            .map(|(share, report)| serde_json::json!({ "share": share, "report": report }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "award": award, "shares": output }))?
        );
    } else {
        println!("Award: {} XP", award);
        for (share, report) in &results {
            let suffix = if report.leveled_up() {
                format!(" (level {} → {})", report.previous_level, report.level)
            } else {
                String::new()
            };
            println!("   {:<16} +{} XP{}", share.actor_id, share.xp, suffix);
        }
    }
    Ok(())
}

fn print_effect(effect: &CommandEffect) {
    if let Some(report) = &effect.report {
        if report.previous_level != report.level {
            println!("Level {} → {}", report.previous_level, report.level);
        }
        for attribute in &report.refunded_stat_points {
            println!("   refunded stat point: {}", attribute);
        }
        for ability in &report.refunded_abilities {
            println!("   refunded ability upgrade: {}", ability);
        }
    }
    if let Some(xp) = effect.awarded_xp {
        println!("Awarded {} XP", xp);
    }
    if let Some(outcome) = &effect.migration {
        println!("Migration: {:?}", outcome);
    }
}

fn print_record(
    actor: &str,
    record: &ProgressionLedger,
    config: &ProgressionConfig,
    outcome: Option<MigrationOutcome>,
    json: bool,
) -> Result<()> {
    let snapshot = record.snapshot(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{} (schema {})", actor, snapshot.schema_version);
    if let Some(MigrationOutcome::Migrated { from, to }) = outcome {
        println!("   migrated in memory from schema {} to {}", from, to);
    }
    println!(
        "   Level:       {} / {}  ({} XP, {} into level, {} to next)",
        snapshot.level,
        snapshot.max_level,
        snapshot.total_xp,
        snapshot.xp_into_level,
        snapshot.xp_to_next_level
    );
    println!(
        "   Stat points: {} available of {}",
        snapshot.available_stat_points, snapshot.earned_stat_points
    );
    for (attribute, score) in &snapshot.attributes {
        println!("   {:<12} {}", attribute.name(), score);
    }
    println!("   Ability points: {} available", snapshot.available_ability_points);
    for (ability, level) in &snapshot.ability_levels {
        println!("   {:<12} {}", ability, level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_and_mapping() {
        let cli = Cli::try_parse_from([
            "progression", "grant", "--actor", "hero", "--amount", "-50", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.store, PathBuf::from("saves"));

        let (actor, command) = cli.command.ledger_command().unwrap();
        assert_eq!(actor, "hero");
        assert_eq!(command, LedgerCommand::GrantXp { amount: -50 });

        let cli = Cli::try_parse_from(["progression", "schema"]).unwrap();
        assert!(cli.command.ledger_command().is_none());
    }

    #[test]
    fn test_award_requires_actor() {
        assert!(Cli::try_parse_from(["progression", "award", "--max-health", "50"]).is_err());
        let cli = Cli::try_parse_from([
            "progression", "award", "--max-health", "50", "--actor", "a", "--actor", "b",
        ])
        .unwrap();
        match cli.command {
            Commands::Award { actors, .. } => assert_eq!(actors, vec!["a", "b"]),
            _ => panic!("expected award"),
        }
    }

    #[test]
    fn test_ledger_command_persists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        let config = ProgressionConfig::default();

        run_ledger_command(&store, &config, "hero", LedgerCommand::GrantXp { amount: 250 }, true)
            .unwrap();
        run_ledger_command(
            &store,
            &config,
            "hero",
            LedgerCommand::SpendStatPoint { attribute: "str".into() },
            true,
        )
        .unwrap();

        let (record, _) = store.load("hero", &config).unwrap();
        assert_eq!(record.level(), 2);
        assert_eq!(record.spend_history(), &["str"]);

        run_ledger_command(&store, &config, "hero", LedgerCommand::UndoStatPoint, true).unwrap();
        let (record, _) = store.load("hero", &config).unwrap();
        assert!(record.spend_history().is_empty());

        let refused = run_ledger_command(
            &store,
            &config,
            "hero",
            LedgerCommand::SpendStatPoint { attribute: "wis".into() },
            true,
        );
        assert!(refused.is_err());
    }

    #[test]
    fn test_award_splits_between_actors() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        let config = ProgressionConfig::default();

        // 300 HP → 158 XP, pool 173 for two, 86 each
        run_award(&store, &config, 300.0, &["a".into(), "b".into()], true).unwrap();

        let (a, _) = store.load("a", &config).unwrap();
        let (b, _) = store.load("b", &config).unwrap();
        assert_eq!(a.total_xp(), 86);
        assert_eq!(b.total_xp(), 86);
    }

    #[test]
    fn test_reset_clears_experience() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        let config = ProgressionConfig::default();

        run_ledger_command(&store, &config, "vet", LedgerCommand::SetLevel { level: 5 }, true)
            .unwrap();
        run_ledger_command(
            &store,
            &config,
            "vet",
            LedgerCommand::SpendStatPoint { attribute: "end".into() },
            true,
        )
        .unwrap();
        run_ledger_command(
            &store,
            &config,
            "vet",
            LedgerCommand::UpgradeAbility { ability: "iron_skin".into() },
            true,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["progression", "reset", "--actor", "vet"]).unwrap();
        let (actor, command) = cli.command.ledger_command().unwrap();
        run_ledger_command(&store, &config, actor, command, true).unwrap();

        let (record, _) = store.load("vet", &config).unwrap();
        assert_eq!(record.total_xp(), 0);
        assert_eq!(record.level(), 1);
        assert!(record.spend_history().is_empty());
        assert!(record.ability_levels().is_empty());
        assert_eq!(record, ProgressionLedger::new(&config));
    }

    #[test]
    fn test_award_counts_repeated_actor_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        let config = ProgressionConfig::default();

        // Same actor twice is a solo kill: the full 158 XP
        run_award(&store, &config, 300.0, &["a".into(), "a".into()], true).unwrap();

        let (a, _) = store.load("a", &config).unwrap();
        assert_eq!(a.total_xp(), 158);
        assert_eq!(store.list_actors().unwrap(), vec!["a"]);
    }
}
