use super::error::SaveError;
use super::format::{decode_record, encode_record};
use super::migration::MigrationOutcome;
use crate::config::ProgressionConfig;
use crate::progression::ProgressionLedger;

use std::fs::{remove_file, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "dat";

/// Directory of `<actor_id>.dat` records.
///
/// The store does no locking; callers keep one writer per actor.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save a record for `actor_id`, replacing any previous one atomically
    pub fn save(&self, actor_id: &str, record: &ProgressionLedger) -> Result<(), SaveError> {
        let path = self.record_path(actor_id)?;
        Self::save_to_path(&path, record)?;
        log::info!("Saved progression record for {}", actor_id);
        Ok(())
    }

    /// Load, migrate and resync a record. Migration happens before anything
    /// else touches the record; records from a newer schema are returned as-is.
    pub fn load(
        &self,
        actor_id: &str,
        config: &ProgressionConfig,
    ) -> Result<(ProgressionLedger, MigrationOutcome), SaveError> {
        let path = self.record_path(actor_id)?;
        if !path.exists() {
            return Err(SaveError::NotFound { actor_id: actor_id.to_string() });
        }

        let mut record = Self::load_from_path(&path)?;
        let outcome = record.migrate_if_needed(config);
        if !matches!(outcome, MigrationOutcome::FutureVersion { .. }) {
            record.resync(config);
        }

        log::info!("Loaded progression record for {} ({:?})", actor_id, outcome);
        Ok((record, outcome))
    }

    /// First observation of an actor creates a default record (not yet saved).
    pub fn load_or_create(
        &self,
        actor_id: &str,
        config: &ProgressionConfig,
    ) -> Result<(ProgressionLedger, MigrationOutcome), SaveError> {
        match self.load(actor_id, config) {
            Err(SaveError::NotFound { .. }) => {
                log::debug!("No record for {}, starting fresh", actor_id);
                Ok((ProgressionLedger::new(config), MigrationOutcome::UpToDate))
            }
            other => other,
        }
    }

    /// Create and save a fresh record; refuses to overwrite
    pub fn create(
        &self,
        actor_id: &str,
        config: &ProgressionConfig,
    ) -> Result<ProgressionLedger, SaveError> {
        if self.exists(actor_id) {
            return Err(SaveError::AlreadyExists { actor_id: actor_id.to_string() });
        }
        let record = ProgressionLedger::new(config);
        self.save(actor_id, &record)?;
        Ok(record)
    }

    pub fn exists(&self, actor_id: &str) -> bool {
        self.record_path(actor_id).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn delete(&self, actor_id: &str) -> Result<(), SaveError> {
        let path = self.record_path(actor_id)?;
        if path.exists() {
            remove_file(&path)?;
            log::info!("Deleted progression record for {}", actor_id);
        }
        Ok(())
    }

    /// Actor ids with a record on disk, sorted
    pub fn list_actors(&self) -> Result<Vec<String>, SaveError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut actors = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_actor_id(stem).is_ok() {
                    actors.push(stem.to_string());
                }
            }
        }
        actors.sort();
        Ok(actors)
    }

    // Private helper methods

    fn record_path(&self, actor_id: &str) -> Result<PathBuf, SaveError> {
        validate_actor_id(actor_id)?;
        Ok(self.root.join(format!("{}.{}", actor_id, RECORD_EXTENSION)))
    }

    fn save_to_path(path: &Path, record: &ProgressionLedger) -> Result<(), SaveError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = encode_record(record)?;

        // Atomic save: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&data)?;
            file.flush()?;
            file.sync_all()?;
        }
        rename(&temp_path, path)?;

        log::debug!("Saved {} bytes to {:?}", data.len(), path);
        Ok(())
    }

    fn load_from_path(path: &Path) -> Result<ProgressionLedger, SaveError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let record = decode_record(&data)?;

        log::debug!("Loaded {} bytes from {:?}", data.len(), path);
        Ok(record)
    }
}

/// Actor ids become file names: ASCII alphanumerics, `-` and `_` only.
fn validate_actor_id(actor_id: &str) -> Result<(), SaveError> {
    let valid = !actor_id.is_empty()
        && actor_id.len() <= 128
        && actor_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SaveError::InvalidActorId { actor_id: actor_id.to_string() })
    }
}
