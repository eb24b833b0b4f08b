// Progression record persistence
// JSON or MessagePack + LZ4 with SHA256 trailer, plus schema migration

pub mod error;
pub mod format;
pub mod migration;
pub mod store;

pub use error::SaveError;
pub use format::{decode_record, encode_record, from_json, to_json, validate_record};
pub use migration::{
    migrate_ledger, migration_description, needs_migration, MigrationOutcome, MigrationStep,
    CURRENT_SCHEMA_VERSION, MIGRATIONS, RETIRED_INTELLECT_ID,
};
pub use store::RecordStore;
