use super::error::SaveError;
use crate::progression::{Attribute, ProgressionLedger};

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use sha2::{Digest, Sha256};

/// Guard against runaway histories in hand-edited saves
pub const MAX_HISTORY_ENTRIES: usize = 100_000;

const CHECKSUM_LEN: usize = 32;

/// Structural checks on a record about to be written or just read.
///
/// Numeric invariants (level vs XP, spendable points) are restored by resync,
/// not rejected here.
pub fn validate_record(record: &ProgressionLedger) -> Result<(), SaveError> {
    let history = record.spend_history().len() + record.ability_history().len();
    if history > MAX_HISTORY_ENTRIES {
        return Err(SaveError::DataTooLarge { size: history });
    }

    if record.total_xp() < 0 {
        return Err(SaveError::Corrupted { reason: format!("negative totalXp {}", record.total_xp()) });
    }

    for attribute in Attribute::ALL {
        if record.attribute(attribute) < 1 {
            return Err(SaveError::Corrupted {
                reason: format!("attribute {} below 1", attribute),
            });
        }
    }

    Ok(())
}

/// Pretty JSON using the persisted field names
pub fn to_json(record: &ProgressionLedger) -> Result<String, SaveError> {
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn from_json(json: &str) -> Result<ProgressionLedger, SaveError> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize, compress and checksum a record
pub fn encode_record(record: &ProgressionLedger) -> Result<Vec<u8>, SaveError> {
    validate_record(record)?;

    // 1. MessagePack with field names
    let msgpack = to_vec_named(record)?;

    // 2. LZ4 (size prepended)
    let compressed = compress_prepend_size(&msgpack);

    // 3. SHA256 trailer
    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let checksum = hasher.finalize();

    let mut result = compressed;
    result.extend_from_slice(&checksum);
    Ok(result)
}

/// Verify, decompress and deserialize a record. Migration is the caller's job.
pub fn decode_record(bytes: &[u8]) -> Result<ProgressionLedger, SaveError> {
    if bytes.len() < 4 + CHECKSUM_LEN {
        return Err(SaveError::Corrupted { reason: format!("{} bytes is too short", bytes.len()) });
    }

    let (payload, checksum_bytes) = bytes.split_at(bytes.len() - CHECKSUM_LEN);

    let mut hasher = Sha256::new();
    hasher.update(payload);
    let calculated_checksum = hasher.finalize();

    if &calculated_checksum[..] != checksum_bytes {
        return Err(SaveError::ChecksumMismatch);
    }

    let msgpack = decompress_size_prepended(payload).map_err(|_| SaveError::Decompression)?;
    let record: ProgressionLedger = from_slice(&msgpack)?;
    validate_record(&record)?;

    Ok(record)
}
