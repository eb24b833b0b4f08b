use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decompression error")]
    Decompression,

    #[error("Corrupted data: {reason}")]
    Corrupted { reason: String },

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Record not found: {actor_id}")]
    NotFound { actor_id: String },

    #[error("Invalid actor id: {actor_id:?}")]
    InvalidActorId { actor_id: String },

    #[error("Record already exists: {actor_id}")]
    AlreadyExists { actor_id: String },

    #[error("Save data too large: {size} entries")]
    DataTooLarge { size: usize },
}

impl SaveError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            SaveError::Io(_) => true,
            SaveError::NotFound { .. } => true,
            SaveError::AlreadyExists { .. } => true,
            SaveError::InvalidActorId { .. } => false,
            SaveError::Corrupted { .. } => false,
            SaveError::ChecksumMismatch => false,
            _ => false,
        }
    }
}
