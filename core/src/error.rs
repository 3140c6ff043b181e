use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown market profile '{0}' (expected idealistic, pre_nbn, realistic or simplified)")]
    UnknownMarketProfile(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("Invalid market catalogue: {0}")]
    InvalidCatalogue(String),

    #[error("Run '{run_id}' already completed {months} months")]
    RunFinished { run_id: String, months: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
