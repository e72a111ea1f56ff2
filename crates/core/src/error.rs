//! Configuration error types

/// Errors raised while resolving a request against the fixed catalogs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Unknown scheduler: {0}")]
    UnknownScheduler(String),

    #[error("Unknown model preset: {0}")]
    UnknownModel(String),

    #[error("Invalid {field}: {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error("Failed to draw a random seed: {0}")]
    Entropy(#[from] rand::Error),

    #[error("Config error: {0}")]
    Config(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
