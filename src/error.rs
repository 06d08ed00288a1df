use thiserror::Error;

use crate::mesh::NodeHandle;

/// Errors raised by the KDE tally engine.
///
/// Configuration problems never show up here: they are recovered locally
/// with a warning. Everything in this enum is fatal for the run and is
/// handed back to the host, which decides how to terminate.
#[derive(Debug, Error)]
pub enum KdeError {
    #[error("tally event ({event}) is not valid for KDE {estimator} mesh tally {tally_id}")]
    EventMismatch {
        tally_id: u32,
        estimator: &'static str,
        event: &'static str,
    },

    #[error("invalid tally event: {0}")]
    InvalidEvent(String),

    #[error("mesh backend failure while {context}: {message}")]
    Backend { context: String, message: String },

    #[error("mesh node {0} does not exist")]
    MissingNode(NodeHandle),

    #[error("invalid energy bins: {0}")]
    InvalidEnergyBins(String),

    #[error("number of source particles must be positive, got {0}")]
    InvalidNormalization(f64),

    #[error("FC{tally_id} card is incorrectly formatted: {message}")]
    Card { tally_id: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl KdeError {
    pub fn backend(context: impl Into<String>, message: impl Into<String>) -> Self {
        KdeError::Backend {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KdeError>;
