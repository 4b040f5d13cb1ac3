use std::path::PathBuf;
use thiserror::Error;

use crate::oracle::OracleError;

#[derive(Error, Debug)]
pub enum RepertoireError {
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    #[error("illegal move '{notation}' after [{line}]")]
    IllegalMove { notation: String, line: String },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to write {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RepertoireError>;

impl RepertoireError {
    pub fn config(msg: impl Into<String>) -> Self { RepertoireError::ConfigInvalid(msg.into()) }
}
