//! Error types for Velocity.
//!
//! Only configuration problems surface as errors to callers. Adapter and
//! formatter failures are recoverable and are folded into the reasoning trace.

use crate::trust::SourceCategory;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VelocityError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VelocityError {
    pub fn code(&self) -> i32 {
        match self {
            VelocityError::InvalidConfig(_) => -32010,
            VelocityError::ConfigRead { .. } => -32011,
            VelocityError::ConfigParse(_) => -32012,
            VelocityError::Internal(_) => -32603,
        }
    }
}

/// Failure of a single source adapter call. Never fatal: the scheduler turns
/// every variant into "zero evidence from this call".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("source query timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no adapter registered for {0}")]
    Unregistered(SourceCategory),

    #[error("source returned no results")]
    Empty,
}

impl AdapterError {
    /// Short reason code used in trace steps
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Malformed(_) => "malformed",
            Self::Unregistered(_) => "unregistered",
            Self::Empty => "empty",
        }
    }
}

/// Failure of the optional natural-language formatter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("formatter unavailable")]
    Unavailable,

    #[error("formatter transport error: {0}")]
    Transport(String),

    #[error("formatter returned an empty response")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, VelocityError>;
