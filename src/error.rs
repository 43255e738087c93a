//! Error types and Result aliases for pycalc

use std::fmt;
use std::path::PathBuf;

/// Result type alias for pycalc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pycalc
#[derive(Debug)]
pub enum Error {
    // === Session errors ===
    /// Failed to spawn the background session
    SessionSpawnFailed {
        backend: String,
        reason: String,
    },

    /// Worker process did not expose a stdio pipe
    WorkerPipeUnavailable {
        pipe: String,
    },

    /// Failed to terminate the background session
    SessionTerminateFailed {
        session_id: String,
        reason: String,
    },

    /// The execution channel has been closed
    ChannelClosed,

    /// Submission payload does not start with a known mode tag
    InvalidSubmission {
        payload: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to save configuration file
    ConfigSaveFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Failed to persist plugin state
    StateSaveFailed {
        path: PathBuf,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Session errors
            Error::SessionSpawnFailed { backend, reason } => {
                write!(f, "Failed to spawn {} session: {}", backend, reason)
            }
            Error::WorkerPipeUnavailable { pipe } => {
                write!(f, "Worker process has no {} pipe", pipe)
            }
            Error::SessionTerminateFailed { session_id, reason } => {
                write!(f, "Failed to terminate session '{}': {}", session_id, reason)
            }
            Error::ChannelClosed => {
                write!(f, "Execution channel is closed")
            }
            Error::InvalidSubmission { payload } => {
                write!(f, "Invalid submission payload: {:?}", payload)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigSaveFailed { path, reason } => {
                write!(f, "Failed to save config to '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::StateSaveFailed { path, reason } => {
                write!(f, "Failed to save plugin state to '{}': {}", path.display(), reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}
