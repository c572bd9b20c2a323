//! Application-level errors.

use rehydra_core::RehydrateError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    /// The engine rejected the environment or the root.
    #[error(transparent)]
    Rehydrate(#[from] RehydrateError),

    /// A file could not be read or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A path argument does not name a usable file.
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// An input file is larger than allowed.
    #[error("file '{path}' is {size} bytes, limit is {limit}")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// The configuration file is malformed.
    #[error("invalid configuration '{path}': {reason}")]
    Config { path: String, reason: String },
}

impl AppError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
