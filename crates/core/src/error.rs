//! Error taxonomy for media resolution and metadata alignment.
//!
//! Every fallible operation in this crate returns [`MediaError`]. Decode
//! failures from the per-modality codecs are normalized into
//! [`MediaError::InvalidInput`] so callers can treat malformed media, bad
//! URLs and bad metadata with a single catch-all, regardless of which codec
//! rejected the payload.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type for media fetching, decoding and metadata merging.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Invalid connector configuration (bad sandbox directory).
    #[error("invalid connector configuration: {0}")]
    Config(String),

    /// URL scheme outside {http, https, data, file}.
    #[error("unsupported URL scheme {scheme:?}: the URL must be a HTTP, data or file URL")]
    UnsupportedScheme { scheme: String },

    /// Data URL with a non-base64 encoding token.
    #[error("only base64-encoded data URLs are supported, got encoding {encoding:?}")]
    UnsupportedEncoding { encoding: String },

    /// Local file path escapes the sandbox, or no sandbox is configured.
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    /// Malformed input: undecodable media bytes, invalid URL syntax, or
    /// empty placeholder metadata.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure reported by the HTTP connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// The network fetch exceeded its per-call timeout.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Local filesystem failure while resolving or reading a file URL.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Shorthand for wrapping a filesystem error with its path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
