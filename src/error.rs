// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the updater
#[derive(Error, Debug)]
pub enum Error {
    /// The local build info record is missing, corrupt, or has no version
    #[error("Local version unavailable: {0}")]
    LocalVersionUnavailable(String),

    /// The remote version could not be discovered
    #[error("Remote version unavailable: {0}")]
    RemoteVersionUnavailable(String),

    /// The package download failed
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The outer archive has no data.tar member
    #[error("No data.tar member found in package")]
    DataMemberNotFound,

    /// An outer archive member ended before its declared length
    #[error("Archive member {name} truncated: expected {expected} bytes, read {actual}")]
    TruncatedMember {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// A payload entry ended before its declared size
    #[error("Entry {path} truncated: expected {expected} bytes, read {actual}")]
    EntrySizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Malformed archive data or a read error in the middle of a stream
    #[error("Failed to read archive: {0}")]
    ArchiveReadFailure(String),

    /// Writing an extracted entry to disk failed
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A payload path would land outside the install root
    #[error("Refusing unsafe path in package: {0}")]
    UnsafePath(String),

    /// The data member uses a compression we cannot decode
    #[error("Unsupported data member compression: {0}")]
    UnsupportedCompression(String),

    /// A version token failed validation
    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    /// Configuration is unreadable or inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the updater's Error type
pub type Result<T> = std::result::Result<T, Error>;
