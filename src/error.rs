use std::io;

use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error surface for the whole crate.
///
/// The HTTP range client raises the narrow, precondition-shaped variants
/// (`EmptyUrl`, `EmptyPort`, `EmptyPath`, `ConnectFailed`, `NoResponse`,
/// `HttpStatus`, `ReadHeaders`); everything above it collapses those into
/// `Network`/`Protocol` only where it genuinely doesn't matter which one
/// fired (e.g. the generic retry loops just need to know "try again or
/// not"), never by construction.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File is closed")]
    FileClosed,

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("URL is empty")]
    EmptyUrl,

    #[error("Port is missing or invalid")]
    EmptyPort,

    #[error("Path is empty")]
    EmptyPath,

    #[error("Could not connect: {0}")]
    ConnectFailed(String),

    #[error("No response received from server")]
    NoResponse,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Failed to read response headers: {0}")]
    ReadHeaders(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// True for failures worth retrying (transient network/connection
    /// trouble); false for anything that will fail again identically
    /// (bad status code, malformed headers, closed file, ...).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FsError::Network(_) | FsError::ConnectFailed(_) | FsError::NoResponse
        )
    }
}
