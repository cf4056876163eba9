//! # Playback Error Types
//!
//! Error types for playlist parsing, caching and playback sequencing.

use bridge_traits::error::BridgeError;
use core_runtime::logging::{redact_url, redact_urls};
use thiserror::Error;

/// Rejected playlist input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty or contained only whitespace.
    #[error("Playlist input is empty")]
    Empty,

    /// Input was valid JSON but not an array of URLs.
    #[error("Invalid JSON format: expected an array of URLs")]
    NotAnArray,

    /// An element of a JSON array was not a non-empty string.
    #[error("Invalid playlist entry at position {position}")]
    InvalidEntry { position: usize },
}

/// Errors that can occur during cache and playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Playlist input could not be parsed.
    #[error("Invalid playlist: {0}")]
    Parse(#[from] ParseError),

    // ========================================================================
    // Caching Errors
    // ========================================================================
    /// Fetching a URL failed (connection error or non-success status).
    #[error("Network error: {0}")]
    Network(String),

    /// Creating, writing or deleting a file failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The fast store failed to read or write a record.
    #[error("Cache index store error: {0}")]
    Store(String),

    /// The durable manifest document is corrupt.
    #[error("Invalid cache manifest: {0}")]
    Manifest(String),

    /// A `cache all` batch is already running.
    #[error("Cache operation already in progress")]
    Busy,

    /// The platform has no file store; only streaming is possible.
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// Cached playback was attempted on a missing or unverified copy.
    #[error("Video not cached: {0}")]
    NotCached(String),

    /// Start was requested but no playlist entry is cached.
    #[error("No cached videos to play")]
    NothingToPlay,

    /// Selected index is outside the playlist.
    #[error("Invalid playlist index {index} (playlist has {len} entries)")]
    InvalidIndex { index: usize, len: usize },

    /// The media sink rejected a command.
    #[error("Media sink error: {0}")]
    Sink(String),
}

impl PlaybackError {
    /// Map a network capability failure.
    ///
    /// The message never carries a URL's query string, since signed video
    /// URLs put their credentials there.
    pub fn network(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAvailable(msg) => PlaybackError::CapabilityUnavailable(msg),
            BridgeError::HttpStatus { status, url } => PlaybackError::Network(
                BridgeError::HttpStatus {
                    status,
                    url: redact_url(&url),
                }
                .to_string(),
            ),
            other => PlaybackError::Network(redact_urls(&other.to_string())),
        }
    }

    /// Map a file store failure.
    pub fn storage(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAvailable(msg) => PlaybackError::CapabilityUnavailable(msg),
            other => PlaybackError::Storage(other.to_string()),
        }
    }

    /// Map a file store failure where a cached file was expected.
    pub fn cached_file(err: BridgeError) -> Self {
        if err.is_not_found() {
            return PlaybackError::NotCached(err.to_string());
        }
        Self::storage(err)
    }

    /// Map a fast store failure.
    pub fn store(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAvailable(msg) => PlaybackError::CapabilityUnavailable(msg),
            other => PlaybackError::Store(other.to_string()),
        }
    }

    /// Map a media sink failure.
    pub fn sink(err: BridgeError) -> Self {
        PlaybackError::Sink(err.to_string())
    }

    /// Returns `true` if the user can retry the operation, possibly after
    /// correcting input or caching something first.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PlaybackError::CapabilityUnavailable(_)
                | PlaybackError::Manifest(_)
                | PlaybackError::InvalidIndex { .. }
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::Network(_))
    }

    /// Returns `true` if this error comes from the file or fast store.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Storage(_) | PlaybackError::Store(_) | PlaybackError::Manifest(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
