//! Media sink bridge traits.
//!
//! The core never renders video itself. It hands a [`MediaSource`] to a
//! host-provided [`MediaSink`] and reacts to the sink's end-of-media events.
//! Host applications are expected to provide concrete implementations that
//! satisfy their platform constraints (native player, TV runtime, test fake).

use crate::error::Result;
use crate::http::without_query;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Source descriptor handed to a media sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Cached copy in the local file store.
    LocalFile { path: PathBuf },
    /// Direct network stream of the original URL.
    RemoteStream { url: String },
}

impl MediaSource {
    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::RemoteStream { .. })
    }

    /// Short description for log fields: the file name of a local copy or
    /// the stream URL without its query string.
    pub fn log_label(&self) -> String {
        match self {
            MediaSource::LocalFile { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            MediaSource::RemoteStream { url } => without_query(url).to_string(),
        }
    }

    /// Location string in the form a URL-based renderer expects.
    pub fn locator(&self) -> String {
        match self {
            MediaSource::LocalFile { path } => format!("file://{}", path.display()),
            MediaSource::RemoteStream { url } => url.clone(),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator())
    }
}

/// Events emitted by a media sink.
///
/// Every event carries the generation returned by the
/// [`set_source`](MediaSink::set_source) call that loaded the source it is
/// about, so a consumer can drop events that were still queued when the
/// source was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// The source played to its natural end.
    Ended { generation: u64 },
    /// The renderer failed on the source.
    Error { generation: u64, message: String },
}

impl MediaEvent {
    pub fn generation(&self) -> u64 {
        match self {
            MediaEvent::Ended { generation } | MediaEvent::Error { generation, .. } => *generation,
        }
    }
}

/// Trait for platform-specific renderers that play a single source at a time.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Replace the current source. Any previous source is released.
    ///
    /// Returns the generation that events about this source will carry.
    /// Each successful call returns a different value.
    async fn set_source(&self, source: MediaSource) -> Result<u64>;

    /// Begin or resume rendering of the current source.
    async fn play(&self) -> Result<()>;

    /// Suspend rendering without releasing the source.
    async fn pause(&self) -> Result<()>;

    /// Halt rendering and release the current source.
    async fn stop(&self) -> Result<()>;

    /// Whether rendering is currently suspended (or nothing is loaded).
    async fn is_paused(&self) -> bool;

    /// Subscribe to end-of-media and error notifications.
    async fn subscribe_events(&self) -> Result<Box<dyn MediaEventStream>>;
}

/// Stream of media sink events
#[async_trait]
pub trait MediaEventStream: Send {
    /// Get the next sink event
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<MediaEvent>;
}
