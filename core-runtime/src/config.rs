//! # Core Configuration Module
//!
//! Provides capability wiring and runtime settings for the video cache core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an [`AppConfig`]
//! holding every capability the core consumes. It fails fast when a required
//! capability is missing, with an actionable message.
//!
//! ## Required Capabilities
//!
//! - `KeyValueStore` - Fast store backing the live cache index
//! - `HttpClient` - Downloads remote videos
//! - `MediaSink` - Renders the selected source
//!
//! ## Optional Capabilities
//!
//! - `FileSystemAccess` - Without it the null `UnsupportedFileSystem` is
//!   selected and the core degrades to stream-only playback
//! - `LifecycleObserver` - Background/foreground notifications
//! - `Clock` - Defaults to [`SystemClock`]
//!
//! When the `desktop-shims` feature is enabled, desktop implementations are
//! injected for every capability not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//! use std::sync::Arc;
//!
//! let config = AppConfig::builder()
//!     .data_dir("/var/lib/vidcache")
//!     .key_value_store(Arc::new(MyStore))
//!     .http_client(Arc::new(MyHttpClient))
//!     .media_sink(Arc::new(MyPlayer))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{
    Clock, FileSystemAccess, HttpClient, KeyValueStore, LifecycleObserver, MediaSink,
    SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Default external player used by the desktop media sink.
pub const DEFAULT_PLAYER_COMMAND: &str = "mpv";

/// Runtime configuration for the video cache core.
///
/// Use [`AppConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct AppConfig {
    /// Data directory override for the desktop file store
    pub data_dir: Option<PathBuf>,

    /// Hierarchical file store (may be `UnsupportedFileSystem`)
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Fast store for cache records
    pub key_value_store: Arc<dyn KeyValueStore>,

    /// Network fetch capability
    pub http_client: Arc<dyn HttpClient>,

    /// Video renderer
    pub media_sink: Arc<dyn MediaSink>,

    /// Visibility notifications (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Time source for cache timestamps and file names
    pub clock: Arc<dyn Clock>,

    /// Player program for the desktop media sink
    pub player_command: String,

    /// Event bus channel capacity
    pub event_buffer_size: usize,

    /// Logging setup applied by binaries
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("file_system_supported", &self.file_system.is_supported())
            .field("key_value_store", &"KeyValueStore { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("media_sink", &"MediaSink { ... }")
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field("player_command", &self.player_command)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Whether cached copies can be written and read on this platform.
    pub fn caching_supported(&self) -> bool {
        self.file_system.is_supported()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Data directory cannot be empty".to_string()));
            }
        }

        if self.player_command.trim().is_empty() {
            return Err(Error::Config("Player command cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg_attr(feature = "desktop-shims", allow(dead_code))]
fn capability_missing(capability: &str, purpose: &str, desktop_default: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required {}. \
             Desktop: enable the 'desktop-shims' feature to use {}. \
             Other hosts: inject a platform-native adapter.",
            capability, purpose, desktop_default
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(data_dir: Option<&PathBuf>) -> Arc<dyn FileSystemAccess> {
    use bridge_desktop::TokioFileSystem;

    match data_dir {
        Some(dir) => Arc::new(TokioFileSystem::with_data_directory(dir.clone())),
        None => Arc::new(TokioFileSystem::new()),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(_data_dir: Option<&PathBuf>) -> Arc<dyn FileSystemAccess> {
    warn!("No file system capability provided; caching disabled, streaming only");
    Arc::new(bridge_traits::UnsupportedFileSystem)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_key_value_store() -> Result<Arc<dyn KeyValueStore>> {
    // The SQLite store needs an async constructor; hosts wanting persistence
    // across restarts pass one explicitly. The manifest still rehydrates.
    Ok(Arc::new(bridge_desktop::MemoryKeyValueStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_key_value_store() -> Result<Arc<dyn KeyValueStore>> {
    Err(capability_missing(
        "KeyValueStore",
        "for the live cache index",
        "the SQLite-backed store",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "to download videos",
        "the reqwest client",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_sink(player_command: &str) -> Result<Arc<dyn MediaSink>> {
    Ok(Arc::new(bridge_desktop::ProcessMediaSink::new(
        player_command,
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_sink(_player_command: &str) -> Result<Arc<dyn MediaSink>> {
    Err(capability_missing(
        "MediaSink",
        "to render videos",
        "the external player sink",
    ))
}

/// Builder for constructing [`AppConfig`] instances.
#[derive(Default)]
pub struct AppConfigBuilder {
    data_dir: Option<PathBuf>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    media_sink: Option<Arc<dyn MediaSink>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    clock: Option<Arc<dyn Clock>>,
    player_command: Option<String>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl AppConfigBuilder {
    /// Sets the data directory the desktop file store is rooted at.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the file store. Pass `UnsupportedFileSystem` to force
    /// stream-only behavior.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the fast store (required).
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the network client (required).
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the video renderer (required).
    pub fn media_sink(mut self, sink: Arc<dyn MediaSink>) -> Self {
        self.media_sink = Some(sink);
        self
    }

    /// Sets the lifecycle observer (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the player program used by the desktop media sink.
    ///
    /// Default: `mpv`
    pub fn player_command(mut self, command: impl Into<String>) -> Self {
        self.player_command = Some(command.into());
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `AppConfig`.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` when a required capability is absent and
    ///   no desktop default is available
    /// - `Error::Config` when a value is invalid
    pub fn build(self) -> Result<AppConfig> {
        let player_command = self
            .player_command
            .unwrap_or_else(|| DEFAULT_PLAYER_COMMAND.to_string());

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(self.data_dir.as_ref()),
        };

        if !file_system.is_supported() {
            warn!("File system capability unavailable; videos will be streamed");
        }

        let key_value_store = match self.key_value_store {
            Some(store) => store,
            None => provide_default_key_value_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let media_sink = match self.media_sink {
            Some(sink) => sink,
            None => provide_default_media_sink(&player_command)?,
        };

        let config = AppConfig {
            data_dir: self.data_dir,
            file_system,
            key_value_store,
            http_client,
            media_sink,
            lifecycle_observer: self.lifecycle_observer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            player_command,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
