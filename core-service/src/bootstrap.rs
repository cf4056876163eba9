//! Desktop bootstrap
//!
//! Builds a [`PlayerService`] backed by the `bridge-desktop` adapters: a
//! tokio file store, a SQLite fast store, reqwest and an external player.

use crate::error::{CoreError, Result};
use crate::service::PlayerService;
use bridge_desktop::{
    ProcessMediaSink, ReqwestHttpClient, SqliteKeyValueStore, TokioFileSystem,
};
use bridge_traits::background::LifecycleObserver;
use bridge_traits::storage::FileSystemAccess;
use core_playback::CacheConfig;
use core_runtime::config::{AppConfig, DEFAULT_PLAYER_COMMAND};
use core_runtime::logging::{strip_path, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// File name of the SQLite fast store inside the data directory.
pub const STORE_FILE_NAME: &str = "vidcache.db";

/// Options for [`bootstrap_desktop`].
pub struct DesktopOptions {
    /// Data directory; the platform data dir when `None`.
    pub data_dir: Option<PathBuf>,
    pub player_command: String,
    pub player_args: Vec<String>,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
}

impl Default for DesktopOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            player_command: DEFAULT_PLAYER_COMMAND.to_string(),
            player_args: Vec::new(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            lifecycle_observer: None,
        }
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, DesktopOptions};
///
/// let service = bootstrap_desktop(DesktopOptions::default()).await?;
/// service.initialize().await;
/// service.load_playlist("https://example.com/a.mp4").await?;
/// # Ok(())
/// # }
/// ```
pub async fn bootstrap_desktop(options: DesktopOptions) -> Result<PlayerService> {
    let file_system = match &options.data_dir {
        Some(dir) => TokioFileSystem::with_data_directory(dir.clone()),
        None => TokioFileSystem::new(),
    };
    let data_dir = file_system
        .get_data_directory()
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let store = SqliteKeyValueStore::new(data_dir.join(STORE_FILE_NAME))
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    let http = ReqwestHttpClient::new()
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    let sink = ProcessMediaSink::new(options.player_command.as_str())
        .with_args(options.player_args.iter().map(String::as_str));

    let mut builder = AppConfig::builder()
        .data_dir(data_dir.clone())
        .file_system(Arc::new(file_system))
        .key_value_store(Arc::new(store))
        .http_client(Arc::new(http))
        .media_sink(Arc::new(sink))
        .player_command(options.player_command.clone())
        .logging(options.logging);
    if let Some(observer) = options.lifecycle_observer {
        builder = builder.lifecycle_observer(observer);
    }
    let config = builder.build()?;

    info!(
        data_dir = %strip_path(&data_dir.to_string_lossy()),
        player = %options.player_command,
        "Desktop bootstrap complete"
    );

    PlayerService::new(&config, options.cache)
}
