//! Storage Abstractions
//!
//! Provides platform-agnostic traits for the hierarchical file store (cached
//! payloads and the durable manifest) and the low-latency key-value store
//! that backs the live cache index.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - TV / set-top runtimes: Sandboxed application storage
/// - Platforms without file access: [`UnsupportedFileSystem`]
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn store_payload(fs: &dyn FileSystemAccess, data: Bytes) -> Result<()> {
///     let root = fs.get_data_directory().await?;
///     let dir = root.join("cache/videos");
///     fs.create_dir_all(&dir).await?;
///     fs.write_file(&dir.join("video_0.mp4"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Whether this platform can store files at all.
    ///
    /// Callers use this to degrade to stream-only behavior up front instead
    /// of discovering `NotAvailable` errors per operation.
    fn is_supported(&self) -> bool {
        true
    }

    /// Get the application's persistent data directory
    ///
    /// Relative cache paths are resolved against this directory.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    ///
    /// Resolving an already existing directory is not an error.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Move a file into place, replacing any existing file at `to`
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Low-latency key-value store trait ("fast store")
///
/// Abstracts platform-specific string key-value persistence:
/// - Desktop: SQLite-backed table
/// - TV / web runtimes: localStorage
/// - Tests: in-memory map
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set("last-playlist-input", "http://a/1.mp4").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, `Ok(None)` if the key doesn't exist
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// List all keys currently stored
    async fn keys(&self) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// File store for platforms without file-system access.
///
/// Every operation fails with [`BridgeError::NotAvailable`], which the core
/// treats as "caching unsupported" and falls back to streaming playback.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedFileSystem;

impl UnsupportedFileSystem {
    fn unavailable<T>() -> Result<T> {
        Err(BridgeError::NotAvailable(
            "file system access is not supported on this platform".to_string(),
        ))
    }
}

#[async_trait]
impl FileSystemAccess for UnsupportedFileSystem {
    fn is_supported(&self) -> bool {
        false
    }

    async fn get_data_directory(&self) -> Result<PathBuf> {
        Self::unavailable()
    }

    async fn exists(&self, _path: &Path) -> Result<bool> {
        Self::unavailable()
    }

    async fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Self::unavailable()
    }

    async fn read_file(&self, _path: &Path) -> Result<Bytes> {
        Self::unavailable()
    }

    async fn write_file(&self, _path: &Path, _data: Bytes) -> Result<()> {
        Self::unavailable()
    }

    async fn rename(&self, _from: &Path, _to: &Path) -> Result<()> {
        Self::unavailable()
    }

    async fn delete_file(&self, _path: &Path) -> Result<()> {
        Self::unavailable()
    }

    async fn list_directory(&self, _path: &Path) -> Result<Vec<PathBuf>> {
        Self::unavailable()
    }
}
