//! Cache index
//!
//! The fast store is the authoritative runtime view of which URLs are
//! cached. The durable manifest is only a checkpoint: [`CacheIndex::flush`]
//! writes it, [`CacheIndex::rehydrate`] reads it back at startup and
//! re-validates every entry against the file store before trusting it.
//! The three stores (fast store, manifest, files) are reconciled on a
//! best-effort basis and may briefly disagree.

use super::config::CacheConfig;
use super::manifest::Manifest;
use super::record::CacheRecord;
use crate::error::{PlaybackError, Result};
use bridge_traits::storage::{FileSystemAccess, KeyValueStore};
use bridge_traits::time::Clock;
use bytes::Bytes;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::{redact_url, strip_path};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`CacheIndex::rehydrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    /// Manifest entries now present in the fast store.
    pub restored: usize,
    /// Entries dropped because they were malformed or their file is gone.
    pub dropped: usize,
}

/// Outcome of [`CacheIndex::remove_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub records: usize,
    pub files_deleted: usize,
    pub files_failed: usize,
    pub manifest_removed: bool,
}

/// Source of truth for "is URL X cached, and where".
pub struct CacheIndex {
    store: Arc<dyn KeyValueStore>,
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    data_dir: RwLock<Option<PathBuf>>,
    event_bus: Option<EventBus>,
}

impl CacheIndex {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fs: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            fs,
            clock,
            config,
            data_dir: RwLock::new(None),
            event_bus: None,
        }
    }

    /// Publish cache events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the platform can store cached payloads at all.
    pub fn caching_supported(&self) -> bool {
        self.fs.is_supported()
    }

    pub(crate) fn file_system(&self) -> &Arc<dyn FileSystemAccess> {
        &self.fs
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }

    /// Resolve or create the cache directory.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<PathBuf> {
        info!("Initializing cache directory");

        let dir = self.cache_directory().await?;
        self.fs.create_dir_all(&dir).await.map_err(|e| {
            error!(error = %e, "Failed to create cache directory");
            PlaybackError::storage(e)
        })?;

        info!(directory = %self.config.cache_directory, "Cache directory ready");
        Ok(dir)
    }

    /// Data directory of the file store, resolved once.
    pub async fn data_directory(&self) -> Result<PathBuf> {
        let known = self.data_dir.read().clone();
        if let Some(dir) = known {
            return Ok(dir);
        }

        let dir = self
            .fs
            .get_data_directory()
            .await
            .map_err(PlaybackError::storage)?;
        *self.data_dir.write() = Some(dir.clone());
        Ok(dir)
    }

    pub async fn cache_directory(&self) -> Result<PathBuf> {
        Ok(self.data_directory().await?.join(&self.config.cache_directory))
    }

    pub async fn manifest_path(&self) -> Result<PathBuf> {
        Ok(self.data_directory().await?.join(&self.config.manifest_file))
    }

    /// Absolute path of a record's relative `cached_path`.
    pub async fn resolve_path(&self, relative: &str) -> Result<PathBuf> {
        Ok(self.data_directory().await?.join(relative))
    }

    // ========================================================================
    // Record access
    // ========================================================================

    /// Read the record for `url` without verifying its file.
    ///
    /// Unparseable fast-store values are removed and reported as absent.
    pub async fn get(&self, url: &str) -> Result<Option<CacheRecord>> {
        let key = self.config.key_for(url);
        let Some(value) = self.store.get(&key).await.map_err(PlaybackError::store)? else {
            return Ok(None);
        };

        match CacheRecord::from_store_value(url, &value, self.clock.unix_timestamp_millis()) {
            Some(record) => Ok(Some(record)),
            None => {
                warn!(url = %redact_url(url), "Invalid cache data, removing record");
                self.store.remove(&key).await.map_err(PlaybackError::store)?;
                Ok(None)
            }
        }
    }

    /// Read the record for `url`, evicting it if its file is confirmed gone.
    ///
    /// When the file store cannot answer, the fast store is trusted.
    pub async fn lookup(&self, url: &str) -> Result<Option<CacheRecord>> {
        let Some(record) = self.get(url).await? else {
            return Ok(None);
        };

        if !self.config.verify_on_lookup {
            return Ok(Some(record));
        }

        // Legacy records have no location to verify
        let Some(relative) = record.cached_path.as_deref() else {
            return Ok(Some(record));
        };

        match self.file_exists(relative).await {
            Ok(true) => Ok(Some(record)),
            Ok(false) => {
                info!(
                    url = %redact_url(url),
                    file = %strip_path(relative),
                    "Cached file no longer exists, evicting record"
                );
                self.remove(url).await?;
                Ok(None)
            }
            Err(e) => {
                debug!(url = %redact_url(url), error = %e, "Cannot verify cached file, trusting index");
                Ok(Some(record))
            }
        }
    }

    /// Whether `url` has a record whose file is present (or unverifiable).
    pub async fn is_cached(&self, url: &str) -> Result<bool> {
        Ok(self.lookup(url).await?.is_some())
    }

    /// Absolute path of the cached copy, checked against the file store.
    pub async fn local_path(&self, record: &CacheRecord) -> Result<PathBuf> {
        let relative = record.cached_path.as_deref().ok_or_else(|| {
            PlaybackError::NotCached(format!(
                "location of {} is unknown",
                redact_url(&record.original_url)
            ))
        })?;

        let path = self.resolve_path(relative).await?;
        match self.fs.exists(&path).await {
            Ok(true) => Ok(path),
            Ok(false) => Err(PlaybackError::NotCached(format!(
                "{} does not exist",
                strip_path(relative)
            ))),
            Err(e) => Err(PlaybackError::cached_file(e)),
        }
    }

    async fn file_exists(&self, relative: &str) -> Result<bool> {
        let path = self.resolve_path(relative).await?;
        self.fs.exists(&path).await.map_err(PlaybackError::storage)
    }

    /// Insert or overwrite the record for `url`.
    ///
    /// Only the fast store is updated; see [`flush`](Self::flush).
    pub async fn put(&self, url: &str, record: &CacheRecord) -> Result<()> {
        let value = record
            .to_store_value()
            .map_err(|e| PlaybackError::Store(e.to_string()))?;
        self.store
            .set(&self.config.key_for(url), &value)
            .await
            .map_err(PlaybackError::store)?;
        debug!(url = %redact_url(url), "Cache record stored");
        Ok(())
    }

    /// Delete the record for `url`. Missing records are not an error.
    pub async fn remove(&self, url: &str) -> Result<()> {
        self.store
            .remove(&self.config.key_for(url))
            .await
            .map_err(PlaybackError::store)
    }

    /// URLs with a record in the fast store.
    pub async fn urls(&self) -> Result<Vec<String>> {
        let keys = self.store.keys().await.map_err(PlaybackError::store)?;
        Ok(keys
            .iter()
            .filter_map(|key| self.config.url_for_key(key))
            .map(str::to_string)
            .collect())
    }

    /// Every readable record, keyed by URL.
    pub async fn entries(&self) -> Result<BTreeMap<String, CacheRecord>> {
        let mut entries = BTreeMap::new();
        for url in self.urls().await? {
            if let Some(record) = self.get(&url).await? {
                entries.insert(url, record);
            }
        }
        Ok(entries)
    }

    // ========================================================================
    // Clearing
    // ========================================================================

    /// Remove every record, then delete cached files and the manifest.
    ///
    /// File deletion is best-effort: failures are logged and counted, and
    /// the call still succeeds once the records are gone.
    #[instrument(skip(self))]
    pub async fn remove_all(&self) -> Result<ClearReport> {
        let entries = self.entries().await?;
        for url in entries.keys() {
            self.remove(url).await?;
        }

        let (files_deleted, files_failed) = self.purge_files(&entries).await;
        let manifest_removed = self.remove_manifest().await;

        let report = ClearReport {
            records: entries.len(),
            files_deleted,
            files_failed,
            manifest_removed,
        };

        info!(
            records = report.records,
            files_deleted, files_failed, "Cache cleared"
        );
        self.emit(CacheEvent::Cleared {
            records: report.records,
            files_deleted,
            files_failed,
        });

        Ok(report)
    }

    async fn purge_files(&self, entries: &BTreeMap<String, CacheRecord>) -> (usize, usize) {
        if !self.fs.is_supported() {
            return (0, 0);
        }

        let mut targets = BTreeSet::new();
        for record in entries.values() {
            if let Some(relative) = record.cached_path.as_deref() {
                match self.resolve_path(relative).await {
                    Ok(path) => {
                        targets.insert(path);
                    }
                    Err(e) => warn!(error = %e, "Cannot resolve cached file"),
                }
            }
        }

        // Also sweep files no record points at any more
        if let Ok(dir) = self.cache_directory().await {
            match self.fs.list_directory(&dir).await {
                Ok(files) => targets.extend(files),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(error = %e, "Failed to list cache directory"),
            }
        }

        let mut deleted = 0;
        let mut failed = 0;
        for path in targets {
            match self.fs.delete_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    error!(
                        file = %strip_path(&path.to_string_lossy()),
                        error = %e,
                        "Failed to delete cached file"
                    );
                    failed += 1;
                }
            }
        }

        (deleted, failed)
    }

    async fn remove_manifest(&self) -> bool {
        if !self.fs.is_supported() {
            return false;
        }

        let path = match self.manifest_path().await {
            Ok(path) => path,
            Err(_) => return false,
        };

        match self.fs.delete_file(&path).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                error!(error = %e, "Failed to delete cache manifest");
                false
            }
        }
    }

    // ========================================================================
    // Durable manifest
    // ========================================================================

    /// Write every record to the durable manifest, replacing the old one.
    ///
    /// Returns the number of entries written.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<usize> {
        if !self.fs.is_supported() {
            info!("No file store, cache status only kept in the fast store");
            return Err(PlaybackError::CapabilityUnavailable(
                "file store unavailable; manifest not saved".to_string(),
            ));
        }

        let manifest = Manifest::new(self.entries().await?);
        let json = manifest.to_json()?;

        let path = self.manifest_path().await?;
        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        self.fs
            .write_file(&staging, Bytes::from(json))
            .await
            .map_err(|e| {
                error!(error = %e, "Error writing cache status file");
                PlaybackError::storage(e)
            })?;

        if let Err(e) = self.fs.rename(&staging, &path).await {
            error!(error = %e, "Error replacing cache status file");
            let _ = self.fs.delete_file(&staging).await;
            return Err(PlaybackError::storage(e));
        }

        let entries = manifest.len();
        info!(entries, manifest = %self.config.manifest_file, "Saved cache status");
        self.emit(CacheEvent::ManifestSaved { entries });
        Ok(entries)
    }

    /// Restore fast-store records from the durable manifest.
    ///
    /// A missing manifest yields an empty report. Entries whose file is gone
    /// (or cannot be checked) are dropped. Records already in the fast store
    /// are kept as they are.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Result<RehydrateReport> {
        if !self.fs.is_supported() {
            debug!("No file store, nothing to rehydrate");
            return Ok(RehydrateReport::default());
        }

        info!("Loading cache status from manifest");
        let path = self.manifest_path().await?;
        let bytes = match self.fs.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                info!("Cache status file not found, starting with empty cache");
                return Ok(RehydrateReport::default());
            }
            Err(e) => {
                error!(error = %e, "Error reading cache status file");
                return Err(PlaybackError::storage(e));
            }
        };

        let text =
            std::str::from_utf8(&bytes).map_err(|e| PlaybackError::Manifest(e.to_string()))?;
        let (manifest, skipped) = Manifest::from_json(text)?;

        let mut report = RehydrateReport {
            restored: 0,
            dropped: skipped,
        };

        for (url, record) in manifest.into_entries() {
            match self.get(&url).await {
                Ok(Some(_)) => {
                    report.restored += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(url = %redact_url(&url), error = %e, "Error verifying cache entry");
                    report.dropped += 1;
                    continue;
                }
            }

            if let Some(relative) = record.cached_path.as_deref() {
                match self.file_exists(relative).await {
                    Ok(true) => debug!(file = %strip_path(relative), "Verified cached file"),
                    Ok(false) => {
                        warn!(file = %strip_path(relative), "Cached file not found");
                        report.dropped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(url = %redact_url(&url), error = %e, "Error verifying cache entry");
                        report.dropped += 1;
                        continue;
                    }
                }
            }

            match self.put(&url, &record).await {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    warn!(url = %redact_url(&url), error = %e, "Failed to restore cache entry");
                    report.dropped += 1;
                }
            }
        }

        info!(
            restored = report.restored,
            dropped = report.dropped,
            "Loaded cache status"
        );
        self.emit(CacheEvent::ManifestLoaded {
            restored: report.restored,
            dropped: report.dropped,
        });
        Ok(report)
    }
}
