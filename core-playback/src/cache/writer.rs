//! Cache writer
//!
//! Downloads whole payloads and commits them to the file store, one URL at
//! a time.

use super::index::CacheIndex;
use super::record::CacheRecord;
use crate::error::{PlaybackError, Result};
use crate::playlist::PlaylistEntry;
use bridge_traits::http::HttpClient;
use core_runtime::events::CacheEvent;
use core_runtime::logging::{redact_url, strip_path};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`CacheWriter::cache_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheReport {
    /// Playlist indices cached successfully.
    pub succeeded: Vec<usize>,
    /// Playlist indices that failed, with the reason.
    pub failed: Vec<(usize, String)>,
    /// Whether the manifest was written at the end of the batch.
    pub manifest_saved: bool,
}

impl CacheReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Fetches URLs and records them in the [`CacheIndex`].
pub struct CacheWriter {
    index: Arc<CacheIndex>,
    http: Arc<dyn HttpClient>,
    busy: AtomicBool,
}

/// Clears the busy flag when a batch ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CacheWriter {
    pub fn new(index: Arc<CacheIndex>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            index,
            http,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a `cache all` batch is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Download `url` and record it as the cached copy for that URL.
    ///
    /// On failure the index is left untouched for `url`. Nothing is retried.
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn cache_one(&self, url: &str, index: usize) -> Result<CacheRecord> {
        info!(index, "Attempting to cache video");
        self.index.emit(CacheEvent::Caching {
            index,
            url: url.to_string(),
        });

        match self.download(url, index).await {
            Ok(record) => {
                let cached_path = record.cached_path.clone().unwrap_or_default();
                info!(index, file = %strip_path(&cached_path), "Successfully cached video");
                self.index.emit(CacheEvent::Cached {
                    index,
                    url: url.to_string(),
                    cached_path,
                });
                Ok(record)
            }
            Err(e) => {
                error!(index, error = %e, "Error caching video");
                self.index.emit(CacheEvent::CacheFailed {
                    index,
                    url: url.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn download(&self, url: &str, index: usize) -> Result<CacheRecord> {
        let fs = self.index.file_system();
        if !fs.is_supported() {
            return Err(PlaybackError::CapabilityUnavailable(
                "file store unavailable; cannot cache".to_string(),
            ));
        }

        let previous = match self.index.get(url).await {
            Ok(previous) => previous,
            Err(e) => {
                debug!(error = %e, "Cannot read previous cache record");
                None
            }
        };

        let dir = self.index.cache_directory().await?;
        fs.create_dir_all(&dir)
            .await
            .map_err(PlaybackError::storage)?;

        let timestamp = self.index.clock().unix_timestamp_millis();
        let file_name = format!(
            "video_{}_{}.{}",
            index,
            timestamp,
            extension_for(url, &self.index.config().default_extension)
        );

        let payload = self
            .http
            .fetch_bytes(url)
            .await
            .map_err(PlaybackError::network)?;
        debug!(bytes = payload.len(), "Downloaded payload");

        // Readers only ever see the renamed, complete file
        let destination = dir.join(&file_name);
        let staging = dir.join(format!("{}.part", file_name));
        if let Err(e) = fs.write_file(&staging, payload).await {
            let _ = fs.delete_file(&staging).await;
            return Err(PlaybackError::storage(e));
        }
        if let Err(e) = fs.rename(&staging, &destination).await {
            let _ = fs.delete_file(&staging).await;
            return Err(PlaybackError::storage(e));
        }

        let cached_path = format!(
            "{}/{}",
            self.index.config().cache_directory.trim_end_matches('/'),
            file_name
        );
        let record = CacheRecord::new(url, cached_path, timestamp);

        if let Err(e) = self.index.put(url, &record).await {
            let _ = fs.delete_file(&destination).await;
            return Err(e);
        }

        if self.index.config().remove_superseded_files {
            if let Some(old) = previous.and_then(|p| p.cached_path) {
                if Some(&old) != record.cached_path.as_ref() {
                    self.remove_superseded(&old).await;
                }
            }
        }

        Ok(record)
    }

    async fn remove_superseded(&self, relative: &str) {
        let path: PathBuf = match self.index.resolve_path(relative).await {
            Ok(path) => path,
            Err(_) => return,
        };

        match self.index.file_system().delete_file(&path).await {
            Ok(()) => debug!(file = %strip_path(relative), "Removed superseded copy"),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(file = %strip_path(relative), error = %e, "Failed to remove superseded copy"),
        }
    }

    /// Cache every entry strictly one after another, then flush once.
    ///
    /// Individual failures are recorded in the report and do not stop the
    /// batch. A second call while a batch is running fails with
    /// [`PlaybackError::Busy`].
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn cache_all(&self, entries: &[PlaylistEntry]) -> Result<CacheReport> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Cache operation already in progress");
            return Err(PlaybackError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        if !self.index.caching_supported() {
            return Err(PlaybackError::CapabilityUnavailable(
                "file store unavailable; playback will stream".to_string(),
            ));
        }

        info!("Starting to cache videos");
        let mut report = CacheReport::default();
        for entry in entries {
            match self.cache_one(&entry.url, entry.index).await {
                Ok(_) => report.succeeded.push(entry.index),
                Err(e) => report.failed.push((entry.index, e.to_string())),
            }
        }

        report.manifest_saved = match self.index.flush().await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Failed to save cache status");
                false
            }
        };

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Caching process complete"
        );
        self.index.emit(CacheEvent::BatchCompleted {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });

        Ok(report)
    }
}

/// File extension of the URL's last path segment, or `default`.
fn extension_for(url: &str, default: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => path,
    };
    let segment = path.rsplit('/').next().unwrap_or(path);

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => default.to_string(),
    }
}
