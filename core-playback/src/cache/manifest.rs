//! Durable manifest document
//!
//! A single JSON object keyed by URL:
//!
//! ```text
//! { "<url>": { "originalUrl": "<url>", "cachedPath": "<relative path>", "timestamp": <ms> } }
//! ```

use super::record::CacheRecord;
use crate::error::{PlaybackError, Result};
use core_runtime::logging::redact_url;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Snapshot of every cache record, ordered by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, CacheRecord>,
}

impl Manifest {
    pub fn new(entries: BTreeMap<String, CacheRecord>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, CacheRecord> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, CacheRecord> {
        self.entries
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| PlaybackError::Manifest(e.to_string()))
    }

    /// Parse a manifest document.
    ///
    /// A document that is not a JSON object is an error. Individual entries
    /// that are malformed, or carry neither a path nor the legacy flag, are
    /// skipped; the second value counts them.
    pub fn from_json(text: &str) -> Result<(Self, usize)> {
        let document: BTreeMap<String, Value> =
            serde_json::from_str(text).map_err(|e| PlaybackError::Manifest(e.to_string()))?;

        let mut entries = BTreeMap::new();
        let mut skipped = 0;
        for (url, value) in document {
            match serde_json::from_value::<CacheRecord>(value) {
                Ok(mut record) if record.is_restorable() => {
                    if record.original_url.is_empty() {
                        record.original_url = url.clone();
                    }
                    if record.cached_path.is_none() {
                        record.legacy = true;
                    }
                    entries.insert(url, record);
                }
                Ok(_) => {
                    warn!(url = %redact_url(&url), "Manifest entry has no cached path");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(url = %redact_url(&url), error = %e, "Malformed manifest entry");
                    skipped += 1;
                }
            }
        }

        Ok((Self { entries }, skipped))
    }
}
