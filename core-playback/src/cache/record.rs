//! Cache records

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing where one URL is cached.
///
/// Records without a `cached_path` come from older manifests that only
/// remembered *that* a URL was cached. They still count as cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    #[serde(default)]
    pub original_url: String,

    /// Path relative to the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_path: Option<String>,

    /// Epoch milliseconds of caching.
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy: bool,
}

impl CacheRecord {
    pub fn new(url: impl Into<String>, cached_path: impl Into<String>, timestamp: i64) -> Self {
        Self {
            original_url: url.into(),
            cached_path: Some(cached_path.into()),
            timestamp,
            legacy: false,
        }
    }

    /// Record for a URL cached at an unknown location.
    pub fn legacy(url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            original_url: url.into(),
            cached_path: None,
            timestamp,
            legacy: true,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.cached_path.is_none()
    }

    /// Whether a manifest entry carries enough to be restored.
    pub fn is_restorable(&self) -> bool {
        self.cached_path.is_some() || self.legacy
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Decode a fast-store value.
    ///
    /// Older stores hold the bare value `true`, read as a legacy record
    /// stamped `now`. Returns `None` for anything unparseable.
    pub fn from_store_value(url: &str, value: &str, now: i64) -> Option<Self> {
        if value.trim() == "true" {
            return Some(Self::legacy(url, now));
        }

        let mut record: CacheRecord = serde_json::from_str(value).ok()?;
        if record.original_url.is_empty() {
            record.original_url = url.to_string();
        }
        if record.cached_path.is_none() {
            record.legacy = true;
        }
        Some(record)
    }

    pub fn to_store_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
