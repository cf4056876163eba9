//! Cache configuration

use std::path::{Component, Path};

/// Configuration for the cache index and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory for cached payloads, relative to the data directory
    /// (default: `cache/videos`)
    pub cache_directory: String,

    /// Durable manifest file, relative to the data directory
    /// (default: `cachedVideoUrls.json`)
    pub manifest_file: String,

    /// Fast-store key prefix for cache records (default: `video-cached-`)
    pub key_prefix: String,

    /// Extension used when the URL path has none (default: `mp4`)
    pub default_extension: String,

    /// Delete the previous copy after a URL is cached again (default: true)
    pub remove_superseded_files: bool,

    /// Check that the cached file exists on every lookup (default: true)
    pub verify_on_lookup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_directory: "cache/videos".to_string(),
            manifest_file: "cachedVideoUrls.json".to_string(),
            key_prefix: "video-cached-".to_string(),
            default_extension: "mp4".to_string(),
            remove_superseded_files: true,
            verify_on_lookup: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache directory.
    pub fn with_cache_directory(mut self, dir: impl Into<String>) -> Self {
        self.cache_directory = dir.into();
        self
    }

    /// Set manifest file name.
    pub fn with_manifest_file(mut self, file: impl Into<String>) -> Self {
        self.manifest_file = file.into();
        self
    }

    /// Set fast-store key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set fallback file extension.
    pub fn with_default_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_extension = ext.into();
        self
    }

    /// Enable or disable deleting superseded copies.
    pub fn with_remove_superseded_files(mut self, enabled: bool) -> Self {
        self.remove_superseded_files = enabled;
        self
    }

    /// Enable or disable file verification on lookup.
    pub fn with_verify_on_lookup(mut self, enabled: bool) -> Self {
        self.verify_on_lookup = enabled;
        self
    }

    /// Fast-store key holding the record for `url`.
    pub fn key_for(&self, url: &str) -> String {
        format!("{}{}", self.key_prefix, url)
    }

    /// URL encoded in a fast-store key, if the key is a cache record key.
    pub fn url_for_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.key_prefix.as_str())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_directory.trim().is_empty() {
            return Err("cache_directory cannot be empty".to_string());
        }

        if self.manifest_file.trim().is_empty() {
            return Err("manifest_file cannot be empty".to_string());
        }

        if self.key_prefix.is_empty() {
            return Err("key_prefix cannot be empty".to_string());
        }

        if self.default_extension.is_empty()
            || !self.default_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err("default_extension must be alphanumeric".to_string());
        }

        if !stays_inside(&self.cache_directory) {
            return Err("cache_directory must stay inside the data directory".to_string());
        }

        if !stays_inside(&self.manifest_file) {
            return Err("manifest_file must stay inside the data directory".to_string());
        }

        Ok(())
    }
}

/// A relative path naming something below the data directory, never the
/// data directory itself.
fn stays_inside(relative: &str) -> bool {
    let path = Path::new(relative);
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_directory, "cache/videos");
        assert_eq!(config.manifest_file, "cachedVideoUrls.json");
        assert_eq!(config.key_prefix, "video-cached-");
        assert!(config.remove_superseded_files);
        assert!(config.verify_on_lookup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_cache_directory("videos")
            .with_manifest_file("manifest.json")
            .with_remove_superseded_files(false)
            .with_verify_on_lookup(false);

        assert_eq!(config.cache_directory, "videos");
        assert_eq!(config.manifest_file, "manifest.json");
        assert!(!config.remove_superseded_files);
        assert!(!config.verify_on_lookup);
    }

    #[test]
    fn test_keys() {
        let config = CacheConfig::default();
        let key = config.key_for("http://a/1.mp4");
        assert_eq!(key, "video-cached-http://a/1.mp4");
        assert_eq!(config.url_for_key(&key), Some("http://a/1.mp4"));
        assert_eq!(config.url_for_key("last-playlist-input"), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default()
            .with_cache_directory("")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_manifest_file(" ")
            .validate()
            .is_err());
        assert!(CacheConfig::default().with_key_prefix("").validate().is_err());
        assert!(CacheConfig::default()
            .with_default_extension("m.p4")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_manifest_file("../outside.json")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_cache_directory("/abs/videos")
            .validate()
            .is_err());
    }

    #[test]
    fn test_cache_directory_must_be_below_data_dir() {
        for dir in [".", "./", "./."] {
            let err = CacheConfig::default()
                .with_cache_directory(dir)
                .validate()
                .unwrap_err();
            assert!(err.contains("cache_directory"), "{dir}: {err}");
        }
        assert!(CacheConfig::default()
            .with_manifest_file(".")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_cache_directory("./videos")
            .validate()
            .is_ok());
    }
}
