//! # Video Cache Module
//!
//! Tracks which playlist URLs have a local copy and writes new copies.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     CacheWriter                        │
//! │  - cache_one()                         │
//! │  - cache_all()   (sequential, guarded) │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> HttpClient (whole-body fetch)
//!          └──> CacheIndex
//!                 ├──> KeyValueStore  (fast store, authoritative)
//!                 └──> FileSystemAccess (payloads + durable manifest)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, CacheIndex, CacheWriter};
//!
//! let index = Arc::new(CacheIndex::new(store, fs, clock, CacheConfig::default()));
//! index.initialize().await?;
//! index.rehydrate().await?;
//!
//! let writer = CacheWriter::new(index.clone(), http);
//! let report = writer.cache_all(playlist.entries()).await?;
//! assert!(index.is_cached("https://cdn.example.com/intro.mp4").await?);
//! ```

pub mod config;
pub mod index;
pub mod manifest;
pub mod record;
pub mod writer;

pub use config::CacheConfig;
pub use index::{CacheIndex, ClearReport, RehydrateReport};
pub use manifest::Manifest;
pub use record::CacheRecord;
pub use writer::{CacheReport, CacheWriter};
