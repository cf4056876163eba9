//! Workspace façade crate.
//!
//! Exposes feature flags that map onto the individual workspace crates so a
//! host application can depend on `vidcache-workspace` alone. `desktop-shims`
//! pulls in the full `core-service` controller with desktop bridges, while
//! `core-only` exposes just the cache and playback core.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "core-only")]
pub use core_playback as playback;
