//! In-memory capability fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{MediaEvent, MediaEventStream, MediaSink, MediaSource};
use bridge_traits::storage::{FileSystemAccess, KeyValueStore};
use bridge_traits::time::ManualClock;
use bytes::Bytes;
use core_playback::{CacheConfig, CacheIndex, CacheWriter, PlaybackCursor};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

pub const DATA_DIR: &str = "/mem";

fn not_found(path: &Path) -> BridgeError {
    BridgeError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

// ============================================================================
// File store
// ============================================================================

#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Bytes>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    broken: Mutex<BTreeSet<PathBuf>>,
    protected: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(relative: &str) -> PathBuf {
        Path::new(DATA_DIR).join(relative)
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: &'static [u8]) {
        self.files
            .lock()
            .insert(path.into(), Bytes::from_static(data));
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    pub fn read(&self, path: &Path) -> Option<Bytes> {
        self.files.lock().get(path).cloned()
    }

    /// Delete a file behind the index's back.
    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    /// Make `exists` fail for `path` with a non-NotFound error.
    pub fn break_path(&self, path: impl Into<PathBuf>) {
        self.broken.lock().insert(path.into());
    }

    /// Make `delete_file` fail for `path`.
    pub fn protect(&self, path: impl Into<PathBuf>) {
        self.protected.lock().insert(path.into());
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(DATA_DIR))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        if self.broken.lock().contains(path) {
            return Err(BridgeError::OperationFailed("storage offline".into()));
        }
        Ok(self.files.lock().contains_key(path) || self.dirs.lock().contains(path))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.lock();
        for ancestor in path.ancestors() {
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        self.read(path).ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.files.lock().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.lock();
        let data = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        if self.protected.lock().contains(path) {
            return Err(BridgeError::OperationFailed("permission denied".into()));
        }
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.dirs.lock().contains(path) {
            return Err(not_found(path));
        }
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Fast store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.lock().keys().cloned().collect())
    }
}

// ============================================================================
// Network
// ============================================================================

/// HTTP client answering from a fixed script. Unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    bodies: HashMap<String, Bytes>,
    failing: HashSet<String>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: &'static [u8]) -> Self {
        self.bodies
            .insert(url.to_string(), Bytes::from_static(body));
        self
    }

    /// Fail `url` with a connection error.
    pub fn fail(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Hold every request until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.url.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.failing.contains(&request.url) {
            return Err(BridgeError::OperationFailed("connection refused".into()));
        }

        Ok(match self.bodies.get(&request.url) {
            Some(body) => HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: body.clone(),
            },
            None => HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            },
        })
    }
}

// ============================================================================
// Media sink
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    SetSource(MediaSource),
    Play,
    Pause,
    Stop,
}

pub struct RecordingMediaSink {
    calls: Mutex<Vec<SinkCall>>,
    paused: Mutex<bool>,
    rejected: Mutex<HashSet<String>>,
    generation: Mutex<u64>,
    events: broadcast::Sender<MediaEvent>,
}

impl RecordingMediaSink {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            calls: Mutex::new(Vec::new()),
            paused: Mutex::new(true),
            rejected: Mutex::new(HashSet::new()),
            generation: Mutex::new(0),
            events,
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn sources(&self) -> Vec<MediaSource> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::SetSource(source) => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fail `set_source` for sources with this locator.
    pub fn reject(&self, locator: &str) {
        self.rejected.lock().insert(locator.to_string());
    }

    /// Generation returned by the last accepted `set_source`.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    pub fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for RecordingMediaSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSink for RecordingMediaSink {
    async fn set_source(&self, source: MediaSource) -> Result<u64> {
        self.calls.lock().push(SinkCall::SetSource(source.clone()));
        if self.rejected.lock().contains(&source.locator()) {
            return Err(BridgeError::OperationFailed("unsupported media".into()));
        }
        *self.paused.lock() = true;
        let mut generation = self.generation.lock();
        *generation += 1;
        Ok(*generation)
    }

    async fn play(&self) -> Result<()> {
        self.calls.lock().push(SinkCall::Play);
        *self.paused.lock() = false;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.calls.lock().push(SinkCall::Pause);
        *self.paused.lock() = true;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.calls.lock().push(SinkCall::Stop);
        *self.paused.lock() = true;
        Ok(())
    }

    async fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    async fn subscribe_events(&self) -> Result<Box<dyn MediaEventStream>> {
        Ok(Box::new(RecordedEvents(self.events.subscribe())))
    }
}

struct RecordedEvents(broadcast::Receiver<MediaEvent>);

#[async_trait]
impl MediaEventStream for RecordedEvents {
    async fn next(&mut self) -> Option<MediaEvent> {
        self.0.recv().await.ok()
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn local(relative: &str) -> MediaSource {
    MediaSource::LocalFile {
        path: MemoryFileSystem::path(relative),
    }
}

pub fn remote(url: &str) -> MediaSource {
    MediaSource::RemoteStream {
        url: url.to_string(),
    }
}

/// Every component wired to the same fakes.
pub struct Harness {
    pub fs: Arc<MemoryFileSystem>,
    pub store: Arc<MemoryStore>,
    pub http: Arc<ScriptedHttpClient>,
    pub sink: Arc<RecordingMediaSink>,
    pub bus: EventBus,
    pub index: Arc<CacheIndex>,
    pub writer: CacheWriter,
    pub cursor: PlaybackCursor,
}

impl Harness {
    pub fn new(http: ScriptedHttpClient) -> Self {
        Self::with_parts(
            Arc::new(MemoryFileSystem::new()),
            Arc::new(MemoryStore::new()),
            http,
            CacheConfig::default(),
        )
    }

    pub fn with_parts(
        fs: Arc<MemoryFileSystem>,
        store: Arc<MemoryStore>,
        http: ScriptedHttpClient,
        config: CacheConfig,
    ) -> Self {
        let http = Arc::new(http);
        let sink = Arc::new(RecordingMediaSink::new());
        let bus = EventBus::new(64);
        let index = Arc::new(
            CacheIndex::new(
                store.clone(),
                fs.clone(),
                Arc::new(ManualClock::starting_at(1_700_000_000_000)),
                config,
            )
            .with_event_bus(bus.clone()),
        );
        let writer = CacheWriter::new(index.clone(), http.clone());
        let cursor = PlaybackCursor::new(index.clone(), sink.clone()).with_event_bus(bus.clone());

        Self {
            fs,
            store,
            http,
            sink,
            bus,
            index,
            writer,
            cursor,
        }
    }

    /// Absolute path of the cached copy of `url`.
    pub async fn cached_file(&self, url: &str) -> Option<PathBuf> {
        let record = self.index.get(url).await.ok()??;
        Some(MemoryFileSystem::path(record.cached_path.as_deref()?))
    }
}
