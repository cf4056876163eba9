//! Player service tests over the desktop file store in a temp directory.

use async_trait::async_trait;
use bridge_desktop::{BroadcastMediaEvents, MemoryKeyValueStore, TokioFileSystem};
use bridge_traits::background::LifecycleState;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{MediaEvent, MediaEventStream, MediaSink, MediaSource};
use bridge_traits::storage::{KeyValueStore, UnsupportedFileSystem};
use bridge_traits::time::ManualClock;
use bytes::Bytes;
use core_playback::PlaybackError;
use core_runtime::config::AppConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent};
use core_service::{
    CacheConfig, CacheStatus, CoreError, PlaybackPhase, PlayerService, Transition,
    LAST_INPUT_KEY,
};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

const A: &str = "http://videos.test/a.mp4";
const B: &str = "http://videos.test/b.mp4";

mock! {
    Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

/// Serves `A` and answers 500 for everything else.
fn http_serving_a() -> MockHttp {
    let mut http = MockHttp::new();
    http.expect_execute().returning(|request| {
        let (status, body) = if request.url == A {
            (200, Bytes::from_static(b"video-a"))
        } else {
            (500, Bytes::new())
        };
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    });
    http
}

struct FakeSink {
    sources: Mutex<Vec<MediaSource>>,
    paused: Mutex<bool>,
    generation: Mutex<u64>,
    events: broadcast::Sender<MediaEvent>,
}

impl FakeSink {
    fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            sources: Mutex::new(Vec::new()),
            paused: Mutex::new(true),
            generation: Mutex::new(0),
            events,
        }
    }

    fn sources(&self) -> Vec<MediaSource> {
        self.sources.lock().clone()
    }

    fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl MediaSink for FakeSink {
    async fn set_source(&self, source: MediaSource) -> BridgeResult<u64> {
        self.sources.lock().push(source);
        let mut generation = self.generation.lock();
        *generation += 1;
        Ok(*generation)
    }

    async fn play(&self) -> BridgeResult<()> {
        *self.paused.lock() = false;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        *self.paused.lock() = true;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        *self.paused.lock() = true;
        Ok(())
    }

    async fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    async fn subscribe_events(&self) -> BridgeResult<Box<dyn MediaEventStream>> {
        Ok(Box::new(BroadcastMediaEvents::new(self.events.subscribe())))
    }
}

struct Fixture {
    service: PlayerService,
    sink: Arc<FakeSink>,
    store: Arc<MemoryKeyValueStore>,
}

fn service_in(dir: &Path, http: MockHttp) -> Fixture {
    let sink = Arc::new(FakeSink::new());
    let store = Arc::new(MemoryKeyValueStore::new());
    let config = AppConfig::builder()
        .file_system(Arc::new(TokioFileSystem::with_data_directory(dir)))
        .key_value_store(store.clone())
        .http_client(Arc::new(http))
        .media_sink(sink.clone())
        .clock(Arc::new(ManualClock::starting_at(1_700_000_000_000)))
        .build()
        .unwrap();
    let service = PlayerService::new(&config, CacheConfig::default()).unwrap();
    Fixture {
        service,
        sink,
        store,
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<CoreEvent>,
    wanted: impl Fn(&CoreEvent) -> bool,
) -> CoreEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not observed")
}

#[tokio::test]
async fn test_load_playlist_remembers_input() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), MockHttp::new());

    let input = format!("[\"{A}\", \"{B}\"]");
    assert_eq!(f.service.load_playlist(&input).await.unwrap(), 2);
    let playlist = f.service.playlist().await;
    assert_eq!(playlist.urls().collect::<Vec<_>>(), vec![A, B]);
    assert_eq!(f.service.last_input().await.unwrap(), Some(input.clone()));
    assert_eq!(f.store.get(LAST_INPUT_KEY).await.unwrap(), Some(input));
}

#[tokio::test]
async fn test_invalid_playlist_keeps_previous_one() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), MockHttp::new());
    f.service.load_playlist(A).await.unwrap();

    let err = f.service.load_playlist("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::Playback(PlaybackError::Parse(_))));
    let playlist = f.service.playlist().await;
    assert_eq!(playlist.urls().collect::<Vec<_>>(), vec![A]);
    assert_eq!(f.service.last_input().await.unwrap().as_deref(), Some(A));
}

#[tokio::test]
async fn test_commands_without_playlist() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), MockHttp::new());

    assert!(matches!(
        f.service.cache_all().await,
        Err(CoreError::EmptyPlaylist)
    ));
    assert!(matches!(f.service.start().await, Err(CoreError::EmptyPlaylist)));
    assert!(!f.service.can_start().await);
    assert!(f.service.refresh_status().await.is_empty());
}

#[tokio::test]
async fn test_cache_all_then_play_cached_copy() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.initialize().await;
    f.service.load_playlist(&format!("{A}\n{B}\n")).await.unwrap();

    let report = f.service.cache_all().await.unwrap();
    assert_eq!(report.succeeded, vec![0]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.manifest_saved);
    assert!(dir.path().join("cachedVideoUrls.json").exists());

    let statuses = f.service.refresh_status().await;
    assert_eq!(statuses[0].status, CacheStatus::Cached);
    assert_eq!(statuses[1].status, CacheStatus::NotCached);

    assert!(f.service.can_start().await);
    let transition = f.service.start().await.unwrap();
    match transition {
        Transition::Playing {
            index: 0,
            source: MediaSource::LocalFile { path },
        } => {
            assert!(path.starts_with(dir.path().join("cache/videos")));
            assert_eq!(std::fs::read(path).unwrap(), b"video-a");
        }
        other => panic!("unexpected transition: {other:?}"),
    }
    assert_eq!(f.service.playback_state().await.phase(), PlaybackPhase::Playing);
}

#[tokio::test]
async fn test_media_events_drive_cursor_to_completion() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.load_playlist(&format!("{A}\n{B}")).await.unwrap();
    f.service.cache_all().await.unwrap();
    f.service.spawn_event_loops().await.unwrap();
    let mut events = f.service.subscribe();

    f.service.start().await.unwrap();

    f.sink.emit(MediaEvent::Ended {
        generation: f.sink.generation(),
    });
    let started = wait_for(&mut events, |e| {
        matches!(e, CoreEvent::Playback(PlaybackEvent::Started { index: 1, .. }))
    })
    .await;
    assert_eq!(
        started,
        CoreEvent::Playback(PlaybackEvent::Started {
            index: 1,
            url: B.to_string(),
            local: false
        })
    );

    f.sink.emit(MediaEvent::Error {
        generation: f.sink.generation(),
        message: "stream dropped".to_string(),
    });
    wait_for(&mut events, |e| {
        *e == CoreEvent::Playback(PlaybackEvent::PlaylistCompleted)
    })
    .await;

    let state = f.service.playback_state().await;
    assert_eq!(state.phase(), PlaybackPhase::Stopped);
    assert_eq!(state.cursor(), Some(2));
    assert_eq!(
        f.sink.sources()[1],
        MediaSource::RemoteStream { url: B.to_string() }
    );

    f.service.shutdown().await;
}

#[tokio::test]
async fn test_event_from_previous_run_is_ignored_after_restart() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.load_playlist(&format!("{A}\n{B}")).await.unwrap();
    f.service.cache_all().await.unwrap();

    f.service.start().await.unwrap();
    let previous = f.sink.generation();
    f.service.stop().await.unwrap();
    f.service.start().await.unwrap();

    let transition = f
        .service
        .handle_media_event(MediaEvent::Ended {
            generation: previous,
        })
        .await
        .unwrap();
    assert_eq!(transition, Transition::Ignored);
    let state = f.service.playback_state().await;
    assert_eq!(state.phase(), PlaybackPhase::Playing);
    assert_eq!(state.cursor(), Some(0));

    let transition = f
        .service
        .handle_media_event(MediaEvent::Ended {
            generation: f.sink.generation(),
        })
        .await
        .unwrap();
    assert!(matches!(transition, Transition::Playing { index: 1, .. }));
}

#[tokio::test]
async fn test_background_checkpoints_and_foreground_resumes() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.load_playlist(A).await.unwrap();
    f.service.cache_all().await.unwrap();
    std::fs::remove_file(dir.path().join("cachedVideoUrls.json")).unwrap();
    f.service.start().await.unwrap();

    let outcome = f.service.handle_lifecycle(LifecycleState::Background).await;
    assert!(outcome.manifest_saved);
    assert!(outcome.paused);
    assert!(dir.path().join("cachedVideoUrls.json").exists());
    assert!(f.sink.is_paused().await);

    let outcome = f.service.handle_lifecycle(LifecycleState::Foreground).await;
    assert!(outcome.resumed);
    assert!(!f.sink.is_paused().await);
}

#[tokio::test]
async fn test_manifest_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let first = service_in(dir.path(), http_serving_a());
        first.service.load_playlist(A).await.unwrap();
        first.service.cache_all().await.unwrap();
    }

    // Fresh fast store, same data directory
    let second = service_in(dir.path(), MockHttp::new());
    let report = second.service.initialize().await;
    assert_eq!(report.restored, 1);
    assert_eq!(report.dropped, 0);

    second.service.load_playlist(A).await.unwrap();
    assert_eq!(
        second.service.refresh_status().await[0].status,
        CacheStatus::Cached
    );
}

#[tokio::test]
async fn test_clear_cache_removes_files_and_records() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.initialize().await;
    f.service.load_playlist(A).await.unwrap();
    f.service.cache_all().await.unwrap();

    let report = f.service.clear_cache().await.unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(report.files_deleted, 1);
    assert!(report.manifest_removed);

    let remaining = std::fs::read_dir(dir.path().join("cache/videos"))
        .unwrap()
        .count();
    assert_eq!(remaining, 0);
    assert_eq!(
        f.service.refresh_status().await[0].status,
        CacheStatus::NotCached
    );
    assert!(!f.service.can_start().await);
}

#[tokio::test]
async fn test_loading_new_playlist_stops_playback() {
    let dir = TempDir::new().unwrap();
    let f = service_in(dir.path(), http_serving_a());
    f.service.load_playlist(A).await.unwrap();
    f.service.cache_all().await.unwrap();
    f.service.start().await.unwrap();

    f.service.load_playlist(B).await.unwrap();

    let state = f.service.playback_state().await;
    assert_eq!(state.phase(), PlaybackPhase::Idle);
    assert_eq!(state.cursor(), None);
    assert!(f.sink.is_paused().await);
}

#[tokio::test]
async fn test_stream_only_host() {
    let sink = Arc::new(FakeSink::new());
    let config = AppConfig::builder()
        .file_system(Arc::new(UnsupportedFileSystem))
        .key_value_store(Arc::new(MemoryKeyValueStore::new()))
        .http_client(Arc::new(MockHttp::new()))
        .media_sink(sink.clone())
        .build()
        .unwrap();
    let service = PlayerService::new(&config, CacheConfig::default()).unwrap();
    assert!(!service.caching_supported());

    let report = service.initialize().await;
    assert_eq!(report.restored, 0);

    service.load_playlist(A).await.unwrap();
    assert!(matches!(
        service.cache_all().await,
        Err(CoreError::Playback(PlaybackError::CapabilityUnavailable(_)))
    ));
    assert!(service.can_start().await);
    assert_eq!(
        service.start().await.unwrap(),
        Transition::Playing {
            index: 0,
            source: MediaSource::RemoteStream { url: A.to_string() }
        }
    );

    let outcome = service.handle_lifecycle(LifecycleState::Background).await;
    assert!(!outcome.manifest_saved);
    assert!(outcome.paused);
}

#[tokio::test]
async fn test_invalid_cache_config_is_rejected() {
    let config = AppConfig::builder()
        .file_system(Arc::new(UnsupportedFileSystem))
        .key_value_store(Arc::new(MemoryKeyValueStore::new()))
        .http_client(Arc::new(MockHttp::new()))
        .media_sink(Arc::new(FakeSink::new()))
        .build()
        .unwrap();

    let result = PlayerService::new(
        &config,
        CacheConfig::default().with_cache_directory("../outside"),
    );
    assert!(matches!(result, Err(CoreError::Config(_))));
}
