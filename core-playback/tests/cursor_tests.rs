//! Playback cursor tests.

mod common;

use bridge_traits::media::MediaEvent;
use bridge_traits::storage::UnsupportedFileSystem;
use bridge_traits::time::ManualClock;
use common::{local, remote, Harness, MemoryStore, RecordingMediaSink, ScriptedHttpClient, SinkCall};
use core_playback::{
    CacheConfig, CacheIndex, PlaybackCursor, PlaybackError, PlaybackPhase, PlayerSession, Playlist,
    Transition,
};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::sync::Arc;

const A: &str = "http://a/1.mp4";
const B: &str = "http://a/2.mp4";
const C: &str = "http://a/3.mp4";

fn serving_all() -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .serve(A, b"aaaa")
        .serve(B, b"bbbb")
        .serve(C, b"cccc")
}

async fn cache(harness: &Harness, urls: &[(&str, usize)]) {
    for (url, index) in urls {
        harness.writer.cache_one(url, *index).await.unwrap();
    }
}

async fn relative_path(harness: &Harness, url: &str) -> String {
    harness
        .index
        .get(url)
        .await
        .unwrap()
        .and_then(|record| record.cached_path)
        .unwrap()
}

fn session(urls: &[&str]) -> PlayerSession {
    PlayerSession::new(Playlist::from_urls(urls.iter().copied()))
}

#[tokio::test]
async fn test_start_selects_lowest_cached_index() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(B, 1), (C, 2)]).await;
    let mut session = session(&[A, B, C]);

    let transition = harness.cursor.start(&mut session).await.unwrap();

    let expected = local(&relative_path(&harness, B).await);
    assert_eq!(
        transition,
        Transition::Playing {
            index: 1,
            source: expected.clone()
        }
    );
    assert_eq!(session.state().phase(), PlaybackPhase::Playing);
    assert_eq!(session.state().cursor(), Some(1));
    assert_eq!(
        harness.sink.calls(),
        vec![SinkCall::SetSource(expected), SinkCall::Play]
    );
}

#[tokio::test]
async fn test_natural_end_advances_until_completion() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0), (C, 2)]).await;
    let mut session = session(&[A, B, C]);

    harness.cursor.start(&mut session).await.unwrap();
    let mut cursors = vec![session.state().cursor().unwrap()];

    loop {
        match harness.cursor.on_ended(&mut session).await.unwrap() {
            Transition::Playing { index, .. } => {
                assert!(index > *cursors.last().unwrap());
                cursors.push(index);
            }
            Transition::Completed => break,
            Transition::Ignored => panic!("advance ignored while playing"),
        }
    }

    assert_eq!(cursors, vec![0, 1, 2]);
    assert_eq!(session.state().phase(), PlaybackPhase::Stopped);
    assert_eq!(session.state().cursor(), Some(3));

    // Uncached middle entry is streamed
    let sources = harness.sink.sources();
    assert_eq!(sources[1], remote(B));
    assert!(!sources[0].is_remote());
    assert!(!sources[2].is_remote());

    // Nothing moves after completion
    harness.sink.clear_calls();
    assert_eq!(
        harness.cursor.on_ended(&mut session).await.unwrap(),
        Transition::Ignored
    );
    assert!(harness.sink.calls().is_empty());
}

#[tokio::test]
async fn test_broken_cache_entry_falls_back_to_next() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0), (B, 1)]).await;
    let missing = common::MemoryFileSystem::path(&relative_path(&harness, A).await);
    harness.fs.remove(&missing);
    let mut session = session(&[A, B]);

    let transition = harness.cursor.start(&mut session).await.unwrap();

    assert!(matches!(transition, Transition::Playing { index: 1, .. }));
    assert!(harness.index.get(A).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unresolvable_cached_file_skips_entry() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0), (B, 1)]).await;
    let broken = common::MemoryFileSystem::path(&relative_path(&harness, A).await);
    harness.fs.break_path(broken);
    let mut events = harness.bus.subscribe();
    let mut session = session(&[A, B]);

    let transition = harness.cursor.start(&mut session).await.unwrap();

    assert!(matches!(transition, Transition::Playing { index: 1, .. }));
    match events.recv().await.unwrap() {
        CoreEvent::Playback(PlaybackEvent::EntrySkipped { index, url, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(url, A);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Playback(PlaybackEvent::Started {
            index: 1,
            url: B.to_string(),
            local: true
        })
    );
}

#[tokio::test]
async fn test_legacy_entry_without_location_is_skipped() {
    let harness = Harness::new(serving_all());
    harness.store.insert_raw("video-cached-http://a/1.mp4", "true");
    cache(&harness, &[(B, 1)]).await;
    let mut session = session(&[A, B]);

    let transition = harness.cursor.start(&mut session).await.unwrap();
    assert!(matches!(transition, Transition::Playing { index: 1, .. }));
}

#[tokio::test]
async fn test_rejected_source_skips_entry() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0)]).await;
    harness.sink.reject(&local(&relative_path(&harness, A).await).locator());
    let mut session = session(&[A, B]);

    let transition = harness.cursor.start(&mut session).await.unwrap();
    assert_eq!(
        transition,
        Transition::Playing {
            index: 1,
            source: remote(B)
        }
    );
}

#[tokio::test]
async fn test_start_with_nothing_cached() {
    let harness = Harness::new(serving_all());
    let mut session = session(&[A, B]);

    let err = harness.cursor.start(&mut session).await.unwrap_err();
    assert!(matches!(err, PlaybackError::NothingToPlay));
    assert_eq!(session.state().phase(), PlaybackPhase::Idle);
    assert!(harness.sink.calls().is_empty());

    let mut empty = PlayerSession::default();
    assert!(matches!(
        harness.cursor.start(&mut empty).await,
        Err(PlaybackError::NothingToPlay)
    ));
}

#[tokio::test]
async fn test_select_only_while_playing() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0)]).await;
    let mut session = session(&[A, B, C]);

    assert_eq!(
        harness.cursor.select(&mut session, 2).await.unwrap(),
        Transition::Ignored
    );
    assert!(harness.sink.calls().is_empty());
    assert_eq!(session.state().phase(), PlaybackPhase::Idle);

    harness.cursor.start(&mut session).await.unwrap();
    let transition = harness.cursor.select(&mut session, 2).await.unwrap();
    assert_eq!(
        transition,
        Transition::Playing {
            index: 2,
            source: remote(C)
        }
    );
    assert_eq!(session.state().cursor(), Some(2));

    assert!(matches!(
        harness.cursor.select(&mut session, 3).await,
        Err(PlaybackError::InvalidIndex { index: 3, len: 3 })
    ));
}

#[tokio::test]
async fn test_stop_is_idempotent_and_blocks_late_advance() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0)]).await;
    let mut session = session(&[A, B]);
    let mut events = harness.bus.subscribe();

    harness.cursor.start(&mut session).await.unwrap();
    harness.cursor.stop(&mut session).await.unwrap();
    harness.cursor.stop(&mut session).await.unwrap();
    assert_eq!(session.state().phase(), PlaybackPhase::Stopped);

    harness.sink.clear_calls();
    assert_eq!(
        harness.cursor.on_ended(&mut session).await.unwrap(),
        Transition::Ignored
    );
    assert_eq!(
        harness.cursor.on_error(&mut session, "late").await.unwrap(),
        Transition::Ignored
    );
    assert!(harness.sink.calls().is_empty());

    let mut stopped = 0;
    while let Ok(event) = events.try_recv() {
        if event == CoreEvent::Playback(PlaybackEvent::Stopped) {
            stopped += 1;
        }
    }
    assert_eq!(stopped, 1);
}

#[tokio::test]
async fn test_event_for_replaced_source_is_ignored() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0), (B, 1), (C, 2)]).await;
    let mut session = session(&[A, B, C]);

    harness.cursor.start(&mut session).await.unwrap();
    let replaced = harness.sink.generation();
    harness.cursor.select(&mut session, 2).await.unwrap();
    assert_eq!(session.state().generation(), Some(harness.sink.generation()));

    let transition = harness
        .cursor
        .on_media_event(&mut session, MediaEvent::Ended { generation: replaced })
        .await
        .unwrap();
    assert_eq!(transition, Transition::Ignored);
    assert_eq!(session.state().cursor(), Some(2));

    let transition = harness
        .cursor
        .on_media_event(
            &mut session,
            MediaEvent::Error {
                generation: harness.sink.generation(),
                message: "decoder failure".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(transition, Transition::Completed);
    assert_eq!(session.state().generation(), None);
}

#[tokio::test]
async fn test_media_error_advances() {
    let harness = Harness::new(serving_all());
    cache(&harness, &[(A, 0), (B, 1)]).await;
    let mut session = session(&[A, B]);

    harness.cursor.start(&mut session).await.unwrap();
    let transition = harness
        .cursor
        .on_error(&mut session, "decoder failure")
        .await
        .unwrap();
    assert!(matches!(transition, Transition::Playing { index: 1, .. }));

    let transition = harness
        .cursor
        .on_error(&mut session, "decoder failure")
        .await
        .unwrap();
    assert_eq!(transition, Transition::Completed);
    assert_eq!(harness.sink.calls().last(), Some(&SinkCall::Stop));
}

#[tokio::test]
async fn test_stream_only_platform_plays_from_network() {
    let index = Arc::new(CacheIndex::new(
        Arc::new(MemoryStore::new()),
        Arc::new(UnsupportedFileSystem),
        Arc::new(ManualClock::default()),
        CacheConfig::default(),
    ));
    let sink = Arc::new(RecordingMediaSink::new());
    let cursor = PlaybackCursor::new(index, sink.clone());
    let mut session = session(&[A, B]);

    let transition = cursor.start(&mut session).await.unwrap();
    assert_eq!(
        transition,
        Transition::Playing {
            index: 0,
            source: remote(A)
        }
    );

    let transition = cursor.on_ended(&mut session).await.unwrap();
    assert_eq!(
        transition,
        Transition::Playing {
            index: 1,
            source: remote(B)
        }
    );
}
