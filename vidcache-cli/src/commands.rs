use anyhow::{bail, Context, Result};
use bridge_desktop::ChannelLifecycleObserver;
use bridge_traits::background::LifecycleState;
use core_runtime::events::{CoreEvent, PlaybackEvent};
use core_service::{CacheStatus, PlayerService, Transition};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Reload the playlist remembered by the last `load`.
async fn restore_playlist(service: &PlayerService) -> Result<usize> {
    let Some(input) = service.last_input().await? else {
        bail!("No playlist loaded; run `vidcache load <file>` first");
    };
    Ok(service.load_playlist(&input).await?)
}

pub async fn load(service: &PlayerService, input: &Path) -> Result<()> {
    let text = if input == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read playlist from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let count = service.load_playlist(&text).await?;
    println!("Loaded {} video URL(s)", count);
    Ok(())
}

pub async fn cache(service: &PlayerService) -> Result<()> {
    restore_playlist(service).await?;
    if !service.caching_supported() {
        bail!("Caching is not supported on this platform; videos will be streamed");
    }

    let report = match service.cache_all().await {
        Ok(report) => report,
        Err(e) if e.is_busy() => bail!("A caching run is already in progress"),
        Err(e) => return Err(e.into()),
    };

    let playlist = service.playlist().await;
    for index in &report.succeeded {
        if let Some(entry) = playlist.get(*index) {
            println!("cached   [{}] {}", index, entry.url);
        }
    }
    for (index, reason) in &report.failed {
        if let Some(entry) = playlist.get(*index) {
            println!("failed   [{}] {} ({})", index, entry.url, reason);
        }
    }
    println!(
        "{} of {} cached{}",
        report.succeeded.len(),
        report.attempted(),
        if report.manifest_saved {
            ""
        } else {
            "; cache status could not be saved"
        }
    );
    Ok(())
}

pub async fn status(service: &PlayerService, json: bool) -> Result<()> {
    restore_playlist(service).await?;
    let statuses = service.refresh_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for entry in &statuses {
        let label = match &entry.status {
            CacheStatus::Cached => "cached".to_string(),
            CacheStatus::NotCached => "remote".to_string(),
            CacheStatus::Error(message) => format!("error: {}", message),
        };
        println!("[{}] {:<8} {}", entry.index, label, entry.url);
    }
    Ok(())
}

pub async fn clear(service: &PlayerService) -> Result<()> {
    let report = service.clear_cache().await?;
    println!(
        "Removed {} record(s) and {} file(s)",
        report.records, report.files_deleted
    );
    if report.files_failed > 0 {
        println!("{} file(s) could not be deleted", report.files_failed);
    }
    Ok(())
}

pub async fn play(
    service: &PlayerService,
    observer: Arc<ChannelLifecycleObserver>,
    from: Option<usize>,
) -> Result<()> {
    restore_playlist(service).await?;
    if !service.can_start().await {
        bail!("No cached videos available; run `vidcache cache` first");
    }

    let mut events = service.subscribe();
    service.spawn_event_loops().await?;

    #[cfg(unix)]
    let signals = tokio::spawn(forward_lifecycle_signals(observer));
    #[cfg(not(unix))]
    drop(observer);

    service.start().await?;
    if let Some(index) = from {
        if let Transition::Ignored = service.select(index).await? {
            warn!(index, "Selection ignored");
        }
    }

    let result = wait_until_finished(service, &mut events).await;

    #[cfg(unix)]
    signals.abort();
    service.shutdown().await;
    result
}

async fn wait_until_finished(
    service: &PlayerService,
    events: &mut tokio::sync::broadcast::Receiver<CoreEvent>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                service.stop().await?;
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(CoreEvent::Playback(PlaybackEvent::Started { index, url, local })) => {
                    println!(
                        "playing  [{}] {}{}",
                        index,
                        url,
                        if local { "" } else { " (streaming)" }
                    );
                }
                Ok(CoreEvent::Playback(PlaybackEvent::EntrySkipped { index, reason, .. })) => {
                    println!("skipped  [{}] {}", index, reason);
                }
                Ok(CoreEvent::Playback(PlaybackEvent::PlaylistCompleted)) => {
                    println!("Playlist finished");
                    return Ok(());
                }
                Ok(CoreEvent::Playback(PlaybackEvent::Stopped)) => return Ok(()),
                Ok(other) => debug!(event = other.description(), "Core event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

/// `SIGUSR1` sends the session to the background, `SIGUSR2` brings it back.
#[cfg(unix)]
async fn forward_lifecycle_signals(observer: Arc<ChannelLifecycleObserver>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut hide, mut show) = match (
        signal(SignalKind::user_defined1()),
        signal(SignalKind::user_defined2()),
    ) {
        (Ok(hide), Ok(show)) => (hide, show),
        _ => {
            warn!("Lifecycle signals unavailable");
            return;
        }
    };

    loop {
        tokio::select! {
            Some(()) = hide.recv() => observer.notify(LifecycleState::Background),
            Some(()) = show.recv() => observer.notify(LifecycleState::Foreground),
            else => break,
        }
    }
}
