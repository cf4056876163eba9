//! Media sink that renders through an external player process

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{MediaEvent, MediaEventStream, MediaSink, MediaSource},
};
#[cfg(unix)]
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 32;

/// Default player binary.
pub const DEFAULT_PLAYER: &str = "mpv";

#[derive(Default)]
struct SinkState {
    source: Option<MediaSource>,
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
    generation: u64,
    paused: bool,
}

/// Media sink spawning one player process per source.
///
/// The process exiting successfully is reported as [`MediaEvent::Ended`];
/// a non-zero exit is reported as [`MediaEvent::Error`]. Processes torn
/// down by [`stop`](MediaSink::stop) or a source change report nothing.
pub struct ProcessMediaSink {
    program: OsString,
    args: Vec<OsString>,
    state: Arc<Mutex<SinkState>>,
    events: broadcast::Sender<MediaEvent>,
}

impl ProcessMediaSink {
    /// Create a sink using `program` with no extra arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            program: program.into(),
            args: Vec::new(),
            state: Arc::new(Mutex::new(SinkState {
                paused: true,
                ..SinkState::default()
            })),
            events,
        }
    }

    /// Extra arguments passed before the media location.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn location(source: &MediaSource) -> OsString {
        match source {
            MediaSource::LocalFile { path } => path.clone().into_os_string(),
            MediaSource::RemoteStream { url } => OsString::from(url),
        }
    }

    /// Tear down the running process, if any. Its exit is not reported.
    fn release(state: &mut SinkState) {
        state.generation = state.generation.wrapping_add(1);
        state.pid = None;
        if let Some(kill) = state.kill.take() {
            let _ = kill.send(());
        }
    }

    fn spawn_player(&self, source: &MediaSource) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(Self::location(source))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Failed to launch player {:?}: {}",
                    self.program, e
                ))
            })?;

        let (kill_tx, kill_rx) = oneshot::channel();
        let generation = {
            let mut state = self.state.lock();
            state.pid = child.id();
            state.kill = Some(kill_tx);
            state.paused = false;
            state.generation
        };

        info!(source = %source.log_label(), pid = ?child.id(), "Player started");

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => MediaEvent::Ended { generation },
                        Ok(status) => MediaEvent::Error {
                            generation,
                            message: format!("player exited with {}", status),
                        },
                        Err(e) => MediaEvent::Error {
                            generation,
                            message: format!("failed to wait for player: {}", e),
                        },
                    };

                    let current = {
                        let mut state = state.lock();
                        let current = state.generation == generation;
                        if current {
                            state.pid = None;
                            state.kill = None;
                            state.paused = true;
                        }
                        current
                    };

                    if current {
                        debug!(event = ?event, "Player exited");
                        let _ = events.send(event);
                    }
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill player");
                    }
                }
            }
        });

        Ok(())
    }

    #[cfg(unix)]
    fn signal(pid: u32, signal: Signal) -> Result<()> {
        let pid = i32::try_from(pid)
            .map_err(|_| BridgeError::OperationFailed(format!("Invalid player pid {}", pid)))?;
        kill(Pid::from_raw(pid), signal).map_err(|errno| BridgeError::Io(errno.into()))
    }
}

#[async_trait]
impl MediaSink for ProcessMediaSink {
    async fn set_source(&self, source: MediaSource) -> Result<u64> {
        let mut state = self.state.lock();
        Self::release(&mut state);
        debug!(source = %source.log_label(), generation = state.generation, "Source set");
        state.source = Some(source);
        state.paused = true;
        Ok(state.generation)
    }

    async fn play(&self) -> Result<()> {
        let (source, pid, paused) = {
            let state = self.state.lock();
            (state.source.clone(), state.pid, state.paused)
        };

        match (pid, source) {
            (Some(pid), _) => {
                if paused {
                    #[cfg(unix)]
                    Self::signal(pid, Signal::SIGCONT)?;
                    #[cfg(not(unix))]
                    let _ = pid;
                    self.state.lock().paused = false;
                    debug!(pid, "Player resumed");
                }
                Ok(())
            }
            (None, Some(source)) => self.spawn_player(&source),
            (None, None) => Err(BridgeError::OperationFailed(
                "No source loaded".to_string(),
            )),
        }
    }

    async fn pause(&self) -> Result<()> {
        let pid = {
            let state = self.state.lock();
            if state.paused {
                return Ok(());
            }
            state.pid
        };

        if let Some(pid) = pid {
            #[cfg(unix)]
            Self::signal(pid, Signal::SIGSTOP)?;
            #[cfg(not(unix))]
            {
                let _ = pid;
                return Err(BridgeError::NotAvailable(
                    "Pausing an external player is not supported on this platform".to_string(),
                ));
            }
            debug!(pid, "Player paused");
        }
        self.state.lock().paused = true;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::release(&mut state);
        state.source = None;
        state.paused = true;
        Ok(())
    }

    async fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    async fn subscribe_events(&self) -> Result<Box<dyn MediaEventStream>> {
        Ok(Box::new(BroadcastMediaEvents {
            receiver: self.events.subscribe(),
        }))
    }
}

impl Drop for ProcessMediaSink {
    fn drop(&mut self) {
        Self::release(&mut self.state.lock());
    }
}

/// [`MediaEventStream`] over a broadcast channel.
pub struct BroadcastMediaEvents {
    receiver: broadcast::Receiver<MediaEvent>,
}

impl BroadcastMediaEvents {
    pub fn new(receiver: broadcast::Receiver<MediaEvent>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl MediaEventStream for BroadcastMediaEvents {
    async fn next(&mut self) -> Option<MediaEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Media event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
