/// Poll loop: Reader → Detector → Notifier on a fixed period.
///
/// `PollLoop` owns the only mutable state (the `ChangeDetector`). Ticks are
/// awaited inline inside `run`, so two ticks never overlap and only this
/// task ever touches the last seen track. A tick still running at shutdown
/// is abandoned. Notifications leave as detached tasks and feed nothing
/// back.
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracklist_proto::config::Config;
use tracklist_proto::detector::ChangeDetector;
use tracklist_proto::playlist::{read_latest_track, TrackEntry, TrackError};

use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Changed(TrackEntry),
    Unchanged,
    Filler,
    Skipped,
}

pub struct PollLoop {
    playlists_dir: PathBuf,
    file_prefix: String,
    interval: Duration,
    detector: ChangeDetector,
    notifier: Notifier,
    state: LoopState,
}

impl PollLoop {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::with_notifier(config, Notifier::new(config)?))
    }

    pub fn with_notifier(config: &Config, notifier: Notifier) -> Self {
        Self {
            playlists_dir: config.playlists.dir.clone(),
            file_prefix: config.playlists.file_prefix.clone(),
            interval: config.poll_interval(),
            detector: ChangeDetector::new(),
            notifier,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.detector.last_seen()
    }

    /// Startup read: records the current track without announcing it.
    /// Only a directory with no playlist files at all is fatal here.
    pub async fn prime(&mut self) -> Result<(), TrackError> {
        info!("Starting...");
        match read_latest_track(&self.playlists_dir, &self.file_prefix).await {
            Ok(track) => {
                self.detector.detect_change(&track);
            }
            Err(e @ TrackError::NoPlaylistFiles { .. }) => return Err(e),
            Err(e) => warn!("[reader] {}", e),
        }
        info!("Last song was: {}", self.last_seen().unwrap_or(""));
        self.state = LoopState::Running;
        Ok(())
    }

    /// One Reader → Detector → Notifier cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        let track = match read_latest_track(&self.playlists_dir, &self.file_prefix).await {
            Ok(t) => t,
            Err(e @ TrackError::EmptyPlaylist { .. }) => {
                debug!("[reader] {}", e);
                return TickOutcome::Skipped;
            }
            Err(e) => {
                warn!("[reader] {}; skipping tick", e);
                return TickOutcome::Skipped;
            }
        };

        if tracklist_proto::detector::is_filler(&track) {
            debug!("[detector] filler slot {:?}", track);
            return TickOutcome::Filler;
        }
        if !self.detector.detect_change(&track) {
            return TickOutcome::Unchanged;
        }

        info!("New song detected: {}", track);
        // Handles dropped: fire-and-forget.
        let _ = self.notifier.notify(&track).await;
        TickOutcome::Changed(track)
    }

    /// Tick every interval until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
        }

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; prime() already covered it.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    // A read stuck on a dead mount must not hold up shutdown.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.tick() => {}
                    }
                }
            }
        }

        self.state = LoopState::Stopped;
        debug!("poll loop stopped");
    }
}
