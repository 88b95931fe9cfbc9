use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use webcam_dice_common::config::SamplerConfig;

use crate::frame::{CaptureError, FrameSource, Snapshot};
use crate::seed::SeedSource;

/// Runtime-adjustable gate parameters, re-read on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub threshold: u64,
    pub min_interval: Duration,
}

impl From<&SamplerConfig> for SamplerSettings {
    fn from(config: &SamplerConfig) -> Self {
        Self {
            threshold: config.threshold,
            min_interval: config.min_interval(),
        }
    }
}

/// The current seed and when it arrived. `seed == 0` means none yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedRecord {
    pub seed: u32,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    VideoNotReady,
    /// Minimum interval since the last capture has not elapsed.
    TooSoon,
    CaptureFailed,
    Similar { score: u64 },
    SeedUpdated { seed: u32 },
    SeedFetchFailed,
}

/// Previous snapshot and capture time. Starts empty.
#[derive(Debug, Default)]
pub struct SamplerState {
    previous: Option<Snapshot>,
    last_capture: Option<Instant>,
}

#[cfg(test)]
impl SamplerState {
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn last_capture(&self) -> Option<Instant> {
        self.last_capture
    }
}

/// Decides, tick by tick, whether the picture changed enough to justify
/// asking for a fresh seed.
pub struct FrameSampler<F, S> {
    frames: F,
    seeds: S,
    state: SamplerState,
    seed_tx: watch::Sender<SeedRecord>,
}

impl<F: FrameSource, S: SeedSource> FrameSampler<F, S> {
    pub fn new(frames: F, seeds: S, seed_tx: watch::Sender<SeedRecord>) -> Self {
        Self {
            frames,
            seeds,
            state: SamplerState::default(),
            seed_tx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SamplerState {
        &self.state
    }

    /// One sampling step at time `now`. Never fails: every problem is logged
    /// and reported through the returned outcome.
    pub async fn maybe_refresh_seed(
        &mut self,
        now: Instant,
        settings: &SamplerSettings,
    ) -> TickOutcome {
        if !self.frames.is_ready().await {
            debug!("video is not ready yet");
            return TickOutcome::VideoNotReady;
        }

        if let Some(last) = self.state.last_capture {
            if now.saturating_duration_since(last) < settings.min_interval {
                return TickOutcome::TooSoon;
            }
        }

        let current = match self.frames.capture().await {
            Ok(snapshot) if snapshot.is_empty() => {
                warn!(
                    width = snapshot.width(),
                    height = snapshot.height(),
                    "captured zero-size frame, skipping"
                );
                return TickOutcome::CaptureFailed;
            }
            Ok(snapshot) => snapshot,
            Err(CaptureError::NotReady) => {
                debug!("video is not ready yet");
                return TickOutcome::VideoNotReady;
            }
            Err(e) => {
                warn!(error = %e, "frame capture failed, skipping");
                return TickOutcome::CaptureFailed;
            }
        };

        let score = self
            .state
            .previous
            .as_ref()
            .and_then(|prev| current.difference(prev));

        let outcome = match score {
            Some(score) if score < settings.threshold => {
                debug!(score, threshold = settings.threshold, "frames are similar");
                TickOutcome::Similar { score }
            }
            _ => {
                debug!(
                    score = ?score,
                    threshold = settings.threshold,
                    "frames are different, fetching seed"
                );
                self.refresh_seed().await
            }
        };

        self.state.previous = Some(current);
        self.state.last_capture = Some(now);
        outcome
    }

    async fn refresh_seed(&mut self) -> TickOutcome {
        match self.seeds.fetch_seed().await {
            Ok(seed) => {
                info!(seed, "fetched seed from server");
                self.seed_tx.send_replace(SeedRecord {
                    seed,
                    fetched_at: Some(Utc::now()),
                });
                TickOutcome::SeedUpdated { seed }
            }
            Err(e) => {
                let kept = self.seed_tx.borrow().seed;
                warn!(error = %e, kept_seed = kept, "error fetching seed from server");
                TickOutcome::SeedFetchFailed
            }
        }
    }
}
