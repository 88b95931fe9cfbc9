use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::state::{FrameSampler, SamplerSettings, SeedRecord};
use crate::frame::FrameSource;
use crate::seed::SeedSource;

const MIN_TICK: Duration = Duration::from_millis(10);

/// Owner's side of a running sampler task.
///
/// The console reads the seed slot and adjusts settings through this
/// handle; the sampler task is the only writer of the seed slot.
pub struct SamplerHandle {
    task: JoinHandle<()>,
    settings_tx: watch::Sender<SamplerSettings>,
    seed_rx: watch::Receiver<SeedRecord>,
}

impl SamplerHandle {
    pub fn seed(&self) -> SeedRecord {
        *self.seed_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SeedRecord> {
        self.seed_rx.clone()
    }

    pub fn settings(&self) -> SamplerSettings {
        *self.settings_tx.borrow()
    }

    pub fn set_threshold(&self, threshold: u64) {
        self.settings_tx.send_modify(|s| s.threshold = threshold);
    }

    pub fn set_min_interval(&self, min_interval: Duration) {
        self.settings_tx.send_modify(|s| s.min_interval = min_interval);
    }

    /// Cancel the timer task and wait for it to stop.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
        info!("sampler stopped");
    }
}

/// Start sampling every `tick`. The first tick fires immediately.
pub fn spawn<F, S>(frames: F, seeds: S, settings: SamplerSettings, tick: Duration) -> SamplerHandle
where
    F: FrameSource + 'static,
    S: SeedSource + 'static,
{
    let tick = if tick < MIN_TICK {
        warn!(?tick, min = ?MIN_TICK, "tick interval too small, clamping");
        MIN_TICK
    } else {
        tick
    };

    let (seed_tx, seed_rx) = watch::channel(SeedRecord::default());
    let (settings_tx, settings_rx) = watch::channel(settings);
    let sampler = FrameSampler::new(frames, seeds, seed_tx);

    info!(
        ?tick,
        threshold = settings.threshold,
        min_interval = ?settings.min_interval,
        "starting frame sampler"
    );
    let task = tokio::spawn(run(sampler, settings_rx, tick));

    SamplerHandle {
        task,
        settings_tx,
        seed_rx,
    }
}

async fn run<F: FrameSource, S: SeedSource>(
    mut sampler: FrameSampler<F, S>,
    settings_rx: watch::Receiver<SamplerSettings>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    // A slow seed fetch pushes the schedule back instead of bunching ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let settings = *settings_rx.borrow();
        let outcome = sampler.maybe_refresh_seed(Instant::now(), &settings).await;
        debug!(?outcome, "sampler tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Snapshot;
    use crate::sampler::fakes::{FakeFrames, FakeSeeds};

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn settings(threshold: u64) -> SamplerSettings {
        SamplerSettings {
            threshold,
            min_interval: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_publishes_seed() {
        let frames = FakeFrames::new([Snapshot::solid(16, 16, BLACK)]);
        let seeds = FakeSeeds::sequence([99]);
        let handle = spawn(frames, seeds, settings(1), Duration::from_secs(2));

        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(handle.seed().seed, 99);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn settings_are_read_each_tick() {
        let frames = FakeFrames::new([Snapshot::solid(16, 16, BLACK)]);
        let seeds = FakeSeeds::sequence([1, 2]);
        let handle = spawn(
            frames.clone(),
            seeds.clone(),
            settings(u64::MAX),
            Duration::from_secs(2),
        );
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        // A full swing is still under an unreachable threshold.
        frames.push(Snapshot::solid(16, 16, WHITE));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(seeds.calls(), 1);

        handle.set_threshold(1);
        assert_eq!(handle.settings().threshold, 1);
        frames.push(Snapshot::solid(16, 16, BLACK));
        rx.changed().await.unwrap();
        assert_eq!(handle.seed().seed, 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let frames = FakeFrames::new([Snapshot::solid(4, 4, BLACK)]);
        let seeds = FakeSeeds::sequence([5]);
        let handle = spawn(frames.clone(), seeds, settings(1), Duration::from_secs(1));
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        handle.shutdown().await;
        let captured = frames.captures();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(frames.captures(), captured);
        // Sender side is gone with the task.
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn running_task_honors_new_min_interval() {
        let frames = FakeFrames::new([Snapshot::solid(4, 4, BLACK)]);
        let slow = SamplerSettings {
            threshold: 1,
            min_interval: Duration::from_secs(100),
        };
        let handle = spawn(
            frames.clone(),
            FakeSeeds::sequence(Vec::new()),
            slow,
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(frames.captures(), 1);

        handle.set_min_interval(Duration::ZERO);
        assert_eq!(handle.settings().min_interval, Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(frames.captures(), 6);
        handle.shutdown().await;
    }
}
