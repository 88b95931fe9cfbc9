//! In-memory frame and seed sources for sampler tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::frame::{CaptureError, FrameSource, Snapshot};
use crate::seed::{SeedFetchError, SeedSource};

#[derive(Default)]
struct FramesInner {
    ready: bool,
    failing: bool,
    queue: VecDeque<Snapshot>,
    last: Option<Snapshot>,
    captures: usize,
}

/// Hands out queued snapshots in order, then keeps repeating the last one.
/// Clones share the same queue and counters.
#[derive(Clone)]
pub struct FakeFrames {
    inner: Arc<Mutex<FramesInner>>,
}

impl FakeFrames {
    pub fn new(frames: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FramesInner {
                ready: true,
                queue: frames.into_iter().collect(),
                ..Default::default()
            })),
        }
    }

    pub fn not_ready() -> Self {
        let frames = Self::new(Vec::new());
        frames.inner.lock().unwrap().ready = false;
        frames
    }

    pub fn failing() -> Self {
        let frames = Self::new(Vec::new());
        frames.inner.lock().unwrap().failing = true;
        frames
    }

    pub fn push(&self, snapshot: Snapshot) {
        self.inner.lock().unwrap().queue.push_back(snapshot);
    }

    pub fn captures(&self) -> usize {
        self.inner.lock().unwrap().captures
    }
}

impl FrameSource for FakeFrames {
    async fn is_ready(&mut self) -> bool {
        self.inner.lock().unwrap().ready
    }

    async fn capture(&mut self) -> Result<Snapshot, CaptureError> {
        let mut inner = self.inner.lock().unwrap();
        inner.captures += 1;
        if inner.failing {
            return Err(CaptureError::HttpStatus(503));
        }
        if let Some(next) = inner.queue.pop_front() {
            inner.last = Some(next);
        }
        inner
            .last
            .clone()
            .ok_or(CaptureError::EmptyFrame { width: 0, height: 0 })
    }
}

/// Replays a script of fetch results; `None` entries and an exhausted
/// script both fail.
#[derive(Clone)]
pub struct FakeSeeds {
    script: Arc<Mutex<VecDeque<Option<u32>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeSeeds {
    pub fn scripted(script: impl IntoIterator<Item = Option<u32>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn sequence(seeds: impl IntoIterator<Item = u32>) -> Self {
        Self::scripted(seeds.into_iter().map(Some))
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl SeedSource for FakeSeeds {
    async fn fetch_seed(&self) -> Result<u32, SeedFetchError> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(SeedFetchError::HttpStatus(500))
    }
}
