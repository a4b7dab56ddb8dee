// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds the number of frames the GPU works on at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_intrusive::sync::Semaphore;
use tilesdf_encoding::MAX_FRAMES_IN_FLIGHT;
use wgpu::{Device, Queue};

use crate::util::block_on_wgpu;

struct PacerState {
    semaphore: Semaphore,
    /// Frames which were handed a permit.
    started: AtomicU64,
    /// Frames whose GPU work is done. Completion is in submission order.
    completed: AtomicU64,
}

/// A counting semaphore with [`MAX_FRAMES_IN_FLIGHT`] permits.
///
/// A permit is taken for each frame before its buffers are written and is
/// returned once the queue reports the frame's work as done.
#[derive(Clone)]
pub struct FramePacer {
    state: Arc<PacerState>,
}

impl std::fmt::Debug for FramePacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePacer")
            .field("in_flight", &self.in_flight())
            .field("completed", &self.completed())
            .finish()
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePacer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(PacerState {
                semaphore: Semaphore::new(true, MAX_FRAMES_IN_FLIGHT),
                started: AtomicU64::new(0),
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Waits for a free permit, polling `device` for finished frames.
    ///
    /// Returns the index of the new frame.
    pub fn acquire(&self, device: &Device) -> u64 {
        let mut releaser = block_on_wgpu(device, self.state.semaphore.acquire(1));
        // The permit is handed back by `complete`, not on drop.
        releaser.disarm();
        self.start_frame()
    }

    /// Takes a permit if one is free.
    pub fn try_acquire(&self) -> Option<u64> {
        let mut releaser = self.state.semaphore.try_acquire(1)?;
        releaser.disarm();
        Some(self.start_frame())
    }

    fn start_frame(&self) -> u64 {
        let frame = self.state.started.fetch_add(1, Ordering::AcqRel);
        log::trace!("frame {frame} started, {} in flight", self.in_flight());
        frame
    }

    /// Returns the permit of the oldest frame in flight.
    pub fn complete(&self) {
        let started = self.state.started.load(Ordering::Acquire);
        let bumped = self
            .state
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |completed| {
                (completed < started).then_some(completed + 1)
            });
        assert!(bumped.is_ok(), "completed a frame which was never started");
        self.state.semaphore.release(1);
    }

    /// Completes the oldest frame in flight once the work submitted to
    /// `queue` so far is done.
    ///
    /// Must be called once per acquired frame, after its submission.
    pub fn on_submitted(&self, queue: &Queue) {
        let pacer = self.clone();
        queue.on_submitted_work_done(move || pacer.complete());
    }

    /// Number of frames holding a permit.
    pub fn in_flight(&self) -> usize {
        MAX_FRAMES_IN_FLIGHT - self.state.semaphore.permits()
    }

    /// Number of frames whose GPU work is done.
    ///
    /// Frames complete in order, so frame `n` is done once this exceeds `n`.
    pub fn completed(&self) -> u64 {
        self.state.completed.load(Ordering::Acquire)
    }

    /// Number of frames started so far.
    pub fn started(&self) -> u64 {
        self.state.started.load(Ordering::Acquire)
    }
}
