// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame GPU buffers, one per frame slot.

use bytemuck::Pod;
use tilesdf_encoding::FRAME_SLOTS;
use wgpu::{Buffer, BufferUsages, Device, Queue};

use crate::recording::BufferProxy;

/// Ownership of one frame slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Never used.
    Free,
    /// Being written for `frame`.
    Mapped { frame: u64 },
    /// Handed to the GPU with `frame`.
    Submitted { frame: u64 },
}

/// Tracks which frame owns each slot of a ring.
///
/// Frame `n` uses slot `n % FRAME_SLOTS`.
#[derive(Clone, Debug)]
pub struct SlotTracker {
    states: [SlotState; FRAME_SLOTS],
}

impl Default for SlotTracker {
    fn default() -> Self {
        Self {
            states: [SlotState::Free; FRAME_SLOTS],
        }
    }
}

impl SlotTracker {
    pub fn slot(frame: u64) -> usize {
        (frame % FRAME_SLOTS as u64) as usize
    }

    /// Marks the slot of `frame` as being written.
    ///
    /// `completed` is the number of frames whose GPU work is done.
    ///
    /// # Panics
    ///
    /// If the slot is mapped, or the frame which last used it is still in flight.
    pub fn map(&mut self, frame: u64, completed: u64) -> usize {
        let slot = Self::slot(frame);
        match self.states[slot] {
            SlotState::Free => {}
            SlotState::Mapped { frame: other } => {
                panic!("slot {slot} is still mapped for frame {other}")
            }
            SlotState::Submitted { frame: last } => assert!(
                last < completed,
                "slot {slot} is still in flight with frame {last}"
            ),
        }
        self.states[slot] = SlotState::Mapped { frame };
        slot
    }

    /// Hands the slot of `frame` to the GPU.
    pub fn unmap(&mut self, frame: u64) -> usize {
        let slot = Self::slot(frame);
        assert_eq!(
            self.states[slot],
            SlotState::Mapped { frame },
            "slot {slot} was not mapped for frame {frame}"
        );
        self.states[slot] = SlotState::Submitted { frame };
        slot
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.states[slot]
    }
}

#[derive(Debug)]
struct RingSlot<T> {
    buffer: Buffer,
    proxy: BufferProxy,
    staging: Vec<T>,
}

/// A logical buffer backed by [`FRAME_SLOTS`] GPU buffers of identical capacity.
///
/// The CPU writes a staging copy of the slot, and [`unmap`](Self::unmap)
/// queues the written range for upload.
#[derive(Debug)]
pub struct FrameRing<T> {
    name: &'static str,
    capacity: u32,
    slots: Vec<RingSlot<T>>,
    tracker: SlotTracker,
}

impl<T: Pod> FrameRing<T> {
    pub fn new(device: &Device, name: &'static str, capacity: u32, usage: BufferUsages) -> Self {
        let capacity = capacity.max(1);
        let size = capacity as u64 * size_of::<T>() as u64;
        let slots = (0..FRAME_SLOTS)
            .map(|_| RingSlot {
                buffer: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(name),
                    size,
                    usage: usage | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                proxy: BufferProxy::new(size, name),
                staging: vec![T::zeroed(); capacity as usize],
            })
            .collect();
        Self {
            name,
            capacity,
            slots,
            tracker: SlotTracker::default(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Exposes the CPU view of the slot of `frame`.
    ///
    /// See [`SlotTracker::map`] for the ownership check.
    pub fn map(&mut self, frame: u64, completed: u64) -> &mut [T] {
        let slot = self.tracker.map(frame, completed);
        &mut self.slots[slot].staging
    }

    /// Declares `len` elements starting at `offset` of the slot of `frame`
    /// as written, and queues them for the GPU.
    pub fn unmap(&mut self, queue: &Queue, frame: u64, offset: u32, len: u32) {
        let slot = self.tracker.unmap(frame);
        let end = offset.saturating_add(len).min(self.capacity);
        if offset >= end {
            return;
        }
        let slot = &self.slots[slot];
        let bytes = bytemuck::cast_slice(&slot.staging[offset as usize..end as usize]);
        let byte_offset = offset as u64 * size_of::<T>() as u64;
        queue.write_buffer(&slot.buffer, byte_offset, bytes);
        log::trace!("{}: wrote {} bytes for frame {frame}", self.name, bytes.len());
    }

    /// Copies `data` into the slot of `frame` and uploads it.
    ///
    /// Elements past the capacity are dropped.
    pub fn write(&mut self, queue: &Queue, frame: u64, completed: u64, data: &[T]) {
        let view = self.map(frame, completed);
        let len = data.len().min(view.len());
        view[..len].copy_from_slice(&data[..len]);
        self.unmap(queue, frame, 0, len as u32);
    }

    pub fn proxy(&self, frame: u64) -> BufferProxy {
        self.slots[SlotTracker::slot(frame)].proxy
    }

    pub fn buffer(&self, frame: u64) -> &Buffer {
        &self.slots[SlotTracker::slot(frame)].buffer
    }

    pub fn slot_state(&self, frame: u64) -> SlotState {
        self.tracker.state(SlotTracker::slot(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::FramePacer;
    use std::collections::VecDeque;
    use tilesdf_encoding::MAX_FRAMES_IN_FLIGHT;

    /// Ten frames through a three slot ring, with the GPU lagging behind
    /// until the pacer runs out of permits.
    #[test]
    fn ten_frames_rotate_through_slots() {
        let pacer = FramePacer::new();
        let mut tracker = SlotTracker::default();
        let mut gpu_queue = VecDeque::new();
        for expected in 0..10_u64 {
            let frame = match pacer.try_acquire() {
                Some(frame) => frame,
                None => {
                    // The GPU finishes the oldest frame.
                    gpu_queue.pop_front().unwrap();
                    pacer.complete();
                    pacer.try_acquire().unwrap()
                }
            };
            assert_eq!(frame, expected);
            assert!(pacer.in_flight() <= MAX_FRAMES_IN_FLIGHT);

            let slot = tracker.map(frame, pacer.completed());
            assert_eq!(slot, (frame % 3) as usize);
            assert_eq!(tracker.state(slot), SlotState::Mapped { frame });
            tracker.unmap(frame);
            gpu_queue.push_back(frame);
            assert!(gpu_queue.len() <= MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(pacer.completed(), 7);
        assert_eq!(tracker.state(0), SlotState::Submitted { frame: 9 });
        assert_eq!(tracker.state(1), SlotState::Submitted { frame: 7 });
        assert_eq!(tracker.state(2), SlotState::Submitted { frame: 8 });
    }

    #[test]
    #[should_panic(expected = "still in flight")]
    fn remapping_an_in_flight_slot_panics() {
        let mut tracker = SlotTracker::default();
        for frame in 0..3 {
            tracker.map(frame, 0);
            tracker.unmap(frame);
        }
        // Frame 0 has not completed, so slot 0 can't be reused by frame 3.
        tracker.map(3, 0);
    }

    #[test]
    fn completed_slot_can_be_remapped() {
        let mut tracker = SlotTracker::default();
        for frame in 0..3 {
            tracker.map(frame, 0);
            tracker.unmap(frame);
        }
        assert_eq!(tracker.map(3, 1), 0);
    }

    #[test]
    #[should_panic(expected = "still mapped")]
    fn double_map_panics() {
        let mut tracker = SlotTracker::default();
        tracker.map(0, 0);
        tracker.map(3, 3);
    }
}
