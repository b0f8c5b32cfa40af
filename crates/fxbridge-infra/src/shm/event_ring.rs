// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-producer/single-consumer queue of input events.
//!
//! The host owns `tail`, the renderer owns `head`. Both are free-running
//! wrapping counters; the slot for a counter is `counter % capacity`. The
//! producer publishes a slot with a release store of `tail`, the consumer frees
//! slots with a release store of `head`.

use super::layout::{header, ring_ctrl, SegmentLayout};
use super::region::Region;
use fxbridge_core::event::{InputEvent, WireEvent, WIRE_EVENT_SIZE};
use fxbridge_core::EventSource;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A push was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// Every slot holds an event the renderer has not drained yet.
    #[error("event ring is full")]
    Full,
}

/// A handle on the event ring of a segment.
///
/// Exactly one handle may push and exactly one may drain at any time.
#[derive(Clone)]
pub struct EventChannel {
    region: Arc<Region>,
    ctrl: usize,
    slots: usize,
    capacity: u32,
}

impl EventChannel {
    pub(crate) fn new(region: Arc<Region>, layout: &SegmentLayout) -> Self {
        Self {
            region,
            ctrl: layout.event_offset,
            slots: layout.event_slots_offset(),
            capacity: layout.event_capacity,
        }
    }

    /// Writes the control block of a fresh ring.
    pub(crate) fn initialize(region: &Region, layout: &SegmentLayout) {
        let ctrl = layout.event_offset;
        region.atomic_u32(ctrl + ring_ctrl::HEAD).store(0, Ordering::Relaxed);
        region.atomic_u32(ctrl + ring_ctrl::TAIL).store(0, Ordering::Relaxed);
        region
            .atomic_u32(ctrl + ring_ctrl::CAPACITY)
            .store(layout.event_capacity, Ordering::Relaxed);
        region.atomic_u32(ctrl + ring_ctrl::REJECTED).store(0, Ordering::Relaxed);
    }

    fn word(&self, field: usize) -> &AtomicU32 {
        self.region.atomic_u32(self.ctrl + field)
    }

    fn slot_offset(&self, counter: u32) -> usize {
        self.slots + (counter % self.capacity) as usize * WIRE_EVENT_SIZE
    }

    /// Number of slots.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Events written but not drained yet.
    pub fn pending(&self) -> u32 {
        let tail = self.word(ring_ctrl::TAIL).load(Ordering::Acquire);
        let head = self.word(ring_ctrl::HEAD).load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    /// Pushes refused so far because the ring was full.
    pub fn rejected(&self) -> u32 {
        self.word(ring_ctrl::REJECTED).load(Ordering::Relaxed)
    }

    /// Enqueues a decoded event (host side).
    pub fn try_push(&self, event: &InputEvent) -> Result<(), PushError> {
        self.try_push_wire(WireEvent::from(event))
    }

    /// Enqueues a raw record (host side).
    ///
    /// Never overwrites a pending event: a full ring refuses the push and
    /// counts it in [`EventChannel::rejected`].
    pub fn try_push_wire(&self, record: WireEvent) -> Result<(), PushError> {
        let tail = self.word(ring_ctrl::TAIL).load(Ordering::Relaxed);
        let head = self.word(ring_ctrl::HEAD).load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity {
            self.word(ring_ctrl::REJECTED).fetch_add(1, Ordering::Relaxed);
            log::trace!("Event ring full, rejecting {record:?}");
            return Err(PushError::Full);
        }

        self.region
            .copy_in(self.slot_offset(tail), &record.to_le_bytes());
        self.word(ring_ctrl::TAIL)
            .store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Enqueues, spinning while the ring is full.
    ///
    /// This is the write-block policy for hosts that prefer it. The renderer
    /// must keep draining for this to return.
    pub fn push_spinning(&self, event: &InputEvent) {
        let record = WireEvent::from(event);
        while self.try_push_wire(record).is_err() {
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    /// Drains every pending event in FIFO order (renderer side).
    pub fn pop_all(&self) -> Vec<InputEvent> {
        let head = self.word(ring_ctrl::HEAD).load(Ordering::Relaxed);
        let tail = self.word(ring_ctrl::TAIL).load(Ordering::Acquire);
        let pending = tail.wrapping_sub(head);
        if pending == 0 {
            return Vec::new();
        }
        if pending > self.capacity {
            log::error!(
                "Event ring is corrupt (head {head}, tail {tail}, capacity {}); discarding backlog",
                self.capacity
            );
            self.word(ring_ctrl::HEAD).store(tail, Ordering::Release);
            return Vec::new();
        }

        let mut events = Vec::with_capacity(pending as usize);
        let mut bytes = [0u8; WIRE_EVENT_SIZE];
        for i in 0..pending {
            self.region
                .copy_out(self.slot_offset(head.wrapping_add(i)), &mut bytes);
            WireEvent::from_le_bytes(bytes).decode_into(&mut events);
        }
        self.word(ring_ctrl::HEAD).store(tail, Ordering::Release);
        log::trace!("Drained {pending} event record(s)");
        events
    }

    /// Whether the host has set the segment's shutdown word.
    pub fn shutdown_requested(&self) -> bool {
        self.region.atomic_u32(header::SHUTDOWN).load(Ordering::Acquire) != 0
    }
}

impl EventSource for EventChannel {
    fn pop_all(&mut self) -> Vec<InputEvent> {
        EventChannel::pop_all(self)
    }

    fn shutdown_requested(&self) -> bool {
        EventChannel::shutdown_requested(self)
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("rejected", &self.rejected())
            .finish()
    }
}
