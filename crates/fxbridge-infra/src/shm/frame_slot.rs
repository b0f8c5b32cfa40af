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

//! Latest-wins, double-buffered frame transfer.
//!
//! The writer fills the inactive pixel slot while bumping that slot's sequence
//! word to odd and back to even, then flips `active` and the dimensions under
//! the header seqlock. A reader snapshots the header, copies the active slot and
//! retries if either sequence word moved. The writer never touches the active
//! slot, so a reader that sees an unchanged header after its copy holds a
//! complete frame.

use super::layout::{frame_ctrl, header, SegmentLayout, SEGMENT_MAGIC};
use super::region::Region;
use fxbridge_core::frame::{frame_len, Frame, FrameView, PublishOutcome, BYTES_PER_PIXEL};
use fxbridge_core::{FrameSink, PublishError};
use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Attempts [`FrameChannel::current`] makes before reporting contention.
const READ_ATTEMPTS: usize = 64;

/// The current frame could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameReadError {
    /// The writer kept publishing while the reader copied.
    #[error("frame writer kept the slot busy; try again")]
    Contended,
    /// The control block holds values no writer produces.
    #[error("frame control block is corrupt")]
    Corrupt,
}

/// A handle on the frame area of a segment.
pub struct FrameChannel {
    region: Arc<Region>,
    layout: SegmentLayout,
    last_request: u32,
}

impl FrameChannel {
    pub(crate) fn new(region: Arc<Region>, layout: SegmentLayout) -> Self {
        let last_request = region
            .atomic_u32(layout.frame_offset + frame_ctrl::REQUEST_SEQ)
            .load(Ordering::Acquire);
        Self {
            region,
            layout,
            last_request,
        }
    }

    fn ctrl(&self, field: usize) -> &AtomicU32 {
        self.region.atomic_u32(self.layout.frame_offset + field)
    }

    fn slot_seq(&self, slot: usize) -> &AtomicU32 {
        self.region
            .atomic_u32(self.layout.slot_seq_offset() + frame_ctrl::SLOT_SEQ[slot])
    }

    fn is_open(&self) -> bool {
        self.region.atomic_u32(header::MAGIC).load(Ordering::Acquire) == SEGMENT_MAGIC
    }

    /// The largest frame this channel accepts.
    pub fn max_dimensions(&self) -> (u32, u32) {
        (self.layout.max_width, self.layout.max_height)
    }

    /// Number of frames published so far.
    pub fn generation(&self) -> u32 {
        self.ctrl(frame_ctrl::GENERATION).load(Ordering::Acquire)
    }

    /// Replaces the current frame (renderer side).
    ///
    /// On error the current frame is left untouched.
    pub fn publish(&self, frame: FrameView<'_>) -> Result<PublishOutcome, PublishError> {
        if !self.is_open() {
            return Err(PublishError::Closed);
        }

        let (width, height) = frame.dimensions();
        let (max_width, max_height) = self.max_dimensions();
        if width == 0 || height == 0 || width > max_width || height > max_height {
            return Err(PublishError::InvalidDimensions {
                width,
                height,
                max_width,
                max_height,
            });
        }
        let expected = frame_len(width, height).unwrap_or(usize::MAX);
        if frame.pixels().len() != expected {
            return Err(PublishError::LengthMismatch {
                width,
                height,
                expected,
                actual: frame.pixels().len(),
            });
        }

        let active = self.ctrl(frame_ctrl::ACTIVE).load(Ordering::Relaxed) as usize & 1;
        let target = active ^ 1;

        let seq = self.slot_seq(target).load(Ordering::Relaxed);
        self.slot_seq(target)
            .store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        self.region
            .copy_in(self.layout.pixel_slot_offset(target), frame.pixels());
        self.slot_seq(target)
            .store(seq.wrapping_add(2), Ordering::Release);

        let header_seq = self.ctrl(frame_ctrl::HEADER_SEQ).load(Ordering::Relaxed);
        self.ctrl(frame_ctrl::HEADER_SEQ)
            .store(header_seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        let generation = self.ctrl(frame_ctrl::GENERATION).load(Ordering::Relaxed);
        let resized = generation == 0
            || self.ctrl(frame_ctrl::WIDTH).load(Ordering::Relaxed) != width
            || self.ctrl(frame_ctrl::HEIGHT).load(Ordering::Relaxed) != height;
        let mut size_stamp = self.ctrl(frame_ctrl::SIZE_STAMP).load(Ordering::Relaxed);
        if resized {
            size_stamp = size_stamp.wrapping_add(1);
            self.ctrl(frame_ctrl::SIZE_STAMP)
                .store(size_stamp, Ordering::Relaxed);
        }
        let generation = generation.wrapping_add(1);

        self.ctrl(frame_ctrl::ACTIVE)
            .store(target as u32, Ordering::Relaxed);
        self.ctrl(frame_ctrl::WIDTH).store(width, Ordering::Relaxed);
        self.ctrl(frame_ctrl::HEIGHT).store(height, Ordering::Relaxed);
        self.ctrl(frame_ctrl::STRIDE)
            .store(width * BYTES_PER_PIXEL as u32, Ordering::Relaxed);
        self.ctrl(frame_ctrl::GENERATION)
            .store(generation, Ordering::Relaxed);
        self.ctrl(frame_ctrl::HEADER_SEQ)
            .store(header_seq.wrapping_add(2), Ordering::Release);

        if resized {
            log::debug!("Frame size is now {width}x{height} (stamp {size_stamp})");
        }
        log::trace!("Published frame {generation} into slot {target}");
        Ok(PublishOutcome {
            generation,
            size_stamp,
            resized,
        })
    }

    /// Copies the most recently published frame (host side).
    ///
    /// Returns `Ok(None)` before the first publish.
    pub fn current(&self) -> Result<Option<Frame>, FrameReadError> {
        for _ in 0..READ_ATTEMPTS {
            let before = self.ctrl(frame_ctrl::HEADER_SEQ).load(Ordering::Acquire);
            if before & 1 != 0 {
                std::hint::spin_loop();
                continue;
            }

            let generation = self.ctrl(frame_ctrl::GENERATION).load(Ordering::Relaxed);
            let active = self.ctrl(frame_ctrl::ACTIVE).load(Ordering::Relaxed);
            let width = self.ctrl(frame_ctrl::WIDTH).load(Ordering::Relaxed);
            let height = self.ctrl(frame_ctrl::HEIGHT).load(Ordering::Relaxed);
            let size_stamp = self.ctrl(frame_ctrl::SIZE_STAMP).load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            if self.ctrl(frame_ctrl::HEADER_SEQ).load(Ordering::Relaxed) != before {
                continue;
            }

            if generation == 0 {
                return Ok(None);
            }
            if active > 1 || width > self.layout.max_width || height > self.layout.max_height {
                return Err(FrameReadError::Corrupt);
            }
            let slot = active as usize;
            let len = frame_len(width, height).ok_or(FrameReadError::Corrupt)?;

            let slot_before = self.slot_seq(slot).load(Ordering::Acquire);
            if slot_before & 1 != 0 {
                continue;
            }
            let mut pixels = vec![0u8; len];
            self.region
                .copy_out(self.layout.pixel_slot_offset(slot), &mut pixels);
            fence(Ordering::Acquire);
            if self.slot_seq(slot).load(Ordering::Relaxed) != slot_before
                || self.ctrl(frame_ctrl::HEADER_SEQ).load(Ordering::Relaxed) != before
            {
                continue;
            }

            let frame = Frame::new(pixels, width, height)
                .map_err(|_| FrameReadError::Corrupt)?
                .with_stamps(generation, size_stamp);
            return Ok(Some(frame));
        }
        Err(FrameReadError::Contended)
    }

    /// Asks the renderer to resize its surface (host side).
    pub fn request_size(&self, width: u32, height: u32) {
        self.ctrl(frame_ctrl::REQUESTED_WIDTH)
            .store(width, Ordering::Relaxed);
        self.ctrl(frame_ctrl::REQUESTED_HEIGHT)
            .store(height, Ordering::Relaxed);
        self.ctrl(frame_ctrl::REQUEST_SEQ)
            .fetch_add(1, Ordering::Release);
    }

    /// Returns the size the host asked for since the last call (renderer side).
    ///
    /// Requests are clamped to the channel maximum. Zero-sized requests are
    /// dropped.
    pub fn take_size_request(&mut self) -> Option<(u32, u32)> {
        let seq = self.ctrl(frame_ctrl::REQUEST_SEQ).load(Ordering::Acquire);
        if seq == self.last_request {
            return None;
        }
        let width = self.ctrl(frame_ctrl::REQUESTED_WIDTH).load(Ordering::Relaxed);
        let height = self
            .ctrl(frame_ctrl::REQUESTED_HEIGHT)
            .load(Ordering::Relaxed);
        fence(Ordering::Acquire);
        if self.ctrl(frame_ctrl::REQUEST_SEQ).load(Ordering::Relaxed) != seq {
            // The host is mid-request; pick it up next time.
            return None;
        }
        self.last_request = seq;

        if width == 0 || height == 0 {
            log::warn!("Ignoring size request {width}x{height}");
            return None;
        }
        let (max_width, max_height) = self.max_dimensions();
        Some((width.min(max_width), height.min(max_height)))
    }
}

impl FrameSink for FrameChannel {
    fn publish(&mut self, frame: FrameView<'_>) -> Result<PublishOutcome, PublishError> {
        FrameChannel::publish(self, frame)
    }

    fn take_size_request(&mut self) -> Option<(u32, u32)> {
        FrameChannel::take_size_request(self)
    }
}

impl std::fmt::Debug for FrameChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameChannel")
            .field("max_width", &self.layout.max_width)
            .field("max_height", &self.layout.max_height)
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::SegmentConfig;

    fn channel(max_width: u32, max_height: u32) -> FrameChannel {
        let layout = SegmentLayout::new(&SegmentConfig {
            max_width,
            max_height,
            event_capacity: 2,
        })
        .unwrap();
        let region = Arc::new(Region::heap(layout.total_bytes));
        region
            .atomic_u32(header::MAGIC)
            .store(SEGMENT_MAGIC, Ordering::Release);
        FrameChannel::new(region, layout)
    }

    fn filled(width: u32, height: u32, byte: u8) -> Vec<u8> {
        vec![byte; frame_len(width, height).unwrap()]
    }

    #[test]
    fn empty_before_first_publish() {
        let frames = channel(8, 8);
        assert_eq!(frames.current(), Ok(None));
        assert_eq!(frames.generation(), 0);
    }

    #[test]
    fn publish_then_read_is_bit_exact() {
        let frames = channel(16, 16);
        let pixels: Vec<u8> = (0..frame_len(5, 3).unwrap()).map(|i| i as u8).collect();
        let outcome = frames
            .publish(FrameView::new(&pixels, 5, 3).unwrap())
            .unwrap();
        assert_eq!(
            outcome,
            PublishOutcome {
                generation: 1,
                size_stamp: 1,
                resized: true
            }
        );

        let frame = frames.current().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (5, 3));
        assert_eq!(frame.stride(), 20);
        assert_eq!(frame.pixels(), pixels.as_slice());
        assert_eq!(frame.generation(), 1);
    }

    #[test]
    fn same_size_publish_keeps_the_stamp() {
        let frames = channel(8, 8);
        let a = filled(4, 4, 1);
        let b = filled(4, 4, 2);
        frames.publish(FrameView::new(&a, 4, 4).unwrap()).unwrap();
        let outcome = frames.publish(FrameView::new(&b, 4, 4).unwrap()).unwrap();
        assert!(!outcome.resized);
        assert_eq!(outcome.size_stamp, 1);
        assert_eq!(outcome.generation, 2);
        assert_eq!(frames.current().unwrap().unwrap().pixels(), b.as_slice());
    }

    #[test]
    fn last_of_several_resizes_wins() {
        let frames = channel(8, 8);
        for (w, h) in [(2, 2), (8, 1), (3, 7), (3, 7), (6, 6)] {
            let pixels = filled(w, h, w as u8);
            frames.publish(FrameView::new(&pixels, w, h).unwrap()).unwrap();
        }
        let frame = frames.current().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (6, 6));
        assert_eq!(frame.size_stamp(), 4);
        assert!(frame.pixels().iter().all(|&b| b == 6));
    }

    #[test]
    fn oversized_frames_leave_the_current_frame_alone() {
        let frames = channel(4, 4);
        let ok = filled(4, 4, 9);
        frames.publish(FrameView::new(&ok, 4, 4).unwrap()).unwrap();

        let big = filled(5, 4, 1);
        assert_eq!(
            frames.publish(FrameView::new(&big, 5, 4).unwrap()),
            Err(PublishError::InvalidDimensions {
                width: 5,
                height: 4,
                max_width: 4,
                max_height: 4
            })
        );
        let empty = FrameView::new(&[], 0, 4).unwrap();
        assert!(matches!(
            frames.publish(empty),
            Err(PublishError::InvalidDimensions { .. })
        ));
        assert_eq!(frames.current().unwrap().unwrap().pixels(), ok.as_slice());
    }

    #[test]
    fn retired_segment_closes_the_channel() {
        let frames = channel(4, 4);
        frames
            .region
            .atomic_u32(header::MAGIC)
            .store(0, Ordering::Release);
        let pixels = filled(1, 1, 0);
        let err = frames
            .publish(FrameView::new(&pixels, 1, 1).unwrap())
            .unwrap_err();
        assert_eq!(err, PublishError::Closed);
        assert!(err.is_fatal());
    }

    #[test]
    fn size_requests_are_taken_once() {
        let mut renderer = channel(100, 100);
        let host = FrameChannel::new(Arc::clone(&renderer.region), renderer.layout);
        assert_eq!(renderer.take_size_request(), None);

        host.request_size(40, 30);
        assert_eq!(renderer.take_size_request(), Some((40, 30)));
        assert_eq!(renderer.take_size_request(), None);

        host.request_size(500, 20);
        assert_eq!(renderer.take_size_request(), Some((100, 20)));

        host.request_size(0, 20);
        assert_eq!(renderer.take_size_request(), None);
    }

    #[test]
    fn concurrent_reader_never_sees_a_torn_frame() {
        let writer = channel(32, 32);
        let reader = FrameChannel::new(Arc::clone(&writer.region), writer.layout);

        let handle = std::thread::spawn(move || {
            for i in 0..500u32 {
                let (w, h) = if i % 3 == 0 { (32, 32) } else { (16, 8) };
                let pixels = filled(w, h, (i % 251) as u8);
                writer
                    .publish(FrameView::new(&pixels, w, h).unwrap())
                    .unwrap();
            }
        });

        let mut observed = 0;
        while !handle.is_finished() || observed == 0 {
            match reader.current() {
                Ok(Some(frame)) => {
                    let first = frame.pixels()[0];
                    assert!(frame.pixels().iter().all(|&b| b == first), "torn frame");
                    assert_eq!(
                        frame.pixels().len(),
                        frame_len(frame.width(), frame.height()).unwrap()
                    );
                    observed += 1;
                }
                Ok(None) | Err(FrameReadError::Contended) => std::thread::yield_now(),
                Err(FrameReadError::Corrupt) => panic!("corrupt control block"),
            }
        }
        handle.join().expect("writer thread panicked");
        assert!(observed > 0);
    }
}
