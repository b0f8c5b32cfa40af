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

//! Byte-level layout of a shared segment.
//!
//! Every region starts on a [`REGION_ALIGN`] boundary. All integers are
//! little-endian; control words are accessed atomically.
//!
//! ```text
//! 0             segment header            64 bytes
//! event_offset  ring control block        64 bytes
//!               ring slots                capacity * 16 bytes
//! frame_offset  frame control block       64 bytes
//!               slot sequence words       64 bytes
//!               pixel slot 0              max_width * max_height * 4 bytes
//!               pixel slot 1              max_width * max_height * 4 bytes
//! ```

use super::config::SegmentConfig;
use fxbridge_core::event::WIRE_EVENT_SIZE;
use fxbridge_core::frame::BYTES_PER_PIXEL;
use thiserror::Error;

/// `b"NFXB"` as a little-endian `u32`.
pub const SEGMENT_MAGIC: u32 = u32::from_le_bytes(*b"NFXB");

/// Layout version written into the header.
pub const SEGMENT_VERSION: u32 = 1;

/// Alignment of every region inside the segment.
pub const REGION_ALIGN: usize = 64;

/// Largest accepted `max_width` / `max_height`.
pub const MAX_DIMENSION: u32 = 16384;

/// Smallest accepted event capacity.
pub const MIN_EVENT_CAPACITY: u32 = 2;

/// Largest accepted event capacity.
pub const MAX_EVENT_CAPACITY: u32 = 65536;

/// Byte offsets inside the segment header.
#[allow(missing_docs)]
pub mod header {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 4;
    pub const MAX_WIDTH: usize = 8;
    pub const MAX_HEIGHT: usize = 12;
    pub const EVENT_CAPACITY: usize = 16;
    pub const SHUTDOWN: usize = 20;
    pub const EVENT_OFFSET: usize = 24; // u64
    pub const FRAME_OFFSET: usize = 32; // u64
    pub const TOTAL_BYTES: usize = 40; // u64
    /// Process id of the creator; zero when unknown.
    pub const CREATOR_PID: usize = 48;
    pub const BYTES: usize = 64;
}

/// Byte offsets inside the event ring control block.
#[allow(missing_docs)]
pub mod ring_ctrl {
    /// Reader-owned, free-running.
    pub const HEAD: usize = 0;
    /// Writer-owned, free-running.
    pub const TAIL: usize = 4;
    pub const CAPACITY: usize = 8;
    /// Pushes refused because the ring was full.
    pub const REJECTED: usize = 12;
    pub const BYTES: usize = 64;
}

/// Byte offsets inside the frame control block.
#[allow(missing_docs)]
pub mod frame_ctrl {
    /// Seqlock over every field below; odd while the writer updates them.
    pub const HEADER_SEQ: usize = 0;
    pub const ACTIVE: usize = 4;
    pub const WIDTH: usize = 8;
    pub const HEIGHT: usize = 12;
    pub const STRIDE: usize = 16;
    pub const GENERATION: usize = 20;
    pub const SIZE_STAMP: usize = 24;
    pub const REQUESTED_WIDTH: usize = 28;
    pub const REQUESTED_HEIGHT: usize = 32;
    pub const REQUEST_SEQ: usize = 36;
    pub const BYTES: usize = 64;

    /// Per-slot sequence words, in the block that follows the control block.
    pub const SLOT_SEQ: [usize; 2] = [0, 4];
    pub const SLOT_SEQ_BYTES: usize = 64;
}

/// The segment could not be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The maximum frame size is zero or above [`MAX_DIMENSION`].
    #[error("maximum frame size {max_width}x{max_height} is out of range")]
    InvalidDimensions {
        /// Requested maximum width.
        max_width: u32,
        /// Requested maximum height.
        max_height: u32,
    },
    /// The event capacity is not a power of two in the accepted range.
    #[error("event capacity {capacity} must be a power of two between 2 and 65536")]
    InvalidCapacity {
        /// Requested capacity.
        capacity: u32,
    },
    /// The total size overflows the address space.
    #[error("segment size overflows the address space")]
    TooLarge,
}

/// Resolved offsets and sizes for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    /// Largest frame width.
    pub max_width: u32,
    /// Largest frame height.
    pub max_height: u32,
    /// Number of event slots.
    pub event_capacity: u32,
    /// Offset of the ring control block.
    pub event_offset: usize,
    /// Offset of the frame control block.
    pub frame_offset: usize,
    /// Size of one pixel slot.
    pub slot_bytes: usize,
    /// Size of the whole mapping.
    pub total_bytes: usize,
}

pub(crate) const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

fn checked_align_up(value: usize) -> Option<usize> {
    value
        .checked_add(REGION_ALIGN - 1)
        .map(|v| v & !(REGION_ALIGN - 1))
}

impl SegmentLayout {
    /// Lays out a segment for `config`.
    pub fn new(config: &SegmentConfig) -> Result<Self, LayoutError> {
        config.validate()?;

        let event_offset = header::BYTES;
        let ring_bytes = ring_ctrl::BYTES + config.event_capacity as usize * WIRE_EVENT_SIZE;
        let frame_offset = event_offset + align_up(ring_bytes, REGION_ALIGN);

        let slot_bytes = (config.max_width as usize)
            .checked_mul(config.max_height as usize)
            .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
            .and_then(checked_align_up)
            .ok_or(LayoutError::TooLarge)?;

        let total_bytes = slot_bytes
            .checked_mul(2)
            .and_then(|slots| slots.checked_add(frame_ctrl::BYTES + frame_ctrl::SLOT_SEQ_BYTES))
            .and_then(|frame| frame.checked_add(frame_offset))
            .ok_or(LayoutError::TooLarge)?;

        Ok(Self {
            max_width: config.max_width,
            max_height: config.max_height,
            event_capacity: config.event_capacity,
            event_offset,
            frame_offset,
            slot_bytes,
            total_bytes,
        })
    }

    /// The sizing this layout was built from.
    pub fn config(&self) -> SegmentConfig {
        SegmentConfig {
            max_width: self.max_width,
            max_height: self.max_height,
            event_capacity: self.event_capacity,
        }
    }

    /// Offset of the first ring slot.
    pub fn event_slots_offset(&self) -> usize {
        self.event_offset + ring_ctrl::BYTES
    }

    /// Offset of the slot sequence block.
    pub fn slot_seq_offset(&self) -> usize {
        self.frame_offset + frame_ctrl::BYTES
    }

    /// Offset of pixel slot `index` (0 or 1).
    pub fn pixel_slot_offset(&self, index: usize) -> usize {
        self.slot_seq_offset() + frame_ctrl::SLOT_SEQ_BYTES + index * self.slot_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SegmentConfig {
        SegmentConfig {
            max_width: 10,
            max_height: 3,
            event_capacity: 8,
        }
    }

    #[test]
    fn magic_spells_nfxb() {
        assert_eq!(SEGMENT_MAGIC.to_le_bytes(), *b"NFXB");
    }

    #[test]
    fn regions_are_aligned_and_ordered() {
        let layout = SegmentLayout::new(&small()).unwrap();
        assert_eq!(layout.event_offset, 64);
        // 64 control + 8 * 16 slots = 192
        assert_eq!(layout.frame_offset, 64 + 192);
        // 10 * 3 * 4 = 120, rounded to 128
        assert_eq!(layout.slot_bytes, 128);
        assert_eq!(layout.pixel_slot_offset(0), layout.frame_offset + 128);
        assert_eq!(layout.pixel_slot_offset(1), layout.pixel_slot_offset(0) + 128);
        assert_eq!(layout.total_bytes, layout.pixel_slot_offset(1) + 128);

        for offset in [
            layout.event_offset,
            layout.frame_offset,
            layout.pixel_slot_offset(0),
            layout.pixel_slot_offset(1),
            layout.total_bytes,
        ] {
            assert_eq!(offset % REGION_ALIGN, 0);
        }
    }

    #[test]
    fn invalid_config_does_not_lay_out() {
        let config = SegmentConfig {
            event_capacity: 5,
            ..small()
        };
        assert_eq!(
            SegmentLayout::new(&config),
            Err(LayoutError::InvalidCapacity { capacity: 5 })
        );
    }

    #[test]
    fn config_round_trips_through_layout() {
        let layout = SegmentLayout::new(&small()).unwrap();
        assert_eq!(layout.config(), small());
    }
}
