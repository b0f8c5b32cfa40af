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

//! Rendered frames.
//!
//! Pixels are premultiplied ARGB, one native-endian `u32` per pixel, rows
//! packed with `stride == 4 * width`. Two representations exist:
//!
//! - [`FrameView`] borrows pixels for the duration of a single repaint
//!   callback. It cannot outlive that call.
//! - [`Frame`] owns its pixels behind an `Arc`, so it can be queued and
//!   cloned cheaply.

use crate::error::PublishError;
use std::fmt;
use std::sync::Arc;

/// Bytes per ARGB pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Returns the buffer length required for `width x height`, if it fits `usize`.
pub fn frame_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

fn check_len(width: u32, height: u32, actual: usize) -> Result<(), PublishError> {
    let expected = frame_len(width, height).unwrap_or(usize::MAX);
    if expected != actual {
        return Err(PublishError::LengthMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// A read-only view of freshly painted pixels.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameView<'a> {
    /// Wraps `pixels`, checking that the length matches the dimensions.
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self, PublishError> {
        check_len(width, height, pixels.len())?;
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// The pixel bytes.
    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row length in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Copies the view into an owned frame with zeroed stamps.
    pub fn to_frame(&self) -> Frame {
        Frame {
            pixels: Arc::from(self.pixels),
            width: self.width,
            height: self.height,
            generation: 0,
            size_stamp: 0,
        }
    }
}

impl fmt::Debug for FrameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// An owned, reference-counted frame.
///
/// `generation` counts publishes on the channel the frame came from.
/// `size_stamp` changes whenever the published dimensions change, so a reader
/// can tell that its display surface must be re-fitted.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    generation: u32,
    size_stamp: u32,
}

impl Frame {
    /// Takes ownership of `pixels`, checking the length against the dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, PublishError> {
        check_len(width, height, pixels.len())?;
        Ok(Self {
            pixels: pixels.into(),
            width,
            height,
            generation: 0,
            size_stamp: 0,
        })
    }

    /// Returns a copy of the frame carrying channel stamps.
    pub fn with_stamps(mut self, generation: u32, size_stamp: u32) -> Self {
        self.generation = generation;
        self.size_stamp = size_stamp;
        self
    }

    /// Borrows the frame as a view.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
        }
    }

    /// The pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row length in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Publish counter of the source channel, `0` for frames never published.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Size stamp of the source channel.
    pub fn size_stamp(&self) -> u32 {
        self.size_stamp
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("generation", &self.generation)
            .field("size_stamp", &self.size_stamp)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// What a successful publish did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Generation of the frame just published.
    pub generation: u32,
    /// Size stamp after the publish.
    pub size_stamp: u32,
    /// Whether the dimensions differ from the previous publish (always true
    /// for the first one).
    pub resized: bool,
}
