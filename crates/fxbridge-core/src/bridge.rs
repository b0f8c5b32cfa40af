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

//! Renderer-side contracts for the two halves of the shared segment.
//!
//! The render pump talks to the segment only through these traits, so it can
//! be driven by in-memory sources and sinks in tests.

use crate::error::PublishError;
use crate::event::InputEvent;
use crate::frame::{FrameView, PublishOutcome};

/// The consuming end of the host's input queue.
pub trait EventSource {
    /// Drains every pending event in FIFO order.
    ///
    /// Never blocks. Returns an empty vector when nothing is pending.
    fn pop_all(&mut self) -> Vec<InputEvent>;

    /// Whether the host has asked the renderer to stop.
    fn shutdown_requested(&self) -> bool {
        false
    }
}

/// The producing end of the frame transfer area.
pub trait FrameSink {
    /// Replaces the current frame with `frame`.
    fn publish(&mut self, frame: FrameView<'_>) -> Result<PublishOutcome, PublishError>;

    /// Returns a surface size the host asked for since the last call, if any.
    fn take_size_request(&mut self) -> Option<(u32, u32)> {
        None
    }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn pop_all(&mut self) -> Vec<InputEvent> {
        (**self).pop_all()
    }

    fn shutdown_requested(&self) -> bool {
        (**self).shutdown_requested()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn publish(&mut self, frame: FrameView<'_>) -> Result<PublishOutcome, PublishError> {
        (**self).publish(frame)
    }

    fn take_size_request(&mut self) -> Option<(u32, u32)> {
        (**self).take_size_request()
    }
}
