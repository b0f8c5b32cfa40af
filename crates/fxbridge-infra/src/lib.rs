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

//! Provides concrete implementations for the contracts in `fxbridge-core`.
//!
//! - [`shm`]: the named shared-memory segment holding the frame slot and the
//!   event ring.
//! - [`platform`]: a headless reference toolkit that paints a small page and
//!   reacts to synthesized pointer input.

#![warn(missing_docs)]

pub mod platform;
pub mod shm;

pub use platform::headless::{HeadlessPage, WidgetId};
pub use shm::{
    DeleteOutcome, EventChannel, FrameChannel, FrameReadError, LayoutError, PushError,
    SegmentConfig, SegmentError, SegmentLayout, SharedSegment,
};
