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

//! The shared segment between the renderer and the host.
//!
//! One named mapping holds a header, an SPSC event ring (host writes, renderer
//! drains) and a double-buffered frame area (renderer writes, host reads).
//! See [`layout`] for the byte-level contract.

mod config;
mod event_ring;
mod frame_slot;
pub mod layout;
#[cfg(unix)]
mod posix;
mod region;
mod segment;

pub use self::config::SegmentConfig;
pub use self::event_ring::{EventChannel, PushError};
pub use self::frame_slot::{FrameChannel, FrameReadError};
pub use self::layout::{LayoutError, SegmentLayout};
pub use self::segment::{normalize_name, DeleteOutcome, SegmentError, SharedSegment};
