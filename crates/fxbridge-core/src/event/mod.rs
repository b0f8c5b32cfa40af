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

//! Input events and event-driven communication primitives.
//!
//! - [`InputEvent`] is the backend-agnostic representation of what the host
//!   reported (pointer position, held buttons, action).
//! - [`WireEvent`] is the fixed 16-byte record stored in the shared event ring.
//! - [`EventBus`] is an in-process MPSC channel, used by the render pump to
//!   receive repaint notifications from the toolkit.

mod bus;
mod input;
mod wire;

pub use self::bus::EventBus;
pub use self::input::{InputEvent, MouseAction, MouseButton, MouseButtons, MouseEvent, Point};
pub use self::wire::{EventKind, WireEvent, WIRE_EVENT_SIZE};
