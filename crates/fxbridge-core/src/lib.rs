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

//! # FxBridge Core
//!
//! Foundational crate containing the types and interface contracts shared by
//! the renderer and the host sides of the frame/event bridge.
//!
//! The renderer draws into a shared segment and drains input written by the
//! host. Everything that both sides must agree on lives here: the input event
//! model and its wire encoding, the frame model, the collaborator traits the
//! rendering toolkit implements, and the process exit status flags.

#![warn(missing_docs)]

pub mod bridge;
pub mod error;
pub mod event;
pub mod frame;
pub mod platform;
pub mod status;

pub use bridge::{EventSource, FrameSink};
pub use error::{DispatchError, PublishError};
pub use event::{
    EventBus, EventKind, InputEvent, MouseAction, MouseButton, MouseButtons, MouseEvent, Point,
    WireEvent,
};
pub use frame::{Frame, FrameView, PublishOutcome, BYTES_PER_PIXEL};
pub use platform::{RenderSurface, RepaintCallback, SyntheticEvent, SyntheticKind, WidgetHost};
pub use status::ExitStatus;
