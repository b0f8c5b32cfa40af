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

//! The renderer-side runtime of the bridge.
//!
//! [`EventDispatcher`] turns host pointer events into toolkit interaction,
//! synthesizing enter and leave as the pointer crosses receivers.
//! [`RenderPump`] drives it on a fixed tick and publishes every finished
//! repaint.

#![warn(missing_docs)]

pub mod dispatcher;
pub mod pump;

pub use dispatcher::{DispatchOutcome, EventDispatcher, HoverState};
pub use pump::{PumpConfig, PumpConfigError, PumpStats, RenderPump};
