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

//! Abstract contracts for the rendering toolkit the bridge drives.
//!
//! The bridge never owns a widget tree or a paint engine. It asks a
//! [`WidgetHost`] to resolve receivers and accept synthesized input, and a
//! [`RenderSurface`] to resize, load content and report finished repaints.

pub mod host;
pub mod surface;

pub use self::host::{SyntheticEvent, SyntheticKind, WidgetHost};
pub use self::surface::{RenderSurface, RepaintCallback};
