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

use crate::error::DispatchError;
use crate::event::{MouseButton, Point};
use std::fmt::Debug;

/// The kind of a synthesized toolkit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticKind {
    /// The pointer entered the receiver.
    Enter,
    /// The pointer left the receiver.
    Leave,
    /// The pointer moved over the receiver.
    Move,
    /// A button went down over the receiver.
    Press(MouseButton),
    /// A button went up over the receiver.
    Release(MouseButton),
}

/// A toolkit-native input event addressed to one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticEvent {
    /// What happened.
    pub kind: SyntheticKind,
    /// Where, in frame-local coordinates.
    pub position: Point,
}

impl SyntheticEvent {
    /// Creates a new synthetic event.
    pub fn new(kind: SyntheticKind, position: Point) -> Self {
        Self { kind, position }
    }
}

/// Hit-testing and event delivery provided by the rendering toolkit.
pub trait WidgetHost {
    /// An opaque handle to something that can receive input.
    type Receiver: Clone + PartialEq + Debug;

    /// The topmost interactive widget under `point`.
    fn widget_at(&self, point: Point) -> Option<Self::Receiver>;

    /// The direct child of the root under `point`.
    fn child_at(&self, point: Point) -> Option<Self::Receiver>;

    /// Resolves the receiver for `point`, falling back from the topmost widget
    /// to the root's child.
    fn resolve_receiver(&self, point: Point) -> Option<Self::Receiver> {
        self.widget_at(point).or_else(|| self.child_at(point))
    }

    /// Delivers a synthesized event to `receiver`.
    fn deliver(
        &mut self,
        receiver: &Self::Receiver,
        event: SyntheticEvent,
    ) -> Result<(), DispatchError>;
}
