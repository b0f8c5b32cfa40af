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

//! The bridge's representation of host input.

use bitflags::bitflags;

/// An integer point in frame-local coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Horizontal coordinate in pixels.
    pub x: i32,
    /// Vertical coordinate in pixels.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

bitflags! {
    /// Buttons the host reports as held at the time of an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u32 {
        /// The primary button (usually left).
        const PRIMARY = 1 << 0;
        /// The secondary button (usually right).
        const SECONDARY = 1 << 1;
        /// The middle button (usually the wheel).
        const MIDDLE = 1 << 2;
    }
}

impl MouseButtons {
    /// Maps the held-button mask to the single button a toolkit event carries.
    ///
    /// Bits are checked primary, then secondary, then middle, and a later match
    /// replaces an earlier one. A mask with several bits set therefore maps to
    /// the last matching button.
    pub fn native_button(self) -> MouseButton {
        let mut button = MouseButton::None;
        if self.contains(Self::PRIMARY) {
            button = MouseButton::Left;
        }
        if self.contains(Self::SECONDARY) {
            button = MouseButton::Right;
        }
        if self.contains(Self::MIDDLE) {
            button = MouseButton::Middle;
        }
        button
    }
}

/// A toolkit-side mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    /// No button is involved (moves, enter/leave).
    #[default]
    None,
    /// The left mouse button.
    Left,
    /// The right mouse button.
    Right,
    /// The middle mouse button.
    Middle,
}

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    /// The pointer moved.
    Moved,
    /// A button went down.
    Pressed,
    /// A button went up.
    Released,
}

/// A single pointer event reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// What happened.
    pub action: MouseAction,
    /// Where it happened, in frame-local coordinates.
    pub position: Point,
    /// Buttons held at the time of the event.
    pub buttons: MouseButtons,
}

/// An input event drained from the host.
///
/// Only mouse events carry behavior today. Other kinds are preserved so the
/// dispatcher can ignore them explicitly, and malformed records are preserved
/// so the dispatcher can report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// A pointer event.
    Mouse(MouseEvent),
    /// A kind this bridge does not handle (keyboard, future kinds). Ignored.
    Unsupported {
        /// The raw kind bits from the wire record.
        kind: u32,
    },
    /// A mouse record that carried no action bit.
    Malformed {
        /// The raw kind bits from the wire record.
        kind: u32,
    },
}

impl InputEvent {
    /// A pointer move at `(x, y)`.
    pub fn mouse_moved(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::mouse(MouseAction::Moved, x, y, buttons)
    }

    /// A button press at `(x, y)`.
    pub fn mouse_pressed(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::mouse(MouseAction::Pressed, x, y, buttons)
    }

    /// A button release at `(x, y)`.
    pub fn mouse_released(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::mouse(MouseAction::Released, x, y, buttons)
    }

    fn mouse(action: MouseAction, x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::Mouse(MouseEvent {
            action,
            position: Point::new(x, y),
            buttons,
        })
    }

    /// Returns the pointer position for mouse events.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Mouse(mouse) => Some(mouse.position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_button_masks_map_directly() {
        assert_eq!(MouseButtons::empty().native_button(), MouseButton::None);
        assert_eq!(MouseButtons::PRIMARY.native_button(), MouseButton::Left);
        assert_eq!(MouseButtons::SECONDARY.native_button(), MouseButton::Right);
        assert_eq!(MouseButtons::MIDDLE.native_button(), MouseButton::Middle);
    }

    #[test]
    fn later_button_bits_win() {
        let primary_secondary = MouseButtons::PRIMARY | MouseButtons::SECONDARY;
        assert_eq!(primary_secondary.native_button(), MouseButton::Right);

        let primary_middle = MouseButtons::PRIMARY | MouseButtons::MIDDLE;
        assert_eq!(primary_middle.native_button(), MouseButton::Middle);

        assert_eq!(MouseButtons::all().native_button(), MouseButton::Middle);
    }

    #[test]
    fn constructors_set_action_and_position() {
        let event = InputEvent::mouse_pressed(3, -4, MouseButtons::PRIMARY);
        match event {
            InputEvent::Mouse(mouse) => {
                assert_eq!(mouse.action, MouseAction::Pressed);
                assert_eq!(mouse.position, Point::new(3, -4));
                assert_eq!(mouse.buttons, MouseButtons::PRIMARY);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(InputEvent::Unsupported { kind: 0x100 }.position(), None);
    }
}
