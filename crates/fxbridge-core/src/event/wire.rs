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

//! Fixed-size event records as stored in the shared event ring.
//!
//! Layout (16 bytes, little-endian):
//!
//! ```text
//! 0  kind     u32   EventKind bits
//! 4  x        i32   frame-local
//! 8  y        i32   frame-local
//! 12 buttons  u32   MouseButtons bits
//! ```

use super::input::{InputEvent, MouseAction, MouseButtons, MouseEvent, Point};
use bitflags::bitflags;

/// Size in bytes of one [`WireEvent`].
pub const WIRE_EVENT_SIZE: usize = std::mem::size_of::<WireEvent>();

bitflags! {
    /// Kind bits of a wire record.
    ///
    /// A record is a mouse record iff [`EventKind::MOUSE_EVENT`] is set. The
    /// action bits may be combined; they decode in the order moved, pressed,
    /// released.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKind: u32 {
        /// The record is a mouse record.
        const MOUSE_EVENT = 1 << 0;
        /// The pointer moved.
        const MOUSE_MOVED = 1 << 1;
        /// A button went down.
        const MOUSE_PRESSED = 1 << 2;
        /// A button went up.
        const MOUSE_RELEASED = 1 << 3;
        /// Reserved for keyboard input.
        const KEY_EVENT = 1 << 8;
    }
}

/// One event slot in the shared ring.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireEvent {
    /// Raw [`EventKind`] bits.
    pub kind: u32,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Raw [`MouseButtons`] bits.
    pub buttons: u32,
}

impl WireEvent {
    /// Decodes this record, appending the resulting events to `out`.
    ///
    /// A record can expand to several events when more than one action bit is
    /// set. Records without the mouse bit become [`InputEvent::Unsupported`];
    /// mouse records without an action bit become [`InputEvent::Malformed`].
    pub fn decode_into(&self, out: &mut Vec<InputEvent>) {
        let kind = EventKind::from_bits_retain(self.kind);
        if !kind.contains(EventKind::MOUSE_EVENT) {
            out.push(InputEvent::Unsupported { kind: self.kind });
            return;
        }

        let position = Point::new(self.x, self.y);
        let buttons = MouseButtons::from_bits_truncate(self.buttons);
        let before = out.len();
        for (bit, action) in [
            (EventKind::MOUSE_MOVED, MouseAction::Moved),
            (EventKind::MOUSE_PRESSED, MouseAction::Pressed),
            (EventKind::MOUSE_RELEASED, MouseAction::Released),
        ] {
            if kind.contains(bit) {
                out.push(InputEvent::Mouse(MouseEvent {
                    action,
                    position,
                    buttons,
                }));
            }
        }

        if out.len() == before {
            out.push(InputEvent::Malformed { kind: self.kind });
        }
    }

    /// Decodes this record into a fresh vector.
    pub fn decode(&self) -> Vec<InputEvent> {
        let mut out = Vec::with_capacity(1);
        self.decode_into(&mut out);
        out
    }

    /// Serializes the record to its little-endian byte form.
    pub fn to_le_bytes(&self) -> [u8; WIRE_EVENT_SIZE] {
        let le = WireEvent {
            kind: self.kind.to_le(),
            x: self.x.to_le(),
            y: self.y.to_le(),
            buttons: self.buttons.to_le(),
        };
        bytemuck::cast(le)
    }

    /// Reads a record from its little-endian byte form.
    pub fn from_le_bytes(bytes: [u8; WIRE_EVENT_SIZE]) -> Self {
        let raw: WireEvent = bytemuck::cast(bytes);
        WireEvent {
            kind: u32::from_le(raw.kind),
            x: i32::from_le(raw.x),
            y: i32::from_le(raw.y),
            buttons: u32::from_le(raw.buttons),
        }
    }
}

impl From<&InputEvent> for WireEvent {
    fn from(event: &InputEvent) -> Self {
        match event {
            InputEvent::Mouse(mouse) => {
                let action = match mouse.action {
                    MouseAction::Moved => EventKind::MOUSE_MOVED,
                    MouseAction::Pressed => EventKind::MOUSE_PRESSED,
                    MouseAction::Released => EventKind::MOUSE_RELEASED,
                };
                WireEvent {
                    kind: (EventKind::MOUSE_EVENT | action).bits(),
                    x: mouse.position.x,
                    y: mouse.position.y,
                    buttons: mouse.buttons.bits(),
                }
            }
            InputEvent::Unsupported { kind } | InputEvent::Malformed { kind } => WireEvent {
                kind: *kind,
                ..Default::default()
            },
        }
    }
}
