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

//! Hit-testing and enter/leave synthesis.

use fxbridge_core::event::{InputEvent, MouseAction, MouseEvent, Point};
use fxbridge_core::platform::{SyntheticEvent, SyntheticKind, WidgetHost};
use fxbridge_core::DispatchError;

/// Which receiver the pointer is currently over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverState<R> {
    /// No event has resolved a receiver yet.
    NoTarget,
    /// The pointer was last seen over `receiver` at `last_point`.
    TargetActive {
        /// The receiver that got the last Enter.
        receiver: R,
        /// Where the last resolved event happened.
        last_point: Point,
    },
}

impl<R> HoverState<R> {
    /// The active receiver, if any.
    pub fn receiver(&self) -> Option<&R> {
        match self {
            Self::NoTarget => None,
            Self::TargetActive { receiver, .. } => Some(receiver),
        }
    }

    /// The point of the last resolved event, if any.
    pub fn last_point(&self) -> Option<Point> {
        match self {
            Self::NoTarget => None,
            Self::TargetActive { last_point, .. } => Some(*last_point),
        }
    }
}

/// What [`EventDispatcher::dispatch`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a mouse event; nothing happened.
    Ignored,
    /// No receiver under the pointer; nothing happened.
    NoReceiver,
    /// The native event was delivered. `entered` is set when the receiver
    /// changed and Enter was synthesized first.
    Delivered {
        /// Whether this event moved the pointer onto a new receiver.
        entered: bool,
    },
}

/// Routes pointer events to toolkit receivers.
///
/// For each mouse event the receiver under the pointer is resolved. When it
/// differs from the previous one, the old receiver gets Leave at the old point
/// and the new one gets Enter at the new point. The native move, press or
/// release follows.
#[derive(Debug)]
pub struct EventDispatcher<R> {
    hover: HoverState<R>,
    delivered: u64,
    dropped: u64,
}

impl<R: Clone + PartialEq + std::fmt::Debug> EventDispatcher<R> {
    /// Creates a dispatcher with no active receiver.
    pub fn new() -> Self {
        Self {
            hover: HoverState::NoTarget,
            delivered: 0,
            dropped: 0,
        }
    }

    /// The current hover state.
    pub fn hover(&self) -> &HoverState<R> {
        &self.hover
    }

    /// Events whose native delivery succeeded.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Events dropped because they were malformed or refused.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Dispatches one event to `host`.
    ///
    /// A refused delivery drops the event but the hover state still advances,
    /// so the next event sees a consistent receiver.
    pub fn dispatch<H>(
        &mut self,
        host: &mut H,
        event: &InputEvent,
    ) -> Result<DispatchOutcome, DispatchError>
    where
        H: WidgetHost<Receiver = R>,
    {
        let mouse = match event {
            InputEvent::Mouse(mouse) => mouse,
            InputEvent::Unsupported { kind } => {
                log::trace!("Ignoring input kind {kind:#x}");
                return Ok(DispatchOutcome::Ignored);
            }
            InputEvent::Malformed { kind } => {
                self.dropped += 1;
                return Err(DispatchError::Malformed { kind: *kind });
            }
        };

        let point = mouse.position;
        let Some(receiver) = host.resolve_receiver(point) else {
            log::trace!("No receiver at {point:?}");
            return Ok(DispatchOutcome::NoReceiver);
        };

        let mut first_error = None;
        let entered = self.hover.receiver() != Some(&receiver);
        if entered {
            if let HoverState::TargetActive {
                receiver: previous,
                last_point,
            } = &self.hover
            {
                let leave = SyntheticEvent::new(SyntheticKind::Leave, *last_point);
                if let Err(e) = host.deliver(previous, leave) {
                    first_error.get_or_insert(e);
                }
            }
            let enter = SyntheticEvent::new(SyntheticKind::Enter, point);
            if let Err(e) = host.deliver(&receiver, enter) {
                first_error.get_or_insert(e);
            }
            log::trace!("Pointer entered {receiver:?} at {point:?}");
        }

        let native = SyntheticEvent::new(native_kind(mouse), point);
        if let Err(e) = host.deliver(&receiver, native) {
            first_error.get_or_insert(e);
        }

        self.hover = HoverState::TargetActive {
            receiver,
            last_point: point,
        };

        match first_error {
            Some(e) => {
                self.dropped += 1;
                Err(e)
            }
            None => {
                self.delivered += 1;
                Ok(DispatchOutcome::Delivered { entered })
            }
        }
    }
}

impl<R: Clone + PartialEq + std::fmt::Debug> Default for EventDispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn native_kind(mouse: &MouseEvent) -> SyntheticKind {
    match mouse.action {
        MouseAction::Moved => SyntheticKind::Move,
        MouseAction::Pressed => SyntheticKind::Press(mouse.buttons.native_button()),
        MouseAction::Released => SyntheticKind::Release(mouse.buttons.native_button()),
    }
}
