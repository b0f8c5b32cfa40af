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

//! Defines the error types raised while dispatching input and publishing frames.
//!
//! Segment allocation errors live with the shared-memory implementation in
//! `fxbridge-infra`; argument errors live with the server binary.

use crate::platform::SyntheticKind;
use thiserror::Error;

/// An input event could not be turned into toolkit interaction.
///
/// Dispatch errors are always recovered locally: the offending event is
/// dropped and the tick continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A mouse record arrived without any action bit.
    #[error("malformed mouse event (kind bits {kind:#x})")]
    Malformed {
        /// The raw kind bits.
        kind: u32,
    },
    /// The toolkit refused a synthesized event.
    #[error("toolkit rejected {kind:?} event: {reason}")]
    Delivery {
        /// The kind of event that was refused.
        kind: SyntheticKind,
        /// The toolkit's explanation.
        reason: String,
    },
}

/// A frame could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The dimensions are zero or exceed what the channel was sized for.
    #[error("frame {width}x{height} does not fit the channel maximum {max_width}x{max_height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Channel maximum width.
        max_width: u32,
        /// Channel maximum height.
        max_height: u32,
    },
    /// The pixel buffer length does not equal `4 * width * height`.
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    LengthMismatch {
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
        /// Required length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        actual: usize,
    },
    /// The backing segment was deleted or retired underneath the writer.
    #[error("frame channel is closed")]
    Closed,
}

impl PublishError {
    /// Whether the error means no later publish can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_closed_is_fatal() {
        assert!(PublishError::Closed.is_fatal());
        assert!(!PublishError::LengthMismatch {
            width: 1,
            height: 1,
            expected: 4,
            actual: 3,
        }
        .is_fatal());
        assert!(!PublishError::InvalidDimensions {
            width: 0,
            height: 1,
            max_width: 8,
            max_height: 8,
        }
        .is_fatal());
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = DispatchError::Malformed { kind: 0x11 };
        assert_eq!(err.to_string(), "malformed mouse event (kind bits 0x11)");

        let err = PublishError::InvalidDimensions {
            width: 9000,
            height: 10,
            max_width: 4096,
            max_height: 4096,
        };
        assert!(err.to_string().contains("9000x10"));
    }
}
