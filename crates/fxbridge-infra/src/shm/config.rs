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

use super::layout::{LayoutError, MAX_DIMENSION, MAX_EVENT_CAPACITY, MIN_EVENT_CAPACITY};
use serde::Deserialize;

/// Sizing of a shared segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Largest frame width the segment can carry.
    pub max_width: u32,
    /// Largest frame height the segment can carry.
    pub max_height: u32,
    /// Number of event slots. Must be a power of two.
    pub event_capacity: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            event_capacity: 1024,
        }
    }
}

impl SegmentConfig {
    /// Checks the limits every segment must respect.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.max_width == 0
            || self.max_height == 0
            || self.max_width > MAX_DIMENSION
            || self.max_height > MAX_DIMENSION
        {
            return Err(LayoutError::InvalidDimensions {
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        if !self.event_capacity.is_power_of_two()
            || !(MIN_EVENT_CAPACITY..=MAX_EVENT_CAPACITY).contains(&self.event_capacity)
        {
            return Err(LayoutError::InvalidCapacity {
                capacity: self.event_capacity,
            });
        }
        Ok(())
    }
}
