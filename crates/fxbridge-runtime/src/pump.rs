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

//! The periodic driver of the renderer.
//!
//! Everything runs on the thread that calls [`RenderPump::run`]:
//!
//! 1. Every tick the pump applies a pending host size request, then drains the
//!    event ring and dispatches each event in order.
//! 2. Between ticks the toolkit gets a turn to repaint. A finished repaint
//!    reaches the pump through an [`EventBus`] as an owned [`Frame`].
//! 3. For each frame the pump drains input once more, resizes the surface if
//!    the dimensions changed since the last publish, and publishes.

use crate::dispatcher::EventDispatcher;
use fxbridge_core::event::EventBus;
use fxbridge_core::frame::{Frame, FrameView};
use fxbridge_core::platform::{RenderSurface, WidgetHost};
use fxbridge_core::{EventSource, FrameSink};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Configuration for the render pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Period of the input tick in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

/// The pump configuration is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PumpConfigError {
    /// A zero tick would spin the loop.
    #[error("tick interval must be at least 1 ms")]
    TickTooShort,
}

impl PumpConfig {
    /// The tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<(), PumpConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(PumpConfigError::TickTooShort);
        }
        Ok(())
    }
}

/// Counters collected while the pump runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Ticks performed.
    pub ticks: u64,
    /// Events delivered to the toolkit.
    pub events_dispatched: u64,
    /// Events dropped as malformed or refused.
    pub events_dropped: u64,
    /// Frames published.
    pub frames_published: u64,
    /// Frames that failed to publish.
    pub publish_failures: u64,
    /// Surface resizes, counting host requests and published size changes.
    pub surface_resizes: u64,
}

/// Drives one toolkit against one event source and one frame sink.
pub struct RenderPump<T, E, F>
where
    T: WidgetHost + RenderSurface,
{
    toolkit: T,
    events: E,
    frames: F,
    dispatcher: EventDispatcher<T::Receiver>,
    repaints: EventBus<Frame>,
    config: PumpConfig,
    last_published: Option<(u32, u32)>,
    frame_path_open: bool,
    stats: PumpStats,
}

impl<T, E, F> RenderPump<T, E, F>
where
    T: WidgetHost + RenderSurface,
    E: EventSource,
    F: FrameSink,
{
    /// Creates a pump and installs its repaint hook on `toolkit`.
    pub fn new(mut toolkit: T, events: E, frames: F, config: PumpConfig) -> Self {
        let repaints = EventBus::new();
        let sender = repaints.sender();
        toolkit.on_repaint_complete(Box::new(move |view: FrameView<'_>| {
            if sender.send(view.to_frame()).is_err() {
                log::debug!("Render pump is gone; dropping repaint");
            }
        }));

        Self {
            toolkit,
            events,
            frames,
            dispatcher: EventDispatcher::new(),
            repaints,
            config,
            last_published: None,
            frame_path_open: true,
            stats: PumpStats::default(),
        }
    }

    /// The toolkit being driven.
    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    /// Mutable access to the toolkit.
    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    /// The event source.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// The frame sink.
    pub fn frames(&self) -> &F {
        &self.frames
    }

    /// Mutable access to the frame sink.
    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    /// The dispatcher and its hover state.
    pub fn dispatcher(&self) -> &EventDispatcher<T::Receiver> {
        &self.dispatcher
    }

    /// Whether frames are still being published.
    pub fn frame_path_open(&self) -> bool {
        self.frame_path_open
    }

    /// Counters so far.
    pub fn stats(&self) -> PumpStats {
        PumpStats {
            events_dispatched: self.dispatcher.delivered(),
            events_dropped: self.dispatcher.dropped(),
            ..self.stats
        }
    }

    /// Applies a pending size request and dispatches every pending event.
    pub fn tick(&mut self) {
        self.stats.ticks += 1;

        if let Some((width, height)) = self.frames.take_size_request() {
            if self.toolkit.surface_size() != (width, height) {
                log::info!("Host requested a {width}x{height} surface");
                self.toolkit.resize_surface(width, height);
                self.stats.surface_resizes += 1;
            }
        }

        self.dispatch_pending();
    }

    fn dispatch_pending(&mut self) {
        for event in self.events.pop_all() {
            if let Err(e) = self.dispatcher.dispatch(&mut self.toolkit, &event) {
                log::warn!("Dropped input event: {e}");
            }
        }
    }

    /// Publishes a finished repaint.
    ///
    /// Pending input is dispatched first. When the frame's dimensions differ
    /// from the last published ones the surface is resized before the publish.
    pub fn handle_repaint(&mut self, frame: Frame) {
        self.dispatch_pending();
        if !self.frame_path_open {
            return;
        }

        let dimensions = frame.dimensions();
        let resizing = self.last_published != Some(dimensions);
        if resizing {
            log::debug!(
                "Frame size changed from {:?} to {dimensions:?}",
                self.last_published
            );
            self.toolkit.resize_surface(dimensions.0, dimensions.1);
        }

        match self.frames.publish(frame.view()) {
            Ok(outcome) => {
                // Only dimensions the reader has actually seen count.
                if resizing {
                    self.stats.surface_resizes += 1;
                    self.last_published = Some(dimensions);
                }
                self.stats.frames_published += 1;
                log::trace!("Published frame {}", outcome.generation);
            }
            Err(e) if e.is_fatal() => {
                self.stats.publish_failures += 1;
                self.frame_path_open = false;
                log::error!("Frame output closed, no further frames will be published: {e}");
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                log::warn!("Dropped frame: {e}");
            }
        }
    }

    /// Publishes every repaint already queued. Returns how many were handled.
    pub fn process_repaints(&mut self) -> usize {
        let frames = self.repaints.drain();
        let count = frames.len();
        for frame in frames {
            self.handle_repaint(frame);
        }
        count
    }

    fn should_stop(&self, stop: &AtomicBool) -> bool {
        if stop.load(Ordering::Acquire) {
            log::info!("Render pump stop requested.");
            return true;
        }
        if self.events.shutdown_requested() {
            log::info!("Host requested shutdown.");
            return true;
        }
        false
    }

    /// Runs the loop until `stop` is set or the host requests shutdown.
    pub fn run(&mut self, stop: &AtomicBool) -> PumpStats {
        let interval = self.config.tick_interval();
        log::info!("Render pump started (tick every {interval:?}).");

        let mut next_tick = Instant::now();
        while !self.should_stop(stop) {
            if Instant::now() >= next_tick {
                self.tick();
                next_tick = Instant::now() + interval;
            }
            self.toolkit.advance();
            if let Some(frame) = self.repaints.next_before(next_tick) {
                self.handle_repaint(frame);
            }
        }

        let stats = self.stats();
        log_summary(&stats);
        stats
    }
}

fn log_summary(stats: &PumpStats) {
    log::info!("--- Render Pump Summary ---");
    log::info!("  Ticks: {}", stats.ticks);
    log::info!(
        "  Events: {} dispatched, {} dropped",
        stats.events_dispatched,
        stats.events_dropped
    );
    log::info!(
        "  Frames: {} published, {} failed",
        stats.frames_published,
        stats.publish_failures
    );
    log::info!("  Surface resizes: {}", stats.surface_resizes);
}
