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

//! The full loop: host writes into a segment, the pump drives the headless
//! page, the host reads frames back.

use fxbridge_core::event::{InputEvent, MouseButtons};
use fxbridge_core::platform::RenderSurface;
use fxbridge_infra::{EventChannel, FrameChannel, HeadlessPage, SegmentConfig, SharedSegment};
use fxbridge_runtime::{PumpConfig, RenderPump};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

fn segment() -> SharedSegment {
    SharedSegment::in_memory(&SegmentConfig {
        max_width: 1024,
        max_height: 768,
        event_capacity: 64,
    })
    .expect("in-memory segment")
}

fn pump_for(
    segment: &SharedSegment,
    tick_interval_ms: u64,
) -> RenderPump<HeadlessPage, EventChannel, FrameChannel> {
    RenderPump::new(
        HeadlessPage::new(),
        segment.event_channel(),
        segment.frame_channel(),
        PumpConfig { tick_interval_ms },
    )
}

fn click_at_button(events: &EventChannel, index: u8) {
    let at = HeadlessPage::button_center(index);
    for event in [
        InputEvent::mouse_moved(at.x, at.y, MouseButtons::empty()),
        InputEvent::mouse_pressed(at.x, at.y, MouseButtons::PRIMARY),
        InputEvent::mouse_released(at.x, at.y, MouseButtons::PRIMARY),
    ] {
        events.try_push(&event).expect("ring has room");
    }
}

#[test]
fn click_reaches_the_page_and_the_frame_reaches_the_host() {
    let segment = segment();
    let host_events = segment.event_channel();
    let host_frames = segment.frame_channel();
    let mut pump = pump_for(&segment, 100);

    assert_eq!(host_frames.current(), Ok(None));

    click_at_button(&host_events, 1);
    pump.tick();
    pump.toolkit_mut().advance();
    assert_eq!(pump.process_repaints(), 1);

    assert_eq!(pump.toolkit().click_count(), 1);
    assert_eq!(pump.toolkit().last_click(), Some(1));
    let frame = host_frames.current().unwrap().expect("a published frame");
    assert_eq!(frame.dimensions(), (1024, 768));
    assert_eq!(frame.pixels().len(), 1024 * 768 * 4);
    assert_eq!(host_events.pending(), 0);
}

#[test]
fn buttonless_press_and_release_are_delivered_quietly() {
    let segment = segment();
    let host_events = segment.event_channel();
    let mut pump = pump_for(&segment, 100);

    let at = HeadlessPage::button_center(0);
    for event in [
        InputEvent::mouse_pressed(at.x, at.y, MouseButtons::empty()),
        InputEvent::mouse_released(at.x, at.y, MouseButtons::empty()),
    ] {
        host_events.try_push(&event).expect("ring has room");
    }
    pump.tick();

    let stats = pump.stats();
    assert_eq!(stats.events_dispatched, 2);
    assert_eq!(stats.events_dropped, 0);
    assert_eq!(pump.toolkit().click_count(), 0);
}

#[test]
fn host_size_request_changes_the_published_size() {
    let segment = segment();
    let host_frames = segment.frame_channel();
    let mut pump = pump_for(&segment, 100);

    pump.toolkit_mut().advance();
    pump.process_repaints();
    let first = host_frames.current().unwrap().unwrap();

    host_frames.request_size(640, 480);
    pump.tick();
    pump.toolkit_mut().advance();
    pump.process_repaints();

    let second = host_frames.current().unwrap().unwrap();
    assert_eq!(second.dimensions(), (640, 480));
    assert_ne!(second.size_stamp(), first.size_stamp());
    assert_eq!(pump.toolkit().surface_size(), (640, 480));
}

#[test]
fn oversized_requests_are_clamped_to_the_segment() {
    let segment = segment();
    let host_frames = segment.frame_channel();
    let mut pump = pump_for(&segment, 100);

    host_frames.request_size(5000, 300);
    pump.tick();
    pump.toolkit_mut().advance();
    pump.process_repaints();

    assert_eq!(
        host_frames.current().unwrap().unwrap().dimensions(),
        (1024, 300)
    );
    assert_eq!(pump.stats().publish_failures, 0);
}

#[test]
fn running_pump_serves_a_host_until_shutdown() {
    let segment = segment();
    let host_events = segment.event_channel();
    let host_frames = segment.frame_channel();
    let mut pump = pump_for(&segment, 5);

    let worker = std::thread::spawn(move || {
        let stop = AtomicBool::new(false);
        let stats = pump.run(&stop);
        (stats, pump.toolkit().click_count(), pump.toolkit().last_click())
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while host_frames.generation() == 0 {
        assert!(Instant::now() < deadline, "no first frame");
        std::thread::sleep(Duration::from_millis(2));
    }
    click_at_button(&host_events, 2);
    while host_events.pending() > 0 || host_frames.generation() < 2 {
        assert!(Instant::now() < deadline, "click was not rendered");
        std::thread::sleep(Duration::from_millis(2));
    }

    segment.request_shutdown();
    let (stats, clicks, last_click) = worker.join().expect("pump thread panicked");
    assert_eq!(clicks, 1);
    assert_eq!(last_click, Some(2));
    assert_eq!(stats.events_dispatched, 3);
    assert!(stats.frames_published >= 2);
    assert_eq!(stats.publish_failures, 0);
}
