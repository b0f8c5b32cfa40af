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

//! A headless reference toolkit.
//!
//! `HeadlessPage` lays out a header panel, a content panel and a row of
//! buttons, paints them into an ARGB buffer and reacts to synthesized pointer
//! input with hover and pressed states. It is the toolkit the server binary
//! drives when no real page engine is linked in.

use fxbridge_core::event::{MouseButton, Point};
use fxbridge_core::frame::FrameView;
use fxbridge_core::platform::{
    RenderSurface, RepaintCallback, SyntheticEvent, SyntheticKind, WidgetHost,
};
use fxbridge_core::DispatchError;

/// Surface size before the first resize.
pub const DEFAULT_SIZE: (u32, u32) = (1024, 768);

/// Number of buttons on the page.
pub const BUTTON_COUNT: u8 = 3;

const HEADER_HEIGHT: u32 = 64;
const BUTTON_WIDTH: u32 = 160;
const BUTTON_HEIGHT: u32 = 40;
const BUTTON_MARGIN: i32 = 32;
const BUTTON_GAP: i32 = 16;

/// A widget on the headless page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetId {
    /// The top panel.
    Header,
    /// The panel below the header.
    Content,
    /// One of the buttons inside the content panel.
    Button(u8),
}

impl WidgetId {
    fn cell(self) -> u8 {
        match self {
            Self::Header => 1,
            Self::Content => 2,
            Self::Button(index) => 3 + index,
        }
    }

    fn from_cell(cell: u8) -> Option<Self> {
        match cell {
            0 => None,
            1 => Some(Self::Header),
            2 => Some(Self::Content),
            n => Some(Self::Button(n - 3)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Rect {
    fn button(index: u8) -> Self {
        Self {
            x: BUTTON_MARGIN + index as i32 * (BUTTON_WIDTH as i32 + BUTTON_GAP),
            y: HEADER_HEIGHT as i32 + BUTTON_MARGIN,
            width: BUTTON_WIDTH,
            height: BUTTON_HEIGHT,
        }
    }

    fn center(&self) -> Point {
        Point::new(
            self.x + self.width as i32 / 2,
            self.y + self.height as i32 / 2,
        )
    }

    /// Clips to a `width x height` surface, returning pixel ranges.
    fn clip(&self, width: u32, height: u32) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let x0 = self.x.clamp(0, width as i32) as usize;
        let y0 = self.y.clamp(0, height as i32) as usize;
        let x1 = (self.x + self.width as i32).clamp(0, width as i32) as usize;
        let y1 = (self.y + self.height as i32).clamp(0, height as i32) as usize;
        (x0..x1, y0..y1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    background: u32,
    header: u32,
    button: u32,
    hover: u32,
    pressed: u32,
}

impl Palette {
    /// Derives opaque colors from a hash of the page location.
    fn for_location(location: &str) -> Self {
        let hash = fnv1a(location.as_bytes());
        let base = hash & 0x003F_3F3F;
        Self {
            background: 0xFF00_0000 | 0x00C0_C0C0 | base,
            header: 0xFF00_0000 | (base << 1),
            button: 0xFF40_6080,
            hover: 0xFF60_90C0,
            pressed: 0xFF20_3040,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811C_9DC5u32, |hash, &b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

/// A small interactive page rendered in memory.
pub struct HeadlessPage {
    width: u32,
    height: u32,
    location: String,
    palette: Palette,
    hit_grid: Vec<u8>,
    pixels: Vec<u32>,
    hovered: Option<WidgetId>,
    pressed: Option<WidgetId>,
    click_count: u64,
    last_click: Option<u8>,
    dirty: bool,
    repaints: u64,
    on_repaint: Option<RepaintCallback>,
}

impl HeadlessPage {
    /// Creates a page at [`DEFAULT_SIZE`].
    pub fn new() -> Self {
        Self::with_size(DEFAULT_SIZE.0, DEFAULT_SIZE.1)
    }

    /// Creates a page with the given surface size.
    pub fn with_size(width: u32, height: u32) -> Self {
        let location = String::from("about:blank");
        let mut page = Self {
            width: 0,
            height: 0,
            palette: Palette::for_location(&location),
            location,
            hit_grid: Vec::new(),
            pixels: Vec::new(),
            hovered: None,
            pressed: None,
            click_count: 0,
            last_click: None,
            dirty: true,
            repaints: 0,
            on_repaint: None,
        };
        page.relayout(width.max(1), height.max(1));
        page
    }

    /// The location passed to the last successful `load_content`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The button under the pointer, if any.
    pub fn hovered(&self) -> Option<WidgetId> {
        self.hovered
    }

    /// The button held down, if any.
    pub fn pressed(&self) -> Option<WidgetId> {
        self.pressed
    }

    /// Number of completed clicks.
    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    /// Index of the most recently clicked button.
    pub fn last_click(&self) -> Option<u8> {
        self.last_click
    }

    /// Number of repaints performed so far.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    /// The center of button `index`, in frame-local coordinates.
    pub fn button_center(index: u8) -> Point {
        Rect::button(index).center()
    }

    /// The painted ARGB value at `(x, y)`.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    fn relayout(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize;
        self.pixels = vec![0; len];
        self.hit_grid = vec![0; len];

        let header = Rect {
            x: 0,
            y: 0,
            width,
            height: HEADER_HEIGHT,
        };
        let content = Rect {
            x: 0,
            y: HEADER_HEIGHT as i32,
            width,
            height: height.saturating_sub(HEADER_HEIGHT),
        };
        self.fill_grid(header, WidgetId::Header);
        self.fill_grid(content, WidgetId::Content);
        for index in 0..BUTTON_COUNT {
            self.fill_grid(Rect::button(index), WidgetId::Button(index));
        }
        self.dirty = true;
    }

    fn fill_grid(&mut self, rect: Rect, widget: WidgetId) {
        let (cols, rows) = rect.clip(self.width, self.height);
        let stride = self.width as usize;
        for row in rows {
            self.hit_grid[row * stride + cols.start..row * stride + cols.end].fill(widget.cell());
        }
    }

    fn lookup(&self, point: Point) -> Option<WidgetId> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        WidgetId::from_cell(self.hit_grid[y as usize * self.width as usize + x as usize])
    }

    fn fill(&mut self, rect: Rect, color: u32) {
        let (cols, rows) = rect.clip(self.width, self.height);
        let stride = self.width as usize;
        for row in rows {
            self.pixels[row * stride + cols.start..row * stride + cols.end].fill(color);
        }
    }

    fn paint(&mut self) {
        let palette = self.palette;
        self.pixels.fill(palette.background);
        self.fill(
            Rect {
                x: 0,
                y: 0,
                width: self.width,
                height: HEADER_HEIGHT,
            },
            palette.header,
        );
        for index in 0..BUTTON_COUNT {
            let widget = Some(WidgetId::Button(index));
            let color = if self.pressed == widget {
                palette.pressed
            } else if self.hovered == widget {
                palette.hover
            } else {
                palette.button
            };
            self.fill(Rect::button(index), color);
        }
    }

    fn check_known(&self, receiver: &WidgetId, kind: SyntheticKind) -> Result<(), DispatchError> {
        match receiver {
            WidgetId::Button(index) if *index >= BUTTON_COUNT => Err(DispatchError::Delivery {
                kind,
                reason: format!("no button with index {index}"),
            }),
            _ => Ok(()),
        }
    }
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeadlessPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessPage")
            .field("size", &(self.width, self.height))
            .field("location", &self.location)
            .field("hovered", &self.hovered)
            .field("pressed", &self.pressed)
            .field("repaints", &self.repaints)
            .finish()
    }
}

impl WidgetHost for HeadlessPage {
    type Receiver = WidgetId;

    fn widget_at(&self, point: Point) -> Option<WidgetId> {
        self.lookup(point)
            .filter(|widget| matches!(widget, WidgetId::Button(_)))
    }

    fn child_at(&self, point: Point) -> Option<WidgetId> {
        self.lookup(point).map(|widget| match widget {
            WidgetId::Button(_) => WidgetId::Content,
            panel => panel,
        })
    }

    fn deliver(&mut self, receiver: &WidgetId, event: SyntheticEvent) -> Result<(), DispatchError> {
        self.check_known(receiver, event.kind)?;
        let is_button = matches!(receiver, WidgetId::Button(_));

        match event.kind {
            SyntheticKind::Enter => {
                if is_button {
                    self.hovered = Some(*receiver);
                    self.dirty = true;
                }
            }
            SyntheticKind::Leave => {
                if self.hovered == Some(*receiver) {
                    self.hovered = None;
                    self.dirty = true;
                }
            }
            SyntheticKind::Move => {}
            SyntheticKind::Press(MouseButton::None) | SyntheticKind::Release(MouseButton::None) => {
                // Nothing is pressed or released without a button.
            }
            SyntheticKind::Press(button) => {
                if is_button && button == MouseButton::Left {
                    self.pressed = Some(*receiver);
                    self.dirty = true;
                }
            }
            SyntheticKind::Release(button) => {
                if button == MouseButton::Left {
                    if let Some(WidgetId::Button(index)) = self.pressed.take() {
                        if *receiver == WidgetId::Button(index) {
                            log::info!("Button {index} clicked on {}", self.location);
                            self.click_count += 1;
                            self.last_click = Some(index);
                        }
                        self.dirty = true;
                    }
                }
            }
        }
        log::trace!("{receiver:?} received {event:?}");
        Ok(())
    }
}

impl RenderSurface for HeadlessPage {
    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize to {width}x{height}");
            return;
        }
        if (width, height) != (self.width, self.height) {
            log::debug!("Page surface resized to {width}x{height}");
            self.relayout(width, height);
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn on_repaint_complete(&mut self, callback: RepaintCallback) {
        self.on_repaint = Some(callback);
    }

    fn load_content(&mut self, location: &str) -> anyhow::Result<()> {
        if location.trim().is_empty() {
            anyhow::bail!("cannot load an empty location");
        }
        self.location = location.to_owned();
        self.palette = Palette::for_location(location);
        self.dirty = true;
        log::info!("Loaded {location}");
        Ok(())
    }

    fn advance(&mut self) {
        if !self.dirty {
            return;
        }
        self.paint();
        self.dirty = false;
        self.repaints += 1;

        if let Some(callback) = self.on_repaint.as_mut() {
            match FrameView::new(bytemuck::cast_slice(&self.pixels), self.width, self.height) {
                Ok(view) => callback(view),
                Err(e) => log::error!("Page buffer is inconsistent: {e}"),
            }
        }
    }
}
