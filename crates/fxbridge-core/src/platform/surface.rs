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

use crate::frame::FrameView;

/// Invoked by the surface each time a repaint finishes.
///
/// The view is only valid for the duration of the call.
pub type RepaintCallback = Box<dyn FnMut(FrameView<'_>) + Send>;

/// The paintable side of the rendering toolkit.
pub trait RenderSurface {
    /// Resizes the off-screen surface. The next repaint uses the new size.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// The current surface size.
    fn surface_size(&self) -> (u32, u32);

    /// Registers the repaint hook, replacing any previous one.
    fn on_repaint_complete(&mut self, callback: RepaintCallback);

    /// Loads the content at `location`.
    fn load_content(&mut self, location: &str) -> anyhow::Result<()>;

    /// Gives the toolkit a turn to lay out and repaint pending changes.
    fn advance(&mut self) {}
}
