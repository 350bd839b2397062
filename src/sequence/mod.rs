mod frame;
mod render;
pub use frame::{normalize, NormalizedFrame, Placement, Rect};
pub use render::{plan_render, RenderRegion};

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decoder::{decode_all, FormatError, LoadError, Pixel};

/// Half-open frame interval `[start, end)` that playback cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopWindow {
    pub start: usize,
    pub end: usize,
}

impl LoopWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEdge {
    Start,
    End,
}

/// Called with the new read position every time it changes.
pub type PositionListener = Box<dyn FnMut(usize)>;

/// The decoded frames of one GIF plus the playback cursors over them.
///
/// Loading replaces the frames wholesale; nothing is published until the
/// whole file has been decoded.
pub struct FrameSequence {
    frames: Vec<NormalizedFrame>,
    background: Pixel,
    canvas_size: (u16, u16),
    read_idx: usize,
    last_read_idx: Option<usize>,
    loop_start: usize,
    loop_end: usize,
    start_idx: usize,
    listeners: Vec<PositionListener>,
}

impl FrameSequence {
    pub fn new() -> Self {
        FrameSequence {
            frames: Vec::new(),
            background: Pixel::TRANSPARENT,
            canvas_size: (0, 0),
            read_idx: 0,
            last_read_idx: None,
            loop_start: 0,
            loop_end: 0,
            start_idx: 0,
            listeners: Vec::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut ret = Self::new();
        ret.load(bytes)?;
        Ok(ret)
    }

    /// Decode `bytes` and replace the current frames with the result.
    ///
    /// On a header error the sequence is left empty. Returns the number of
    /// frames loaded.
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn load(&mut self, bytes: &[u8]) -> Result<usize, FormatError> {
        let (screen, raw_frames) = match decode_all(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "unable to load GIF");
                self.clear();
                return Err(e);
            }
        };

        let previous_idx = self.read_idx;
        let corrupt = raw_frames.iter().filter(|f| f.is_corrupt()).count();
        self.background = screen.background;
        self.canvas_size = (
            screen.logical_screen_descriptor.canvas_width,
            screen.logical_screen_descriptor.canvas_height,
        );
        self.frames = normalize(raw_frames);
        self.start_idx = 0;
        self.loop_start = self.start_idx;
        self.loop_end = self.frames.len();
        self.read_idx = self.start_idx;
        self.last_read_idx = None;

        info!(frames = self.frames.len(), corrupt, "loaded GIF");
        if self.read_idx != previous_idx {
            self.notify();
        }
        Ok(self.frames.len())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let bytes = match std::fs::read(path.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "unable to read file");
                self.clear();
                return Err(e.into());
            }
        };
        Ok(self.load(&bytes)?)
    }

    /// Back to the "no media" state.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.background = Pixel::TRANSPARENT;
        self.canvas_size = (0, 0);
        self.read_idx = 0;
        self.last_read_idx = None;
        self.loop_start = 0;
        self.loop_end = 0;
        self.start_idx = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[NormalizedFrame] {
        &self.frames
    }

    pub fn frame(&self, idx: usize) -> Option<&NormalizedFrame> {
        self.frames.get(idx)
    }

    pub fn current_frame(&self) -> Option<&NormalizedFrame> {
        self.frames.get(self.read_idx)
    }

    pub fn background(&self) -> Pixel {
        self.background
    }

    /// Logical screen size from the header.
    pub fn canvas_size(&self) -> (u16, u16) {
        self.canvas_size
    }

    pub fn read_idx(&self) -> usize {
        self.read_idx
    }

    pub fn last_read_idx(&self) -> Option<usize> {
        self.last_read_idx
    }

    pub fn start_idx(&self) -> usize {
        self.start_idx
    }

    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    pub fn loop_end(&self) -> usize {
        self.loop_end
    }

    pub fn loop_window(&self) -> LoopWindow {
        LoopWindow {
            start: self.loop_start,
            end: self.loop_end,
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(usize) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self) {
        let idx = self.read_idx;
        for listener in self.listeners.iter_mut() {
            listener(idx);
        }
    }

    fn set_read_idx(&mut self, idx: usize) -> bool {
        if idx == self.read_idx {
            return false;
        }
        self.read_idx = idx;
        self.notify();
        true
    }

    /// Step forward one frame, wrapping to the loop start past the loop end.
    pub fn advance_one_frame(&mut self) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        let mut idx = self.read_idx + 1;
        if idx >= self.loop_end {
            idx = self.loop_start;
        }
        self.set_read_idx(idx)
    }

    /// Map a repeating `[0, 1)` phase (plus a manual offset) onto the loop
    /// window. Returns true if the read position moved.
    pub fn set_by_phase(&mut self, phase: f32, offset: f32) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        let range = (self.loop_end - self.loop_start) as f32;
        let position = (phase + offset) * range;
        if !position.is_finite() {
            return false;
        }
        // Wraps negative positions up into the window as well.
        let wrapped = position.rem_euclid(range);
        let idx = (self.loop_start + wrapped.floor() as usize).min(self.loop_end - 1);
        self.set_read_idx(idx)
    }

    /// Jump straight to `idx`, clamped to the last frame.
    pub fn set_by_index(&mut self, idx: usize) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        self.set_read_idx(idx.min(self.frames.len() - 1))
    }

    pub fn reset_animation(&mut self) -> bool {
        self.set_by_index(self.start_idx)
    }

    /// What the renderer has to draw to show the current frame.
    pub fn render_region(&self) -> RenderRegion {
        if self.frames.is_empty() {
            return RenderRegion::Unchanged;
        }
        plan_render(self.last_read_idx, self.read_idx)
    }

    /// Record that the current frame is now on screen.
    pub fn mark_rendered(&mut self) {
        if !self.frames.is_empty() {
            self.last_read_idx = Some(self.read_idx);
        }
    }

    /// Force the next render to rebuild from a cleared canvas.
    pub fn invalidate(&mut self) {
        self.last_read_idx = None;
    }

    pub fn set_loop_window(&mut self, start: usize, end: usize) {
        let frame_count = self.frames.len();
        if frame_count == 0 {
            return;
        }
        let end = end.clamp(1, frame_count);
        let start = start.min(end - 1);
        self.loop_start = start;
        self.loop_end = end.clamp(start + 1, frame_count);
    }

    pub fn set_loop_start(&mut self, start: usize) {
        if self.frames.is_empty() {
            return;
        }
        self.loop_start = start.min(self.loop_end - 1);
    }

    pub fn set_loop_end(&mut self, end: usize) {
        if self.frames.is_empty() {
            return;
        }
        self.loop_end = end.clamp(self.loop_start + 1, self.frames.len());
    }

    /// Move one loop edge to the frame boundary under `fraction` of a strip
    /// spanning the whole sequence. Returns the frame that edge now shows:
    /// the first frame of the loop for the start edge, the last for the end.
    pub fn set_loop_edge_at(&mut self, edge: LoopEdge, fraction: f32) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let position = fraction.clamp(0.0, 1.0) * self.frames.len() as f32;
        match edge {
            LoopEdge::Start => {
                self.set_loop_start(position.floor() as usize);
                Some(self.loop_start)
            }
            LoopEdge::End => {
                self.set_loop_end(position.ceil() as usize);
                Some(self.loop_end - 1)
            }
        }
    }

    /// Apply a loop window saved from an earlier session with the same file.
    pub fn restore_loop_window(&mut self, window: LoopWindow) {
        self.set_loop_window(window.start, window.end);
    }
}

impl Default for FrameSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FrameSequence")
            .field("frames", &self.frames.len())
            .field("background", &self.background)
            .field("read_idx", &self.read_idx)
            .field("last_read_idx", &self.last_read_idx)
            .field("loop_start", &self.loop_start)
            .field("loop_end", &self.loop_end)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
