use crate::decoder::Pixel;
use crate::sequence::{FrameSequence, NormalizedFrame, Rect, RenderRegion};

/// Software compositor that applies redraw plans to an RGBA pixel grid.
///
/// Frames are drawn in order without disposal, scaled nearest-neighbour from
/// their normalized placement. Fully transparent pixels leave the canvas
/// underneath untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: Pixel) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![background; width * height],
        }
    }

    /// A canvas the size of the largest frame, so frames draw unscaled.
    pub fn for_sequence(seq: &FrameSequence) -> Self {
        let width = seq.frames().iter().map(|f| f.raw.width).max().unwrap_or(0);
        let height = seq.frames().iter().map(|f| f.raw.height).max().unwrap_or(0);
        Self::new(width as usize, height as usize, seq.background())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    pub fn clear(&mut self, background: Pixel) {
        self.pixels.fill(background);
    }

    /// Apply `region` to the canvas. Returns false if nothing was drawn.
    pub fn apply(&mut self, seq: &FrameSequence, region: &RenderRegion) -> bool {
        let Some(frames) = region.frames() else {
            return false;
        };
        if region.clears_canvas() {
            self.clear(seq.background());
        }
        for idx in frames {
            if let Some(frame) = seq.frame(idx) {
                self.draw(frame);
            }
        }
        true
    }

    /// Bring the canvas up to the sequence's current frame.
    pub fn render(&mut self, seq: &mut FrameSequence) -> bool {
        let drawn = self.apply(seq, &seq.render_region());
        seq.mark_rendered();
        drawn
    }

    pub fn draw(&mut self, frame: &NormalizedFrame) {
        let raw = &frame.raw;
        if raw.is_empty() {
            return;
        }
        let dest = frame
            .placement
            .scaled_to(Rect::new(0.0, 0.0, self.width as f32, self.height as f32));
        if dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }

        let x0 = dest.x.round().max(0.0) as usize;
        let y0 = dest.y.round().max(0.0) as usize;
        let x1 = ((dest.x + dest.width).round().max(0.0) as usize).min(self.width);
        let y1 = ((dest.y + dest.height).round().max(0.0) as usize).min(self.height);
        let scale_x = raw.width as f32 / dest.width;
        let scale_y = raw.height as f32 / dest.height;

        for y in y0..y1 {
            let src_y = ((y as f32 + 0.5 - dest.y) * scale_y) as usize;
            let src_y = src_y.min(raw.height as usize - 1);
            for x in x0..x1 {
                let src_x = ((x as f32 + 0.5 - dest.x) * scale_x) as usize;
                let src_x = src_x.min(raw.width as usize - 1);
                match raw.pixel(src_x, src_y) {
                    Some(pixel) if pixel.alpha != 0 => self.pixels[y * self.width + x] = pixel,
                    _ => {}
                }
            }
        }
    }

    /// Plain-text PPM, alpha dropped.
    pub fn to_ppm(&self) -> String {
        let header = format!("P3\n{} {}\n255\n", self.width, self.height);
        let body = self
            .pixels
            .iter()
            .map(|p| format!("{} {} {}", p.red, p.green, p.blue))
            .collect::<Vec<String>>()
            .join("\n");
        format!("{}{}\n", header, body)
    }
}
