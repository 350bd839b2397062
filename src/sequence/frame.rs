use crate::decoder::RawFrame;

/// An axis-aligned rectangle in output coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Frame placement as fractions of the largest frame in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Where this frame lands when the whole sequence is drawn into `bounds`.
    pub fn scaled_to(&self, bounds: Rect) -> Rect {
        Rect {
            x: bounds.x + self.x * bounds.width,
            y: bounds.y + self.y * bounds.height,
            width: self.width * bounds.width,
            height: self.height * bounds.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub raw: RawFrame,
    pub placement: Placement,
}

impl NormalizedFrame {
    pub fn is_corrupt(&self) -> bool {
        self.raw.is_corrupt()
    }
}

/// Divide every frame's offsets and size by the largest frame width/height
/// seen across the whole set.
pub fn normalize(frames: Vec<RawFrame>) -> Vec<NormalizedFrame> {
    let max_width = frames.iter().map(|f| f.width).max().unwrap_or(0) as f32;
    let max_height = frames.iter().map(|f| f.height).max().unwrap_or(0) as f32;
    frames
        .into_iter()
        .map(|raw| {
            let placement = if max_width > 0.0 && max_height > 0.0 {
                Placement {
                    x: raw.x as f32 / max_width,
                    y: raw.y as f32 / max_height,
                    width: raw.width as f32 / max_width,
                    height: raw.height as f32 / max_height,
                }
            } else {
                Placement::default()
            };
            NormalizedFrame { raw, placement }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{FrameStatus, PixelFormat};

    fn raw(x: u16, y: u16, width: u16, height: u16) -> RawFrame {
        RawFrame {
            x,
            y,
            width,
            height,
            interlaced: false,
            delay: 0,
            format: PixelFormat::Rgb8,
            data: vec![0; width as usize * height as usize * 3],
            indices: vec![0; width as usize * height as usize],
            status: FrameStatus::Complete,
        }
    }

    #[test]
    fn placement_is_relative_to_the_largest_frame() {
        let frames = normalize(vec![raw(0, 0, 4, 2), raw(2, 1, 2, 1), raw(0, 0, 1, 8)]);
        assert_eq!(
            frames[0].placement,
            Placement {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 0.25
            }
        );
        assert_eq!(
            frames[1].placement,
            Placement {
                x: 0.5,
                y: 0.125,
                width: 0.5,
                height: 0.125
            }
        );
        assert_eq!(frames[2].placement.width, 0.25);
        assert_eq!(frames[2].placement.height, 1.0);
    }

    #[test]
    fn scaled_into_bounds() {
        let placement = Placement {
            x: 0.5,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        };
        assert_eq!(
            placement.scaled_to(Rect::new(10.0, 0.0, 100.0, 40.0)),
            Rect::new(60.0, 10.0, 50.0, 20.0)
        );
    }

    #[test]
    fn empty_set() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
