use super::errors::FormatError;
use super::lzw::StreamCorrupt;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum GifHeader {
    GIF89a,
    GIF87a,
}

impl TryFrom<&[u8]> for GifHeader {
    type Error = FormatError;

    fn try_from(magic: &[u8]) -> Result<Self, Self::Error> {
        match magic {
            b"GIF89a" => Ok(GifHeader::GIF89a),
            b"GIF87a" => Ok(GifHeader::GIF87a),
            other => Err(FormatError::BadSignature(other.to_vec())),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct LogicalScreenDescriptor {
    pub canvas_width: u16,
    pub canvas_height: u16,

    // Packed field
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub global_color_table_size: u8,

    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

/// A straight (non-premultiplied) RGBA color.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::rgba(0, 0, 0, 0);
    pub const BLACK: Pixel = Pixel::rgb(0, 0, 0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 0xff)
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// Number of entries a color table holds given the 3-bit size field of a
/// descriptor's packed byte.
pub fn color_table_len(size_field: u8) -> usize {
    2usize << (size_field & 0x7)
}

/// A color table widened to the full 8-bit index range.
///
/// Slots past the end of the table read from the file are opaque black so
/// that any palette index coming out of the decompressor is addressable.
#[derive(Debug, PartialEq, Clone)]
pub struct Palette {
    entries: [Pixel; 256],
    len: usize,
}

impl Palette {
    pub fn from_colors(colors: &[Pixel]) -> Self {
        let mut entries = [Pixel::BLACK; 256];
        let len = colors.len().min(entries.len());
        entries[..len].copy_from_slice(&colors[..len]);
        Palette { entries, len }
    }

    /// Number of colors that came from the file.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: u8) -> Pixel {
        self.entries[index as usize]
    }

    /// Copy of this palette with `index` forced fully transparent.
    pub fn with_transparent(&self, index: u8) -> Self {
        let mut ret = self.clone();
        ret.entries[index as usize] = Pixel::TRANSPARENT;
        ret
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::from_colors(&[])
    }
}

/// Everything the header contributes to the decode of every frame.
#[derive(Debug, PartialEq, Clone)]
pub struct ScreenInfo {
    pub header: GifHeader,
    pub logical_screen_descriptor: LogicalScreenDescriptor,
    pub global_color_table: Option<Palette>,
    pub background: Pixel,
}

/// The parts of a Graphic Control Extension that affect decoding.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct GraphicControl {
    /// Hundredths of a second.
    pub delay: u16,
    pub transparent_index: Option<u8>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub local_color_table_size: u8,
}

impl ImageDescriptor {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PixelFormat {
    Rgb8,
    /// Allocated whenever the frame has a transparent index.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum FrameStatus {
    Complete,
    /// Decoding stopped early; whatever was written before the fault is kept.
    Corrupt(StreamCorrupt),
}

/// One decoded image block, placed in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub delay: u16,
    pub format: PixelFormat,
    /// Row-major, `format.bytes_per_pixel()` bytes per pixel.
    pub data: Vec<u8>,
    /// Row-major palette indices, one per pixel.
    pub indices: Vec<u8>,
    pub status: FrameStatus,
}

impl RawFrame {
    pub(crate) fn blank(descriptor: &ImageDescriptor, control: Option<GraphicControl>) -> Self {
        let format = match control.and_then(|c| c.transparent_index) {
            Some(_) => PixelFormat::Rgba8,
            None => PixelFormat::Rgb8,
        };
        let pixels = descriptor.pixel_count();
        RawFrame {
            x: descriptor.left,
            y: descriptor.top,
            width: descriptor.width,
            height: descriptor.height,
            interlaced: descriptor.interlace_flag,
            delay: control.map(|c| c.delay).unwrap_or(0),
            format,
            data: vec![0; pixels * format.bytes_per_pixel()],
            indices: vec![0; pixels],
            status: FrameStatus::Complete,
        }
    }

    pub(crate) fn put(&mut self, x: usize, y: usize, index: u8, palette: &Palette) {
        let pos = y * self.width as usize + x;
        let color = palette.get(index);
        self.indices[pos] = index;
        let bpp = self.format.bytes_per_pixel();
        let px = &mut self.data[pos * bpp..(pos + 1) * bpp];
        px[0] = color.red;
        px[1] = color.green;
        px[2] = color.blue;
        if bpp == 4 {
            px[3] = color.alpha;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.status, FrameStatus::Corrupt(_))
    }

    pub fn has_alpha(&self) -> bool {
        self.format == PixelFormat::Rgba8
    }

    /// Color at frame-local `(x, y)`; `None` outside the frame.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let pos = (y * self.width as usize + x) * bpp;
        let px = self.data.get(pos..pos + bpp)?;
        Some(match self.format {
            PixelFormat::Rgb8 => Pixel::rgb(px[0], px[1], px[2]),
            PixelFormat::Rgba8 => Pixel::rgba(px[0], px[1], px[2], px[3]),
        })
    }
}
