use super::errors::FormatError;
use super::interlace::RowSchedule;
use super::lzw::{sub_block, Decompressor, IndexResult, StreamCorrupt};
use super::types::{
    color_table_len, FrameStatus, GifHeader, GraphicControl, ImageDescriptor,
    LogicalScreenDescriptor, Palette, Pixel, RawFrame, ScreenInfo,
};
use nom::bits;
use nom::bytes::complete::{tag, take};
use nom::combinator::{map, verify};
use nom::multi::{count, many0};
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::terminated;
use nom::IResult;
use tracing::{debug, trace, warn};

const EXTENSION_INTRODUCER: u8 = b'!';
const IMAGE_SEPARATOR: u8 = b',';
const TRAILER: u8 = b';';
const GRAPHIC_CONTROL_LABEL: u8 = 0xf9;
const BLOCK_TERMINATOR: &[u8] = &[0x00];
/// Largest image, in pixels, that gets a buffer allocated for it.
pub const DEFAULT_MAX_IMAGE_PIXELS: usize = 1 << 25;

// Thanks https://blog.adamchalmers.com/nom-bits/
type BitInput<'a> = (&'a [u8], usize);

fn take_bit(i: BitInput) -> IResult<BitInput, bool> {
    map(bits::complete::take(1usize), |bits: u8| bits > 0)(i)
}

fn take_pixel(bytes: &[u8]) -> IResult<&[u8], Pixel> {
    let (bytes, red) = le_u8(bytes)?;
    let (bytes, green) = le_u8(bytes)?;
    let (bytes, blue) = le_u8(bytes)?;
    Ok((bytes, Pixel::rgb(red, green, blue)))
}

fn take_byte(bytes: &[u8]) -> IResult<&[u8], u8> {
    le_u8(bytes)
}

fn parse_logical_screen_descriptor(bytes: &[u8]) -> IResult<&[u8], LogicalScreenDescriptor> {
    struct PackedField {
        global_color_table_flag: bool,
        color_resolution: u8,
        sort_flag: bool,
        global_color_table_size: u8,
    }

    fn parse_packed_field(bits: BitInput) -> IResult<BitInput, PackedField> {
        let (bits, global_color_table_flag) = take_bit(bits)?;
        let (bits, color_resolution) = bits::complete::take(3usize)(bits)?;
        let (bits, sort_flag) = take_bit(bits)?;
        let (bits, global_color_table_size) = bits::complete::take(3usize)(bits)?;
        Ok((
            bits,
            PackedField {
                global_color_table_flag,
                color_resolution,
                sort_flag,
                global_color_table_size,
            },
        ))
    }

    let (bytes, canvas_width) = le_u16(bytes)?;
    let (bytes, canvas_height) = le_u16(bytes)?;
    let (bytes, packed_field) = bits::bits(parse_packed_field)(bytes)?;
    let (bytes, background_color_index) = le_u8(bytes)?;
    let (bytes, pixel_aspect_ratio) = le_u8(bytes)?;
    Ok((
        bytes,
        LogicalScreenDescriptor {
            canvas_width,
            canvas_height,

            global_color_table_flag: packed_field.global_color_table_flag,
            color_resolution: packed_field.color_resolution,
            sort_flag: packed_field.sort_flag,
            global_color_table_size: packed_field.global_color_table_size,

            background_color_index,
            pixel_aspect_ratio,
        },
    ))
}

fn parse_color_table(bytes: &[u8], size_field: u8) -> IResult<&[u8], Palette> {
    let (bytes, colors) = count(take_pixel, color_table_len(size_field))(bytes)?;
    Ok((bytes, Palette::from_colors(&colors)))
}

/// Signature, logical screen descriptor and the optional global color table.
pub fn parse_header(bytes: &[u8]) -> Result<(&[u8], ScreenInfo), FormatError> {
    let (bytes, magic) = take::<_, _, nom::error::Error<&[u8]>>(6usize)(bytes)
        .map_err(|_| FormatError::Truncated("signature"))?;
    let header = GifHeader::try_from(magic)?;

    let (bytes, lsd) = parse_logical_screen_descriptor(bytes)
        .map_err(|_| FormatError::Truncated("logical screen descriptor"))?;
    if lsd.canvas_width == 0 || lsd.canvas_height == 0 {
        return Err(FormatError::InvalidDimensions {
            width: lsd.canvas_width,
            height: lsd.canvas_height,
        });
    }

    let (bytes, global_color_table) = if lsd.global_color_table_flag {
        let (bytes, table) = parse_color_table(bytes, lsd.global_color_table_size)
            .map_err(|_| FormatError::Truncated("global color table"))?;
        (bytes, Some(table))
    } else {
        (bytes, None)
    };

    let background = match &global_color_table {
        Some(table) => {
            let color = table.get(lsd.background_color_index);
            Pixel::rgb(color.red, color.green, color.blue)
        }
        None => Pixel::BLACK,
    };

    debug!(
        version = ?header,
        width = lsd.canvas_width,
        height = lsd.canvas_height,
        global_colors = global_color_table.as_ref().map_or(0, Palette::len),
        "parsed GIF header"
    );

    Ok((
        bytes,
        ScreenInfo {
            header,
            logical_screen_descriptor: lsd,
            global_color_table,
            background,
        },
    ))
}

fn parse_image_descriptor(bytes: &[u8]) -> IResult<&[u8], ImageDescriptor> {
    struct PackedField {
        local_color_table_flag: bool,
        interlace_flag: bool,
        sort_flag: bool,
        local_color_table_size: u8,
    }

    fn parse_packed_field(bits: BitInput) -> IResult<BitInput, PackedField> {
        let (bits, local_color_table_flag) = take_bit(bits)?;
        let (bits, interlace_flag) = take_bit(bits)?;
        let (bits, sort_flag) = take_bit(bits)?;
        let (bits, _reserved): (_, u8) = bits::complete::take(2usize)(bits)?;
        let (bits, local_color_table_size) = bits::complete::take(3usize)(bits)?;
        Ok((
            bits,
            PackedField {
                local_color_table_flag,
                interlace_flag,
                sort_flag,
                local_color_table_size,
            },
        ))
    }

    let (bytes, left) = le_u16(bytes)?;
    let (bytes, top) = le_u16(bytes)?;
    let (bytes, width) = le_u16(bytes)?;
    let (bytes, height) = le_u16(bytes)?;
    let (bytes, packed_field) = bits::bits(parse_packed_field)(bytes)?;
    Ok((
        bytes,
        ImageDescriptor {
            left,
            top,
            width,
            height,
            local_color_table_flag: packed_field.local_color_table_flag,
            interlace_flag: packed_field.interlace_flag,
            sort_flag: packed_field.sort_flag,
            local_color_table_size: packed_field.local_color_table_size,
        },
    ))
}

/// Non-empty sub-blocks up to and including the terminator.
fn parse_data_sub_blocks(bytes: &[u8]) -> IResult<&[u8], Vec<&[u8]>> {
    terminated(
        many0(verify(sub_block, |block: &[u8]| !block.is_empty())),
        tag(BLOCK_TERMINATOR),
    )(bytes)
}

fn parse_graphic_control(block: &[u8]) -> IResult<&[u8], GraphicControl> {
    struct PackedField {
        transparent_color_flag: bool,
    }

    fn parse_packed_field(bits: BitInput) -> IResult<BitInput, PackedField> {
        let (bits, _reserved): (_, u8) = bits::complete::take(3usize)(bits)?;
        // Disposal method: frames are always drawn cumulatively.
        let (bits, _disposal_method): (_, u8) = bits::complete::take(3usize)(bits)?;
        let (bits, _user_input_flag) = take_bit(bits)?;
        let (bits, transparent_color_flag) = take_bit(bits)?;
        Ok((
            bits,
            PackedField {
                transparent_color_flag,
            },
        ))
    }

    let (block, packed_field) = bits::bits(parse_packed_field)(block)?;
    let (block, delay) = le_u16(block)?;
    let (block, transparent_color_index) = le_u8(block)?;
    Ok((
        block,
        GraphicControl {
            delay,
            transparent_index: packed_field
                .transparent_color_flag
                .then_some(transparent_color_index),
        },
    ))
}

enum Extension {
    /// A Graphic Control Extension; `None` if its payload was unreadable.
    GraphicControl(Option<GraphicControl>),
    Other,
}

/// Everything after the `!` introducer. Only the Graphic Control Extension
/// carries anything the decoder needs; the rest are skipped.
fn parse_extension(bytes: &[u8]) -> IResult<&[u8], Extension> {
    let (bytes, label) = le_u8(bytes)?;
    let (bytes, blocks) = parse_data_sub_blocks(bytes)?;
    if label != GRAPHIC_CONTROL_LABEL {
        trace!(label, blocks = blocks.len(), "skipping extension block");
        return Ok((bytes, Extension::Other));
    }
    let control = blocks
        .first()
        .and_then(|block| parse_graphic_control(block).ok())
        .map(|(_, control)| control);
    Ok((bytes, Extension::GraphicControl(control)))
}

/// Pulls frames out of a GIF byte stream one image block at a time.
///
/// A Graphic Control Extension applies to the next image only; a local color
/// table overrides the global one for its own image only.
pub struct FrameDecoder<'a> {
    input: &'a [u8],
    screen: ScreenInfo,
    lzw: Decompressor,
    pending_control: Option<GraphicControl>,
    max_image_pixels: usize,
    finished: bool,
}

enum ImageBlock {
    Decoded(RawFrame),
    /// Skipped over without decoding; the next block can still be read.
    Skipped,
    Truncated,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let (input, screen) = parse_header(bytes)?;
        Ok(FrameDecoder {
            input,
            screen,
            lzw: Decompressor::new(),
            pending_control: None,
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            finished: false,
        })
    }

    /// Skip images with more than `limit` pixels instead of decoding them.
    pub fn with_max_image_pixels(mut self, limit: usize) -> Self {
        self.max_image_pixels = limit;
        self
    }

    pub fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    /// Next non-empty frame, or `None` at the trailer or the end of the data.
    pub fn decode_next_frame(&mut self) -> Option<RawFrame> {
        while !self.finished {
            let (rest, block_type) = match take_byte(self.input) {
                Ok(ret) => ret,
                Err(_) => {
                    debug!("data ended without a trailer");
                    self.finished = true;
                    break;
                }
            };
            self.input = rest;

            match block_type {
                TRAILER => self.finished = true,
                EXTENSION_INTRODUCER => match parse_extension(self.input) {
                    Ok((rest, Extension::GraphicControl(control))) => {
                        self.input = rest;
                        if control.is_none() {
                            warn!("unreadable graphic control extension");
                        }
                        self.pending_control = control;
                    }
                    Ok((rest, Extension::Other)) => self.input = rest,
                    Err(_) => {
                        warn!("truncated extension block");
                        self.finished = true;
                    }
                },
                IMAGE_SEPARATOR => match self.decode_image() {
                    ImageBlock::Decoded(frame) if frame.is_empty() => {
                        debug!(width = frame.width, height = frame.height, "skipping empty frame");
                    }
                    ImageBlock::Decoded(frame) => return Some(frame),
                    ImageBlock::Skipped => {}
                    ImageBlock::Truncated => self.finished = true,
                },
                other => trace!(byte = other, "skipping stray byte"),
            }
        }
        None
    }

    fn decode_image(&mut self) -> ImageBlock {
        let Ok((rest, descriptor)) = parse_image_descriptor(self.input) else {
            warn!("truncated image descriptor");
            return ImageBlock::Truncated;
        };
        self.input = rest;
        let control = self.pending_control.take();

        let local_color_table = if descriptor.local_color_table_flag {
            let Ok((rest, table)) =
                parse_color_table(self.input, descriptor.local_color_table_size)
            else {
                warn!("truncated local color table");
                return ImageBlock::Truncated;
            };
            self.input = rest;
            Some(table)
        } else {
            None
        };

        let Ok((rest, root_size)) = take_byte(self.input) else {
            warn!("image data missing");
            return ImageBlock::Truncated;
        };
        self.input = rest;

        if descriptor.pixel_count() > self.max_image_pixels {
            warn!(
                width = descriptor.width,
                height = descriptor.height,
                limit = self.max_image_pixels,
                "image too large, skipping"
            );
            let reader = self.lzw.reader_mut();
            reader.reset();
            reader.skip_to_terminator(&mut self.input);
            return ImageBlock::Skipped;
        }

        let palette = local_color_table
            .as_ref()
            .or(self.screen.global_color_table.as_ref())
            .cloned()
            .unwrap_or_default();
        let palette = match control.and_then(|c| c.transparent_index) {
            Some(index) => palette.with_transparent(index),
            None => palette,
        };

        let mut frame = RawFrame::blank(&descriptor, control);
        frame.status = self.fill(&mut frame, &palette, root_size);
        self.lzw.reader_mut().skip_to_terminator(&mut self.input);

        match &frame.status {
            FrameStatus::Complete => debug!(
                left = frame.x,
                top = frame.y,
                width = frame.width,
                height = frame.height,
                interlaced = frame.interlaced,
                alpha = frame.has_alpha(),
                "decoded frame"
            ),
            FrameStatus::Corrupt(reason) => warn!(%reason, "frame data is corrupt, keeping partial frame"),
        }
        ImageBlock::Decoded(frame)
    }

    fn fill(&mut self, frame: &mut RawFrame, palette: &Palette, root_size: u8) -> FrameStatus {
        if let Err(e) = self.lzw.initialise(root_size) {
            return FrameStatus::Corrupt(e);
        }

        let expected = frame.indices.len();
        let mut decoded = 0;
        for y in RowSchedule::new(frame.height as usize, frame.interlaced) {
            for x in 0..frame.width as usize {
                match self.lzw.next_index(&mut self.input) {
                    IndexResult::Index(index) => {
                        frame.put(x, y, index, palette);
                        decoded += 1;
                    }
                    IndexResult::EndOfData => {
                        return FrameStatus::Corrupt(StreamCorrupt::PrematureEnd {
                            decoded,
                            expected,
                        })
                    }
                    IndexResult::Corrupt(e) => return FrameStatus::Corrupt(e),
                }
            }
        }

        // Every pixel is in; the stream should end here.
        match self.lzw.next_index(&mut self.input) {
            IndexResult::EndOfData => FrameStatus::Complete,
            IndexResult::Index(_) => {
                trace!("ignoring image data past the last pixel");
                FrameStatus::Complete
            }
            IndexResult::Corrupt(e) => FrameStatus::Corrupt(e),
        }
    }
}

impl Iterator for FrameDecoder<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        self.decode_next_frame()
    }
}
