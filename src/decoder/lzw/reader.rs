use bitter::{BitReader, LittleEndianReader};
use nom::{multi::length_data, number::complete::le_u8, IResult};

use super::errors::StreamCorrupt;
use super::types::{CodeResult, MAX_CODE_SIZE};

/// One length-prefixed data sub-block. A zero length is the terminator.
pub fn sub_block(bytes: &[u8]) -> IResult<&[u8], &[u8]> {
    length_data(le_u8)(bytes)
}

/// Pulls fixed-width code words out of a chain of data sub-blocks.
///
/// The reader does not own the input; the caller hands in the unread part of
/// the file on every call and the reader advances it past each sub-block it
/// consumes. Only the unread tail of the previous sub-block is carried over
/// when the next one is fetched, so codes can straddle block boundaries.
#[derive(Debug, Default)]
pub struct BlockReader {
    buffer: Vec<u8>,
    bit_pos: usize,
    finished: bool,
}

impl BlockReader {
    pub fn new() -> Self {
        BlockReader {
            buffer: Vec::with_capacity(2 + u8::MAX as usize),
            bit_pos: 0,
            finished: false,
        }
    }

    /// Forget everything buffered for the previous image.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.bit_pos = 0;
        self.finished = false;
    }

    /// True once the zero-length terminator has been consumed (or the input
    /// ran out).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn available_bits(&self) -> usize {
        self.buffer.len() * 8 - self.bit_pos
    }

    fn read_block<'a>(&mut self, input: &mut &'a [u8]) -> Result<&'a [u8], StreamCorrupt> {
        match sub_block(*input) {
            Ok((rest, block)) => {
                *input = rest;
                if block.is_empty() {
                    self.finished = true;
                }
                Ok(block)
            }
            Err(_) => {
                // Nothing after a torn sub-block can be trusted as a block boundary.
                *input = &[];
                self.finished = true;
                Err(StreamCorrupt::TruncatedSubBlock)
            }
        }
    }

    fn refill(&mut self, input: &mut &[u8]) -> Result<(), StreamCorrupt> {
        let consumed = self.bit_pos / 8;
        self.buffer.drain(..consumed);
        self.bit_pos -= consumed * 8;
        let block = self.read_block(input)?;
        self.buffer.extend_from_slice(block);
        Ok(())
    }

    pub fn next_code(&mut self, input: &mut &[u8], width: u8) -> CodeResult {
        debug_assert!((1..=MAX_CODE_SIZE).contains(&width));
        let width = width as usize;
        while self.available_bits() < width {
            if self.finished {
                return CodeResult::EndOfStream;
            }
            if let Err(e) = self.refill(input) {
                return CodeResult::Corrupt(e);
            }
        }

        let mut bits = LittleEndianReader::new(&self.buffer[self.bit_pos / 8..]);
        let skip = (self.bit_pos % 8) as u32;
        if skip > 0 && bits.read_bits(skip).is_none() {
            return CodeResult::EndOfStream;
        }
        match bits.read_bits(width as u32) {
            Some(code) => {
                self.bit_pos += width;
                CodeResult::Code(code as u16)
            }
            None => CodeResult::EndOfStream,
        }
    }

    /// Called after the end code: the very next sub-block must be the
    /// terminator.
    pub fn finish(&mut self, input: &mut &[u8]) -> Result<(), StreamCorrupt> {
        if self.finished {
            return Ok(());
        }
        let block = self.read_block(input)?;
        if block.is_empty() {
            Ok(())
        } else {
            Err(StreamCorrupt::MalformedTerminator)
        }
    }

    /// Discard sub-blocks up to and including the terminator so the caller
    /// is positioned on the next top-level block.
    pub fn skip_to_terminator(&mut self, input: &mut &[u8]) {
        self.buffer.clear();
        self.bit_pos = 0;
        while !self.finished {
            if self.read_block(input).is_err() {
                break;
            }
        }
    }
}
