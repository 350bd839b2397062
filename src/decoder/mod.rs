mod errors;
#[cfg(test)]
pub(crate) mod fixtures;
mod interlace;
pub mod lzw;
mod parser;
mod types;
pub use errors::{FormatError, LoadError};
pub use interlace::RowSchedule;
pub use parser::{parse_header, FrameDecoder, DEFAULT_MAX_IMAGE_PIXELS};
pub use types::*;

/// Decode every frame of a GIF held in memory.
pub fn decode_all(bytes: &[u8]) -> Result<(ScreenInfo, Vec<RawFrame>), FormatError> {
    let mut decoder = FrameDecoder::new(bytes)?;
    let mut frames = Vec::new();
    while let Some(frame) = decoder.decode_next_frame() {
        frames.push(frame);
    }
    Ok((decoder.screen().clone(), frames))
}
