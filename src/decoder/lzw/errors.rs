use thiserror::Error;

/// Why a single frame's compressed data could not be decoded to the end.
///
/// These never abort a load: the frame keeps whatever was written before the
/// fault and the parser moves on to the next block.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum StreamCorrupt {
    #[error("LZW Min Code Size of {0} is invalid! Only 2 to 8 inclusive is allowed!")]
    InvalidRootSize(u8),

    #[error("LZW code {code} is not valid here (clear code is {clear_code})")]
    InvalidCode { code: u16, clear_code: u16 },

    #[error("LZW table entry {0} refers to itself")]
    CyclicEntry(u16),

    #[error("LZW expansion overflowed the output stack")]
    StackOverflow,

    #[error("data after the end code is not a block terminator")]
    MalformedTerminator,

    #[error("data sub-block is truncated")]
    TruncatedSubBlock,

    #[error("image data ended after {decoded} of {expected} pixels")]
    PrematureEnd { decoded: usize, expected: usize },
}
