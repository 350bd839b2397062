use thiserror::Error;

/// Fatal problems with the header. Any of these means there is nothing to
/// play.
#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("not a GIF87a/GIF89a file (signature {0:?})")]
    BadSignature(Vec<u8>),

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    #[error("truncated {0}")]
    Truncated(&'static str),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("unable to read file: {0}")]
    Io(#[from] std::io::Error),
}
