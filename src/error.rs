use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("palette must hold between 1 and 16 colors, got {0}")]
    InvalidPalette(usize),

    #[error("scale must be at least 1")]
    InvalidScale,

    #[error("frame size {width}x{height} has no pixels")]
    InvalidSize { width: u16, height: u16 },

    #[error("frame has {actual} pixels, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("palette index {index} is outside a table of {palette_size} colors")]
    InvalidIndex { index: u8, palette_size: usize },

    #[error("no image data to compress")]
    EmptyImageData,

    #[error("the animation has already been finished")]
    AlreadyFinished,

    #[error("the animation has not been finished yet")]
    NotFinished,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type EncodingResult<T> = Result<T, EncodingError>;
