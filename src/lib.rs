//! # Animated GIF encoder for small fixed palettes
//!
//! Frames are recorded as palette indices and written into a looping GIF89a
//! file once recording is done. Runs of identical frames become a single
//! longer frame and every frame after the first only stores the rectangle
//! that changed.
//!
//! ```
//! use palette_gif::{Color, Encoder, FrameDelay, HasParameters};
//!
//! let black = Color::rgb(0, 0, 0);
//! let white = Color::rgb(0xFF, 0xFF, 0xFF);
//! let mut encoder = Encoder::new(2, 2, 4, &[black, white]).unwrap();
//! encoder.set(FrameDelay(10));
//! encoder.add_frame(&[black, white, white, black]).unwrap();
//! encoder.add_frame(&[black, white, white, white]).unwrap();
//! encoder.finish().unwrap();
//! assert_eq!(encoder.data().last(), Some(&0x3B));
//! ```

#[macro_use]
extern crate enum_primitive;

mod error;
mod traits;
mod types;
mod writer;

pub use crate::error::{EncodingError, EncodingResult};
pub use crate::traits::{FrameSource, HasParameters, Parameter};
pub use crate::types::{Block, Color, DisposalMethod, Extension, Rect, Repeat, MAX_COLORS};

pub use crate::writer::{
    encode_source, Compressor, Encoder, ExtensionData, FrameDelay, MissingColor, SequenceHash,
};

#[cfg(test)]
#[test]
fn round_trip() {
    let palette: Vec<Color> = (0..16u8).map(|i| Color::rgb(i * 16, i, 0xFF - i)).collect();
    let frame: Vec<Color> = (0..12 * 7).map(|i| palette[i % 16]).collect();
    let mut encoder = Encoder::new(12, 7, 1, &palette).unwrap();
    encoder.add_frame(&frame).unwrap();
    encoder.finish().unwrap();
    let data = encoder.into_bytes();

    // screen descriptor, table, loop extension, control extension, descriptor
    let image_at = 6 + 7 + 16 * 3 + 19 + 8;
    assert_eq!(data[image_at], Block::Image as u8);
    assert_eq!(&data[image_at + 1..image_at + 10], [0, 0, 0, 0, 12, 0, 7, 0, 0]);
    let lzw = Compressor::new(16)
        .encode(&(0..12 * 7).map(|i| (i % 16) as u8).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(&data[image_at + 10..data.len() - 1], &lzw[..]);
    assert_eq!(data[data.len() - 1], Block::Trailer as u8);
}
