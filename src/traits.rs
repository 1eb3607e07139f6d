//! Traits used in this library
use std::io;

use crate::types::Color;

/// Configuration parameter trait
pub trait Parameter<Object> {
    fn set_param(self, this: &mut Object);
}

/// Object has parameters
pub trait HasParameters: Sized {
    fn set<T: Parameter<Self>>(&mut self, value: T) -> &mut Self {
        value.set_param(self);
        self
    }
}

/// Writer extension to write little endian data
pub trait WriteBytesExt<T> {
    fn write_le(&mut self, n: T) -> io::Result<()>;
}

impl<W: io::Write + ?Sized> WriteBytesExt<u8> for W {
    #[inline]
    fn write_le(&mut self, n: u8) -> io::Result<()> {
        self.write_all(&[n])
    }
}

impl<W: io::Write + ?Sized> WriteBytesExt<u16> for W {
    #[inline]
    fn write_le(&mut self, n: u16) -> io::Result<()> {
        self.write_all(&[n as u8, (n >> 8) as u8])
    }
}

/// Supplier of frames to record.
///
/// Frames are row-major pixel arrays at native resolution.
pub trait FrameSource {
    /// The fixed colors all frames are drawn with, background first
    fn palette(&self) -> Vec<Color>;

    /// Next frame in display order, `None` once exhausted
    fn next_frame(&mut self) -> Option<Vec<Color>>;
}
