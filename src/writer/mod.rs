mod diff;
mod encoder;
mod hash;
mod lzw;

pub use self::encoder::{encode_source, Encoder, ExtensionData, FrameDelay, MissingColor};
pub use self::hash::SequenceHash;
pub use self::lzw::Compressor;
