//! Common types used by the encoder
use std::collections::HashMap;
use std::io;
use std::io::prelude::*;

use crate::error::EncodingError;

/// Largest palette the encoder accepts
pub const MAX_COLORS: usize = 16;

/// Disposal method
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Decoder is not required to take any action.
    Any = 0,
    /// Do not dispose.
    Keep = 1,
    /// Restore to background color.
    Background = 2,
    /// Restore to previous.
    Previous = 3,
}

enum_from_primitive! {
/// Known block types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B
}
}

enum_from_primitive! {
/// Known GIF extensions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF
}
}

/// Number of times the animation is played
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Repeat {
    /// Loop forever (loop count 0)
    Infinite,
    /// Loop the given number of times
    Finite(u16),
}

impl Repeat {
    /// Loop count as stored in the NETSCAPE2.0 application extension
    pub fn loop_count(self) -> u16 {
        match self {
            Repeat::Infinite => 0,
            Repeat::Finite(n) => n,
        }
    }
}

impl Default for Repeat {
    fn default() -> Repeat {
        Repeat::Infinite
    }
}

/// A pixel as delivered by a frame source
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xFF }
    }
}

/// Fixed color table with a reverse lookup.
///
/// Index 0 is the background color. The table written to the file is padded
/// with black up to the next power of two, since the GIF size field can only
/// describe those.
#[derive(Debug, Clone)]
pub(crate) struct Palette {
    colors: Vec<Color>,
    lookup: HashMap<Color, u8>,
}

impl Palette {
    pub fn new(colors: &[Color]) -> Result<Palette, EncodingError> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(EncodingError::InvalidPalette(colors.len()));
        }
        let mut lookup = HashMap::with_capacity(colors.len());
        for (i, &color) in colors.iter().enumerate() {
            // Lowest index wins for repeated colors
            lookup.entry(color).or_insert(i as u8);
        }
        Ok(Palette {
            colors: colors.to_vec(),
            lookup,
        })
    }

    /// Number of colors supplied by the caller
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn index_of(&self, color: &Color) -> Option<u8> {
        self.lookup.get(color).cloned()
    }

    /// Number of entries in the written color table
    pub fn table_size(&self) -> usize {
        self.colors.len().next_power_of_two().max(2)
    }

    /// Color table size converted to the packed flag bits
    pub fn size_flag(&self) -> u8 {
        (self.table_size().trailing_zeros() - 1) as u8
    }

    /// Writes the table as RGB triples, alpha is dropped.
    pub fn write_table<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for c in &self.colors {
            w.write_all(&[c.r, c.g, c.b])?;
        }
        for _ in self.colors.len()..self.table_size() {
            w.write_all(&[0, 0, 0])?;
        }
        Ok(())
    }
}

/// Axis aligned rectangle, in pixels
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(left: usize, top: usize, width: usize, height: usize) -> Rect {
        Rect { left, top, width, height }
    }

    pub fn scaled(&self, scale: usize) -> Rect {
        Rect {
            left: self.left * scale,
            top: self.top * scale,
            width: self.width * scale,
            height: self.height * scale,
        }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enum_primitive::FromPrimitive;

    #[test]
    fn table_is_padded_to_power_of_two() {
        let pal = Palette::new(&[Color::rgb(1, 2, 3); 3]).unwrap();
        assert_eq!(pal.table_size(), 4);
        assert_eq!(pal.size_flag(), 1);
        let mut out = vec![];
        pal.write_table(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 1, 2, 3, 1, 2, 3, 0, 0, 0]);

        let single = Palette::new(&[Color::rgb(0, 0, 0)]).unwrap();
        assert_eq!(single.table_size(), 2);
        assert_eq!(single.size_flag(), 0);

        let full = Palette::new(&[Color::default(); 16]).unwrap();
        assert_eq!(full.size_flag(), 3);
    }

    #[test]
    fn lookup_prefers_lowest_index() {
        let red = Color::rgb(0xFF, 0, 0);
        let pal = Palette::new(&[Color::rgb(0, 0, 0), red, red]).unwrap();
        assert_eq!(pal.index_of(&red), Some(1));
        assert_eq!(pal.index_of(&Color::rgb(0, 0xFF, 0)), None);
        // alpha is part of the key
        assert_eq!(pal.index_of(&Color::new(0, 0, 0, 0)), None);
    }

    #[test]
    fn rejects_bad_palettes() {
        assert!(matches!(Palette::new(&[]), Err(EncodingError::InvalidPalette(0))));
        assert!(matches!(
            Palette::new(&[Color::default(); 17]),
            Err(EncodingError::InvalidPalette(17))
        ));
    }

    #[test]
    fn block_from_byte() {
        assert_eq!(Block::from_u8(0x2C), Some(Block::Image));
        assert_eq!(Block::from_u8(0x3B), Some(Block::Trailer));
        assert_eq!(Extension::from_u8(0xF9), Some(Extension::Control));
        assert_eq!(Block::from_u8(0x00), None);
    }
}
