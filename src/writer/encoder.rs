use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::Path;

use log::{debug, info, warn};

use super::diff;
use super::lzw::Compressor;
use crate::error::{EncodingError, EncodingResult};
use crate::traits::{FrameSource, HasParameters, Parameter, WriteBytesExt};
use crate::types::{Block, Color, DisposalMethod, Extension, Palette, Rect, Repeat};

/// Delay of a single frame in 1/100 s
pub const DEFAULT_FRAME_DELAY: u16 = 3;
/// Palette index used for colors missing from the palette
pub const DEFAULT_MISSING_COLOR: u8 = 8;

const NETSCAPE: &[u8; 11] = b"NETSCAPE2.0";

pub enum ExtensionData {
    Control { flags: u8, delay: u16, trns: u8 },
}

impl ExtensionData {
    pub fn new_control_ext(
        delay: u16,
        dispose: DisposalMethod,
        needs_user_input: bool,
        trns: Option<u8>,
    ) -> ExtensionData {
        let mut flags = 0;
        let trns = match trns {
            Some(trns) => {
                flags |= 1;
                trns
            }
            None => 0,
        };
        flags |= (needs_user_input as u8) << 1;
        flags |= (dispose as u8) << 2;
        ExtensionData::Control { flags, delay, trns }
    }
}

/// Display time of one recorded frame, in 1/100 s
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameDelay(pub u16);

/// Palette index substituted for pixels whose color is not in the palette
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MissingColor(pub u8);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Accumulating,
    Finished,
}

/// Records palette frames and turns them into a looping animated GIF.
///
/// Frames are buffered by `add_frame`. `finish` merges runs of identical
/// frames, crops every frame after the first to the region that changed
/// and writes the result after the header that is prepared on creation.
#[derive(Debug)]
pub struct Encoder {
    width: u16,
    height: u16,
    scale: u16,
    palette: Palette,
    compressor: Compressor,
    frames: Vec<Vec<u8>>,
    data: Vec<u8>,
    /// Offset of the loop count inside `data`
    loop_count_at: usize,
    frame_delay: u16,
    missing_color: u8,
    state: State,
}

impl HasParameters for Encoder {}

impl Parameter<Encoder> for FrameDelay {
    fn set_param(self, this: &mut Encoder) {
        if this.warn_if_finished("frame delay") {
            return;
        }
        this.frame_delay = self.0;
    }
}

impl Parameter<Encoder> for Repeat {
    fn set_param(self, this: &mut Encoder) {
        if this.warn_if_finished("repeat") {
            return;
        }
        let at = this.loop_count_at;
        let count = self.loop_count();
        this.data[at..at + 2].copy_from_slice(&[count as u8, (count >> 8) as u8]);
    }
}

impl Parameter<Encoder> for MissingColor {
    fn set_param(self, this: &mut Encoder) {
        if this.warn_if_finished("missing color") {
            return;
        }
        this.missing_color = self.0.min(this.last_color());
    }
}

impl Encoder {
    /// Creates an encoder for frames of `width` x `height` pixels that are
    /// written `scale` times larger.
    ///
    /// `palette` holds up to 16 colors, the first one being the background.
    pub fn new(width: u16, height: u16, scale: u16, palette: &[Color]) -> EncodingResult<Encoder> {
        if scale == 0 {
            return Err(EncodingError::InvalidScale);
        }
        if width == 0 || height == 0 {
            return Err(EncodingError::InvalidSize { width, height });
        }
        let palette = Palette::new(palette)?;
        let compressor = Compressor::new(palette.table_size());
        let mut encoder = Encoder {
            width,
            height,
            scale,
            palette,
            compressor,
            frames: Vec::new(),
            data: Vec::new(),
            loop_count_at: 0,
            frame_delay: DEFAULT_FRAME_DELAY,
            missing_color: 0,
            state: State::Accumulating,
        };
        encoder.missing_color = DEFAULT_MISSING_COLOR.min(encoder.last_color());
        encoder.write_header()?;
        Ok(encoder)
    }

    /// Buffers a frame given as one color per pixel, row by row.
    ///
    /// Colors that are not in the palette are replaced by the missing color
    /// index.
    pub fn add_frame(&mut self, pixels: &[Color]) -> EncodingResult<()> {
        self.check_frame(pixels.len())?;
        let missing = self.missing_color;
        let frame = pixels
            .iter()
            .map(|c| self.palette.index_of(c).unwrap_or(missing))
            .collect();
        self.frames.push(frame);
        Ok(())
    }

    /// Buffers a frame that is already made of palette indices.
    pub fn add_indexed_frame(&mut self, indices: &[u8]) -> EncodingResult<()> {
        self.check_frame(indices.len())?;
        let palette_size = self.palette.len();
        if let Some(&index) = indices.iter().find(|&&i| usize::from(i) >= palette_size) {
            return Err(EncodingError::InvalidIndex { index, palette_size });
        }
        self.frames.push(indices.to_vec());
        Ok(())
    }

    /// Encodes all buffered frames and terminates the file.
    ///
    /// Can be called once; afterwards the encoder only hands out its data.
    pub fn finish(&mut self) -> EncodingResult<()> {
        if self.state == State::Finished {
            return Err(EncodingError::AlreadyFinished);
        }
        let header_len = self.data.len();
        if let Err(e) = self.write_frames() {
            self.data.truncate(header_len);
            return Err(e);
        }
        self.state = State::Finished;
        Ok(())
    }

    /// Writes all frames and the trailer after the header.
    fn write_frames(&mut self) -> EncodingResult<()> {
        let width = usize::from(self.width);
        let scale = usize::from(self.scale);
        let full = Rect::new(0, 0, width, usize::from(self.height));

        let mut delay = self.frame_delay;
        let mut last: Option<usize> = None;
        let mut written = 0;
        for f in 0..self.frames.len() {
            let frame = &self.frames[f];
            if self.frames.get(f + 1) == Some(frame) {
                debug!("frame {} repeats, extending the delay of the next one", f);
                delay = delay.saturating_add(self.frame_delay);
                continue;
            }
            let rect = match last {
                None => full,
                Some(prev) => match diff::changed_region(&self.frames[prev], frame, width) {
                    Some(rect) => rect,
                    None => {
                        debug!("frame {} repeats frame {}", f, prev);
                        delay = delay.saturating_add(self.frame_delay);
                        continue;
                    }
                },
            };
            let pixels = diff::extract_scaled(frame, width, rect, scale);
            self.write_frame(delay, rect.scaled(scale), &pixels)?;
            delay = self.frame_delay;
            last = Some(f);
            written += 1;
        }
        self.data.write_le(Block::Trailer as u8)?;
        info!("wrote {} of {} frames to gif", written, self.frames.len());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Number of buffered frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The file written so far. Complete once `finish` returned.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Writes the finished file to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> EncodingResult<()> {
        if !self.is_finished() {
            return Err(EncodingError::NotFinished);
        }
        w.write_all(&self.data)?;
        Ok(())
    }

    /// Saves the finished file, creating missing parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> EncodingResult<()> {
        if !self.is_finished() {
            return Err(EncodingError::NotFinished);
        }
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, &self.data)?;
        Ok(())
    }

    fn check_frame(&self, len: usize) -> EncodingResult<()> {
        if self.state == State::Finished {
            return Err(EncodingError::AlreadyFinished);
        }
        let expected = usize::from(self.width) * usize::from(self.height);
        if len != expected {
            return Err(EncodingError::FrameSize { expected, actual: len });
        }
        Ok(())
    }

    fn last_color(&self) -> u8 {
        (self.palette.len() - 1) as u8
    }

    fn warn_if_finished(&self, what: &str) -> bool {
        if self.is_finished() {
            warn!("ignoring {} set after the gif was finished", what);
        }
        self.is_finished()
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.data.write_all(b"GIF89a")?;
        self.write_screen_desc()?;
        self.palette.write_table(&mut self.data)?;
        self.write_loop_ext(Repeat::Infinite)
    }

    /// Writes the logical screen descriptor
    fn write_screen_desc(&mut self) -> io::Result<()> {
        // Not checked to fit
        self.data.write_le(self.width.wrapping_mul(self.scale))?;
        self.data.write_le(self.height.wrapping_mul(self.scale))?;
        // global table, color resolution 1, sorted, table size
        let flags = 0b1000_0000 | 0b0001_0000 | 0b0000_1000 | self.palette.size_flag();
        self.data.write_le(flags)?;
        self.data.write_le(0u8)?; // bg index
        self.data.write_le(0u8) // aspect ratio
    }

    /// Writes the NETSCAPE2.0 looping extension
    fn write_loop_ext(&mut self, repeat: Repeat) -> io::Result<()> {
        self.data.write_le(Block::Extension as u8)?;
        self.data.write_le(Extension::Application as u8)?;
        self.data.write_le(NETSCAPE.len() as u8)?;
        self.data.write_all(NETSCAPE)?;
        self.data.write_le(3u8)?;
        self.data.write_le(1u8)?;
        self.loop_count_at = self.data.len();
        self.data.write_le(repeat.loop_count())?;
        self.data.write_le(0u8)
    }

    /// Writes an extension to the image
    fn write_extension(&mut self, extension: ExtensionData) -> io::Result<()> {
        self.data.write_le(Block::Extension as u8)?;
        match extension {
            ExtensionData::Control { flags, delay, trns } => {
                self.data.write_le(Extension::Control as u8)?;
                self.data.write_le(4u8)?;
                self.data.write_le(flags)?;
                self.data.write_le(delay)?;
                self.data.write_le(trns)?;
            }
        }
        self.data.write_le(0u8)
    }

    /// Writes control extension, image descriptor and image data. `rect` is
    /// in output pixels.
    fn write_frame(&mut self, delay: u16, rect: Rect, pixels: &[u8]) -> EncodingResult<()> {
        let image = self.compressor.encode(pixels)?;
        self.write_extension(ExtensionData::new_control_ext(
            delay,
            DisposalMethod::Keep,
            false,
            None,
        ))?;
        self.data.write_le(Block::Image as u8)?;
        self.data.write_le(rect.left as u16)?;
        self.data.write_le(rect.top as u16)?;
        self.data.write_le(rect.width as u16)?;
        self.data.write_le(rect.height as u16)?;
        // no local table, not interlaced
        self.data.write_le(0u8)?;
        self.data.extend_from_slice(&image);
        Ok(())
    }
}

/// Records every frame of `source` and returns the finished file.
pub fn encode_source<S: FrameSource>(
    source: &mut S,
    width: u16,
    height: u16,
    scale: u16,
) -> EncodingResult<Vec<u8>> {
    let mut encoder = Encoder::new(width, height, scale, &source.palette())?;
    while let Some(frame) = source.next_frame() {
        encoder.add_frame(&frame)?;
    }
    encoder.finish()?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Color = Color::rgb(0, 0, 0);
    const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    const RED: Color = Color::rgb(0xFF, 0, 0);

    fn palette() -> Vec<Color> {
        vec![BLACK, WHITE, Color::new(0, 0, 0, 0), RED]
    }

    #[test]
    fn header_is_written_on_creation() {
        let encoder = Encoder::new(3, 2, 2, &palette()).unwrap();
        let data = encoder.data();
        assert_eq!(&data[..6], b"GIF89a");
        assert_eq!(&data[6..13], [6, 0, 4, 0, 0x99, 0, 0]);
        assert_eq!(data.len(), 6 + 7 + 12 + 19);
        assert!(!encoder.is_finished());
    }

    #[test]
    fn repeat_patches_loop_count() {
        let mut encoder = Encoder::new(1, 1, 1, &palette()).unwrap();
        encoder.set(Repeat::Finite(0x0102));
        let data = encoder.data();
        assert_eq!(&data[data.len() - 3..], [0x02, 0x01, 0]);
        encoder.set(Repeat::Infinite);
        let data = encoder.data();
        assert_eq!(&data[data.len() - 3..], [0, 0, 0]);
    }

    #[test]
    fn missing_colors_use_sentinel() {
        let mut colors = palette();
        colors.resize(16, Color::rgb(1, 1, 1));
        let mut encoder = Encoder::new(2, 1, 1, &colors).unwrap();
        encoder.add_frame(&[RED, Color::rgb(9, 9, 9)]).unwrap();
        assert_eq!(encoder.frames[0], [3, 8]);

        // small palettes fall back to their last color
        let mut encoder = Encoder::new(2, 1, 1, &palette()).unwrap();
        encoder.add_frame(&[WHITE, Color::rgb(9, 9, 9)]).unwrap();
        assert_eq!(encoder.frames[0], [1, 3]);

        encoder.set(MissingColor(0));
        encoder.add_frame(&[WHITE, Color::rgb(9, 9, 9)]).unwrap();
        assert_eq!(encoder.frames[1], [1, 0]);
    }

    #[test]
    fn frame_size_is_checked() {
        let mut encoder = Encoder::new(2, 2, 1, &palette()).unwrap();
        assert!(matches!(
            encoder.add_frame(&[BLACK; 3]),
            Err(EncodingError::FrameSize { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            encoder.add_indexed_frame(&[0, 1, 2, 4]),
            Err(EncodingError::InvalidIndex { index: 4, palette_size: 4 })
        ));
        assert_eq!(encoder.frame_count(), 0);
    }

    #[test]
    fn zero_scale_is_rejected() {
        assert!(matches!(
            Encoder::new(2, 2, 0, &palette()),
            Err(EncodingError::InvalidScale)
        ));
    }

    #[test]
    fn empty_frame_size_is_rejected() {
        assert!(matches!(
            Encoder::new(0, 2, 1, &palette()),
            Err(EncodingError::InvalidSize { width: 0, height: 2 })
        ));
        assert!(matches!(
            Encoder::new(3, 0, 2, &palette()),
            Err(EncodingError::InvalidSize { width: 3, height: 0 })
        ));
    }

    #[test]
    fn failed_finish_leaves_header_only() {
        let mut encoder = Encoder::new(2, 1, 1, &palette()).unwrap();
        let header = encoder.data().to_vec();
        encoder.add_indexed_frame(&[0, 1]).unwrap();
        // bypasses the index check of add_indexed_frame
        encoder.frames.push(vec![1, 9]);
        for _ in 0..2 {
            assert!(matches!(
                encoder.finish(),
                Err(EncodingError::InvalidIndex { index: 9, palette_size: 4 })
            ));
            assert_eq!(encoder.data(), &header[..]);
            assert!(!encoder.is_finished());
        }

        encoder.frames.pop();
        encoder.finish().unwrap();
        assert!(encoder.data().len() > header.len());
        assert_eq!(encoder.data()[encoder.data().len() - 1], Block::Trailer as u8);
    }

    #[test]
    fn finish_only_once() {
        let mut encoder = Encoder::new(2, 2, 1, &palette()).unwrap();
        encoder.add_frame(&[BLACK; 4]).unwrap();
        encoder.finish().unwrap();
        let len = encoder.data().len();
        assert!(matches!(encoder.finish(), Err(EncodingError::AlreadyFinished)));
        assert!(matches!(
            encoder.add_frame(&[BLACK; 4]),
            Err(EncodingError::AlreadyFinished)
        ));
        encoder.set(FrameDelay(10)).set(Repeat::Finite(3));
        assert_eq!(encoder.data().len(), len);
        assert_eq!(encoder.data()[len - 1], Block::Trailer as u8);
    }

    #[test]
    fn empty_animation() {
        let mut encoder = Encoder::new(2, 2, 1, &palette()).unwrap();
        let header = encoder.data().to_vec();
        encoder.finish().unwrap();
        let mut expected = header;
        expected.push(0x3B);
        assert_eq!(encoder.data(), &expected[..]);
    }

    #[test]
    fn unfinished_data_is_not_written() {
        let encoder = Encoder::new(2, 2, 1, &palette()).unwrap();
        let mut out = vec![];
        assert!(matches!(
            encoder.write_to(&mut out),
            Err(EncodingError::NotFinished)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn control_extension_flags() {
        match ExtensionData::new_control_ext(7, DisposalMethod::Keep, false, None) {
            ExtensionData::Control { flags, delay, trns } => {
                assert_eq!((flags, delay, trns), (0x04, 7, 0))
            }
        }
        match ExtensionData::new_control_ext(0, DisposalMethod::Background, true, Some(5)) {
            ExtensionData::Control { flags, trns, .. } => assert_eq!((flags, trns), (0x0B, 5)),
        }
    }
}
