//! Variable-width LZW compression as used by GIF image data.
use std::collections::HashMap;

use log::debug;

use super::hash::SequenceHash;
use crate::error::{EncodingError, EncodingResult};

/// Code table capacity defined by the GIF format
const MAX_CODES: u16 = 4096;
const MAX_CODE_SIZE: u8 = 12;
const MIN_CODE_SIZE: u8 = 2;

/// Compresses palette indices into GIF image data sub-blocks
#[derive(Debug, Clone)]
pub struct Compressor {
    palette_size: usize,
    min_code_size: u8,
}

impl Compressor {
    /// `palette_size` is the number of entries in the color table.
    pub fn new(palette_size: usize) -> Compressor {
        let bits = palette_size.max(1).next_power_of_two().trailing_zeros() as u8;
        Compressor {
            palette_size,
            min_code_size: bits.max(MIN_CODE_SIZE),
        }
    }

    /// The LZW minimum code size, first byte of the image data
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    /// Compresses `indices` into the minimum code size byte followed by the
    /// length prefixed sub-blocks and the block terminator.
    pub fn encode(&self, indices: &[u8]) -> EncodingResult<Vec<u8>> {
        let mut bits = BitWriter::new();
        self.compress(indices, |code, width| bits.write(code, width))?;
        let data = bits.finish();

        let mut out = Vec::with_capacity(data.len() + data.len() / 0xFF + 3);
        out.push(self.min_code_size);
        write_sub_blocks(&mut out, &data);
        Ok(out)
    }

    /// Runs the dictionary coder, handing every code and its bit width to
    /// `emit` in output order.
    fn compress<F>(&self, indices: &[u8], emit: F) -> EncodingResult<()>
    where
        F: FnMut(u16, u8),
    {
        self.compress_with(CodeTable::new(self.clear_code()), indices, emit)
    }

    fn compress_with<F>(&self, mut table: CodeTable, indices: &[u8], mut emit: F) -> EncodingResult<()>
    where
        F: FnMut(u16, u8),
    {
        let (&first, rest) = indices
            .split_first()
            .ok_or(EncodingError::EmptyImageData)?;
        self.check_index(first)?;

        let clear = self.clear_code();
        let eoi = clear + 1;
        let mut code_size = self.min_code_size + 1;

        emit(clear, code_size);
        let mut current = Run::single(first);

        for &symbol in rest {
            self.check_index(symbol)?;
            let hash = current.hash.extend(symbol);
            match table.lookup(hash, current.code, symbol) {
                Lookup::Found(code) => {
                    current = Run { hash, code };
                    continue;
                }
                Lookup::Missing => table.insert(hash, current.code, symbol),
                // The code number is used up either way, the decoder adds an
                // entry for every code it reads.
                Lookup::Collision => table.skip(),
            }
            emit(current.code, code_size);
            if (1 << code_size) < table.next_code() {
                code_size += 1;
            }
            if table.next_code() == MAX_CODES {
                emit(clear, code_size);
                table.reset();
                code_size = self.min_code_size + 1;
                debug!("code table full, emitted clear code");
            }
            current = Run::single(symbol);
        }

        emit(current.code, code_size);
        // A decoder grows its code size after this last code as well, before
        // it reads the end code.
        if (1 << code_size) <= table.next_code() && code_size < MAX_CODE_SIZE {
            code_size += 1;
        }
        emit(eoi, code_size);
        Ok(())
    }

    fn check_index(&self, index: u8) -> EncodingResult<()> {
        if usize::from(index) < self.palette_size {
            Ok(())
        } else {
            Err(EncodingError::InvalidIndex {
                index,
                palette_size: self.palette_size,
            })
        }
    }
}

/// Splits `data` into sub-blocks of at most 255 bytes, each prefixed with its
/// length, followed by the empty terminator block.
pub fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(0xFF) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

/// The currently matched run of indices
#[derive(Debug, Copy, Clone)]
struct Run {
    hash: SequenceHash,
    code: u16,
}

impl Run {
    fn single(symbol: u8) -> Run {
        Run {
            hash: SequenceHash::of(&[symbol]),
            code: u16::from(symbol),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Entry {
    code: u16,
    /// `None` for the single symbol roots
    prefix: Option<u16>,
    symbol: u8,
}

enum Lookup {
    Found(u16),
    Missing,
    /// Hash is taken by a different run
    Collision,
}

/// Hash keyed dictionary. Every entry remembers its prefix code and last
/// symbol so a hash hit can be checked against the run being looked up.
struct CodeTable {
    entries: HashMap<SequenceHash, Entry>,
    roots: u16,
    next_code: u16,
}

impl CodeTable {
    fn new(roots: u16) -> CodeTable {
        let mut table = CodeTable {
            entries: HashMap::with_capacity(usize::from(MAX_CODES)),
            roots,
            next_code: 0,
        };
        table.reset();
        table
    }

    fn reset(&mut self) {
        self.entries.clear();
        for symbol in 0..self.roots {
            let symbol = symbol as u8;
            self.entries.insert(
                SequenceHash::of(&[symbol]),
                Entry {
                    code: u16::from(symbol),
                    prefix: None,
                    symbol,
                },
            );
        }
        // clear and end codes
        self.next_code = self.roots + 2;
    }

    fn next_code(&self) -> u16 {
        self.next_code
    }

    fn lookup(&self, hash: SequenceHash, prefix: u16, symbol: u8) -> Lookup {
        match self.entries.get(&hash) {
            Some(e) if e.prefix == Some(prefix) && e.symbol == symbol => Lookup::Found(e.code),
            Some(_) => Lookup::Collision,
            None => Lookup::Missing,
        }
    }

    fn insert(&mut self, hash: SequenceHash, prefix: u16, symbol: u8) {
        self.entries.insert(
            hash,
            Entry {
                code: self.next_code,
                prefix: Some(prefix),
                symbol,
            },
        );
        self.next_code += 1;
    }

    fn skip(&mut self) {
        self.next_code += 1;
    }
}

/// Packs codes least significant bit first
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    /// Next free bit in `current`, 0..=7
    bit: u8,
}

impl BitWriter {
    fn new() -> BitWriter {
        BitWriter {
            bytes: Vec::new(),
            current: 0,
            bit: 0,
        }
    }

    fn write(&mut self, code: u16, width: u8) {
        for i in 0..width {
            self.current |= (((code >> i) & 1) as u8) << self.bit;
            self.bit += 1;
            if self.bit == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.bit = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bit != 0 {
            self.bytes.push(self.current);
        }
        self.bytes
    }
}
