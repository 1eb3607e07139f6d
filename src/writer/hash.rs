//! Rolling hash over runs of palette indices.
//!
//! Used as the key of the LZW code table, so a run can be extended by one
//! symbol without rehashing it from the start.

const SEED: i32 = 487;
const MODIFIER: i32 = 31;

/// Hash of a sequence of palette indices
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SequenceHash(i32);

impl SequenceHash {
    /// Hashes a whole sequence.
    pub fn of(items: &[u8]) -> SequenceHash {
        items.iter().fold(SequenceHash(SEED), |h, &x| h.extend(x))
    }

    /// Hash of the same sequence with `item` appended.
    #[inline]
    pub fn extend(self, item: u8) -> SequenceHash {
        SequenceHash(self.0.wrapping_mul(MODIFIER).wrapping_add(i32::from(item)))
    }

    pub fn value(self) -> i32 {
        self.0
    }
}
