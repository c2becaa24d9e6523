//! Core domain types
//!
//! A cache record is identified solely by its position in the tree, so the
//! index deserves its own type: mixing it up with a byte offset or a chunk
//! counter would produce silently wrong digests, not a crash.

use crate::tree::{BLOCK_CHUNKS, BLOCK_LEN};

/// Position of a cache block: block `i` covers file bytes
/// `[i * BLOCK_LEN, (i + 1) * BLOCK_LEN)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIndex(u64);

impl BlockIndex {
    pub fn new(index: u64) -> Self {
        BlockIndex(index)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Chunk counter of the block's first chunk (what BLAKE3 folds into the
    /// compression of every chunk in the block).
    pub fn chunk_counter(self) -> u64 {
        self.0 * BLOCK_CHUNKS as u64
    }

    /// Absolute byte offset of the block's first byte.
    pub fn byte_offset(self) -> u64 {
        self.0 * BLOCK_LEN as u64
    }
}

impl From<u64> for BlockIndex {
    fn from(index: u64) -> Self {
        BlockIndex::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        let index = BlockIndex::new(3);
        assert_eq!(index.as_u64(), 3);
        assert_eq!(index.chunk_counter(), 3 * BLOCK_CHUNKS as u64);
        assert_eq!(index.byte_offset(), 3 * BLOCK_LEN as u64);
        assert_eq!(BlockIndex::from(3), index);
    }
}
