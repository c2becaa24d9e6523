//! The 64-byte cache record
//!
//! A record stores the parent node of one all-zero cache block: the
//! chaining values of its left and right half-block children, 32 bytes
//! each. Keeping the node rather than the merged chaining value lets the
//! same record serve both merge positions: as an interior subtree of a
//! larger file (non-root merge) and as the entire file (root merge), which
//! a plain chaining value cannot be turned back into.

use crate::domain::BlockIndex;
use crate::tree::{subtree_cv, BLOCK_LEN};
use blake3::hazmat::{merge_subtrees_non_root, merge_subtrees_root, ChainingValue, Mode};

/// On-disk record length: two 32-byte chaining values, no header, no
/// versioning. Record `i` lives at byte offset `i * RECORD_LEN`.
pub const RECORD_LEN: usize = 64;

const HALF_BLOCK_LEN: usize = BLOCK_LEN / 2;

/// Parent node of one zero cache block, determined entirely by the block's
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheRecord {
    left: ChainingValue,
    right: ChainingValue,
}

impl CacheRecord {
    /// Compute the record for the all-zero block at `index`.
    pub fn for_zero_block(index: BlockIndex) -> Self {
        let zeros = vec![0u8; HALF_BLOCK_LEN];
        Self::for_zero_block_with(&zeros, index)
    }

    /// Same as [`for_zero_block`](Self::for_zero_block) with a
    /// caller-provided zero buffer of `BLOCK_LEN / 2` bytes, so batch
    /// producers can reuse one allocation.
    pub fn for_zero_block_with(zeros: &[u8], index: BlockIndex) -> Self {
        debug_assert_eq!(zeros.len(), HALF_BLOCK_LEN);
        debug_assert!(zeros.iter().all(|&b| b == 0));

        let offset = index.byte_offset();
        CacheRecord {
            left: subtree_cv(zeros, offset),
            right: subtree_cv(zeros, offset + HALF_BLOCK_LEN as u64),
        }
    }

    pub fn from_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        let mut left = [0u8; 32];
        let mut right = [0u8; 32];
        left.copy_from_slice(&bytes[..32]);
        right.copy_from_slice(&bytes[32..]);
        CacheRecord { left, right }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[..32].copy_from_slice(&self.left);
        bytes[32..].copy_from_slice(&self.right);
        bytes
    }

    /// Chaining value of the whole block, for merging into a larger tree.
    pub fn chaining_value(&self) -> ChainingValue {
        merge_subtrees_non_root(&self.left, &self.right, Mode::Hash)
    }

    /// Root hash for the case where this block is the entire file.
    pub fn root_hash(&self) -> blake3::Hash {
        merge_subtrees_root(&self.left, &self.right, Mode::Hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        let record = CacheRecord::for_zero_block(BlockIndex::new(1));
        assert_eq!(CacheRecord::from_bytes(record.to_bytes()), record);
    }

    #[test]
    fn chaining_value_matches_direct_compression() {
        let zeros = vec![0u8; BLOCK_LEN];
        for index in [0u64, 1, 7] {
            let record = CacheRecord::for_zero_block(BlockIndex::new(index));
            assert_eq!(
                record.chaining_value(),
                subtree_cv(&zeros, index * BLOCK_LEN as u64),
                "index {index}"
            );
        }
    }

    #[test]
    fn root_hash_matches_plain_blake3_of_one_zero_block() {
        let zeros = vec![0u8; BLOCK_LEN];
        let record = CacheRecord::for_zero_block(BlockIndex::new(0));
        assert_eq!(record.root_hash(), blake3::hash(&zeros));
    }

    #[test]
    fn records_differ_by_position() {
        let a = CacheRecord::for_zero_block(BlockIndex::new(0));
        let b = CacheRecord::for_zero_block(BlockIndex::new(1));
        assert_ne!(a, b);
    }
}
