//! BLAKE3 tree primitives for block-level hashing
//!
//! The sparse fast path works by substituting a precomputed chaining value
//! for an aligned block of zero bytes instead of compressing the bytes
//! themselves. That only produces the right digest if the rest of the file
//! is hashed with the same tree shape, so this module also provides the
//! block-level accumulator that reassembles per-block chaining values into
//! the standard BLAKE3 root.
//!
//! A chaining value computed here depends on the block's absolute byte
//! offset in the file (BLAKE3 folds the chunk counter into every
//! compression), which is what makes a positionally-keyed cache possible in
//! the first place.

use blake3::hazmat::{merge_subtrees_non_root, merge_subtrees_root, ChainingValue, HasherExt, Mode};

/// BLAKE3 chunk length in bytes (the tree's smallest addressable unit)
pub const CHUNK_LEN: usize = 1024;

/// Chunks per cache block. Must be a power of two so a block is a complete
/// subtree of the BLAKE3 tree.
pub const BLOCK_CHUNKS: usize = 2048;

/// Cache block length in bytes (2 MiB)
pub const BLOCK_LEN: usize = BLOCK_CHUNKS * CHUNK_LEN;

/// Compute the non-root chaining value of a subtree located at an absolute
/// byte offset in the file.
///
/// The caller must uphold the BLAKE3 subtree rules: `offset` is a multiple
/// of [`CHUNK_LEN`] and is aligned for `data.len()` (every call in this
/// crate uses block-aligned offsets with at most one block of data, which
/// always satisfies them). The result is only meaningful as part of a
/// larger tree; a subtree that is the entire file must be root-finalized
/// instead.
pub fn subtree_cv(data: &[u8], offset: u64) -> ChainingValue {
    debug_assert!(!data.is_empty());
    debug_assert_eq!(offset % CHUNK_LEN as u64, 0);

    let mut hasher = blake3::Hasher::new();
    hasher.set_input_offset(offset);
    hasher.update(data);
    hasher.finalize_non_root()
}

/// Incremental reassembly of per-block chaining values into a BLAKE3 root.
///
/// This is the same binary-counter stack BLAKE3's own hasher keeps at chunk
/// granularity, lifted to [`BLOCK_LEN`] units: after `n` completed blocks
/// the stack holds one chaining value per set bit of `n`. The final unit of
/// the file must go through [`finalize_with`](Self::finalize_with) rather
/// than [`push_block`](Self::push_block) because its topmost merge carries
/// the root flag.
#[derive(Debug, Default)]
pub struct BlockAccumulator {
    stack: Vec<ChainingValue>,
    blocks: u64,
}

impl BlockAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first block has been pushed. An empty accumulator
    /// means the final unit is the whole tree and must be root-hashed
    /// directly.
    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    /// Number of completed (non-final) blocks absorbed so far.
    pub fn completed_blocks(&self) -> u64 {
        self.blocks
    }

    /// Absorb the chaining value of a completed block. Must not be called
    /// for the file's final block.
    pub fn push_block(&mut self, cv: ChainingValue) {
        self.blocks += 1;
        let mut total = self.blocks;
        let mut cv = cv;
        // Merge completed sibling subtrees, one level per trailing zero bit.
        while total & 1 == 0 {
            let left = self
                .stack
                .pop()
                .expect("stack holds one chaining value per set bit of the block count");
            cv = merge_subtrees_non_root(&left, &cv, Mode::Hash);
            total >>= 1;
        }
        self.stack.push(cv);
    }

    /// Merge the final unit's chaining value up the right spine of the tree
    /// and produce the root hash. Requires at least one completed block;
    /// a single-unit file never reaches the accumulator.
    pub fn finalize_with(mut self, final_cv: ChainingValue) -> blake3::Hash {
        let mut right = final_cv;
        loop {
            let left = self
                .stack
                .pop()
                .expect("finalize_with requires at least one completed block");
            if self.stack.is_empty() {
                return merge_subtrees_root(&left, &right, Mode::Hash);
            }
            right = merge_subtrees_non_root(&left, &right, Mode::Hash);
        }
    }
}
