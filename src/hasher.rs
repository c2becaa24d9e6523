//! Sparse-aware file hashing
//!
//! [`hash_file`] walks a file in cache-block units driven by its
//! [`SparseMap`]. Whenever a whole block lies inside a hole, the block's
//! precomputed record is substituted for the 2 MiB of zero bytes (or
//! computed on the fly on a cache miss; the digest is identical either
//! way); everything else is read literally and compressed as a subtree at
//! its absolute offset. The result always equals the plain BLAKE3 hash of
//! the file's logical bytes.
//!
//! The stream keeps `pos` a multiple of `BLOCK_LEN`: below EOF a literal
//! read is always exactly one block, so the fast-path block index
//! `pos / BLOCK_LEN` is derived from the absolute file offset and a hole
//! that starts off-alignment is consumed literally until `pos` reaches its
//! first fully-covered block.

use crate::cache::{CacheRecord, CacheTable};
use crate::domain::BlockIndex;
use crate::error::HashError;
use crate::sparse::SparseMap;
use crate::tree::{subtree_cv, BlockAccumulator, BLOCK_LEN};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Compute the BLAKE3 digest of the file at `path`, substituting cache
/// records for block-aligned holes.
///
/// Hashing one file is strictly sequential; many files may be hashed
/// concurrently against the same shared `cache`.
pub fn hash_file<P: AsRef<Path>>(path: P, cache: &CacheTable) -> Result<blake3::Hash, HashError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| HashError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let size = file
        .metadata()
        .map_err(|source| HashError::Metadata {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if size == 0 {
        return Ok(blake3::hash(&[]));
    }

    let map = SparseMap::probe(path, size);
    log::debug!(
        "{}: {} bytes, {} hole range(s)",
        path.display(),
        size,
        map.len()
    );

    let mut acc = BlockAccumulator::new();
    let mut buf = vec![0u8; BLOCK_LEN];
    // Allocated only if a zero block must be compressed without a cache hit.
    let mut zeros: Option<Vec<u8>> = None;
    let mut pos = 0u64;
    let mut hole = 0usize;
    // True after cache substitutions moved `pos` past the read cursor.
    let mut seek_needed = false;

    loop {
        debug_assert_eq!(pos % BLOCK_LEN as u64, 0);
        let remaining = size - pos;

        if remaining >= BLOCK_LEN as u64 {
            let ranges = map.ranges();
            while hole < ranges.len() && ranges[hole].end <= pos {
                hole += 1;
            }
            let covered = hole < ranges.len()
                && pos >= ranges[hole].start
                && pos + BLOCK_LEN as u64 <= ranges[hole].end;
            if covered {
                let index = BlockIndex::new(pos / BLOCK_LEN as u64);
                let record = cache.lookup(index).unwrap_or_else(|| {
                    let zeros = zeros.get_or_insert_with(|| vec![0u8; BLOCK_LEN / 2]);
                    CacheRecord::for_zero_block_with(zeros, index)
                });
                pos += BLOCK_LEN as u64;
                seek_needed = true;
                if pos == size {
                    return Ok(if acc.is_empty() {
                        record.root_hash()
                    } else {
                        acc.finalize_with(record.chaining_value())
                    });
                }
                acc.push_block(record.chaining_value());
                continue;
            }
        }

        if seek_needed {
            file.seek(SeekFrom::Start(pos))
                .map_err(|source| HashError::Read {
                    path: path.to_path_buf(),
                    offset: pos,
                    source,
                })?;
            seek_needed = false;
        }

        let want = remaining.min(BLOCK_LEN as u64) as usize;
        read_full(&mut file, &mut buf[..want], path, pos)?;
        let offset = pos;
        pos += want as u64;
        if pos == size {
            return Ok(if acc.is_empty() {
                // Single-unit file: the tail is the root.
                blake3::hash(&buf[..want])
            } else {
                acc.finalize_with(subtree_cv(&buf[..want], offset))
            });
        }
        acc.push_block(subtree_cv(&buf[..want], offset));
    }
}

/// Fill `buf` completely from the current position. A read of 0 bytes is a
/// fatal inconsistency (the sparse map and size were taken from a larger
/// file than the one being read).
fn read_full(file: &mut File, buf: &mut [u8], path: &Path, offset: u64) -> Result<(), HashError> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(HashError::UnexpectedEof {
                    path: path.to_path_buf(),
                    offset: offset + filled as u64,
                    expected: (buf.len() - filled) as u64,
                })
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(HashError::Read {
                    path: path.to_path_buf(),
                    offset: offset + filled as u64,
                    source,
                })
            }
        }
    }
    Ok(())
}
