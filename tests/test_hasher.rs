//! End-to-end digest tests
//!
//! The load-bearing property everywhere: the digest equals the plain
//! BLAKE3 hash of the file's logical bytes, whether or not the sparse map
//! found anything and whether or not a cache table is present.

use b3zsum::{generate_table, hash_file, CacheTable, HashError, BLOCK_LEN, WAVE_BATCH};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Create a file that is `len` bytes of zeros with `data` written at
/// `offset`, leaving the rest unwritten so a supporting filesystem stores
/// it sparsely. Returns the path and the logical contents.
fn sparse_file(dir: &TempDir, name: &str, len: u64, offset: u64, data: &[u8]) -> (PathBuf, Vec<u8>) {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.set_len(len).unwrap();
    if !data.is_empty() {
        file.seek(SeekFrom::Start(offset)).unwrap();
        file.write_all(data).unwrap();
    }
    drop(file);

    let mut logical = vec![0u8; len as usize];
    logical[offset as usize..offset as usize + data.len()].copy_from_slice(data);
    (path, logical)
}

fn assert_digest(path: &Path, logical: &[u8], cache: &CacheTable) {
    assert_eq!(
        hash_file(path, cache).unwrap(),
        blake3::hash(logical),
        "digest mismatch for {}",
        path.display()
    );
}

#[test]
fn empty_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "empty", b"");
    assert_digest(&path, b"", &CacheTable::unavailable());
}

#[test]
fn tiny_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "tiny", b"x");
    assert_digest(&path, b"x", &CacheTable::unavailable());
}

#[test]
fn dense_file_smaller_than_one_block() {
    let dir = TempDir::new().unwrap();
    let contents = patterned(BLOCK_LEN / 2 + 17);
    let path = write_file(&dir, "small", &contents);
    assert_digest(&path, &contents, &CacheTable::unavailable());
}

#[test]
fn dense_file_of_exactly_one_block() {
    let dir = TempDir::new().unwrap();
    let contents = patterned(BLOCK_LEN);
    let path = write_file(&dir, "oneblock", &contents);
    assert_digest(&path, &contents, &CacheTable::unavailable());
}

#[test]
fn dense_multi_block_file_with_tail() {
    let dir = TempDir::new().unwrap();
    let contents = patterned(3 * BLOCK_LEN + 12345);
    let path = write_file(&dir, "multi", &contents);
    assert_digest(&path, &contents, &CacheTable::unavailable());
}

#[test]
fn hashing_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let contents = patterned(2 * BLOCK_LEN + 7);
    let path = write_file(&dir, "again", &contents);
    let cache = CacheTable::unavailable();
    assert_eq!(hash_file(&path, &cache).unwrap(), hash_file(&path, &cache).unwrap());
}

#[test]
fn fully_sparse_single_block_with_table() {
    // A file of exactly one cache block, entirely sparse, hashed against a
    // table holding the record for index 0: must equal the digest of one
    // block of zeros.
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("b3z.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let (path, logical) = sparse_file(&dir, "allzero", BLOCK_LEN as u64, 0, b"");
    assert_digest(&path, &logical, &cache);
    assert_eq!(hash_file(&path, &cache).unwrap(), blake3::hash(&vec![0u8; BLOCK_LEN]));
}

#[test]
fn leading_hole_with_literal_tail() {
    // Hole over the first 8 blocks, real data in the last two: the shape of
    // a pre-allocated image with content at the end.
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("b3z.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let len = 10 * BLOCK_LEN as u64;
    let data = patterned(2 * BLOCK_LEN);
    let (path, logical) = sparse_file(&dir, "image", len, 8 * BLOCK_LEN as u64, &data);

    assert_digest(&path, &logical, &cache);
    // Cache on and cache off agree.
    assert_eq!(
        hash_file(&path, &cache).unwrap(),
        hash_file(&path, &CacheTable::unavailable()).unwrap()
    );
}

#[test]
fn fully_sparse_file_beyond_table_length() {
    // Only the first records exist in the table; later blocks miss and are
    // computed on the fly. The digest must not change.
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("short.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let len = (WAVE_BATCH as u64 + 8) * BLOCK_LEN as u64;
    let (path, _) = sparse_file(&dir, "long", len, 0, b"");

    let with_cache = hash_file(&path, &cache).unwrap();
    let without = hash_file(&path, &CacheTable::unavailable()).unwrap();
    assert_eq!(with_cache, without);
}

#[test]
fn misaligned_hole_never_corrupts_the_digest() {
    // Data at the very start pushes the hole off block alignment; a hole
    // tail shorter than a block must be read literally, not substituted.
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("b3z.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let len = 3 * BLOCK_LEN as u64 + BLOCK_LEN as u64 / 2;
    let head = patterned(1024);
    let (path, logical) = sparse_file(&dir, "askew", len, 0, &head);

    assert_digest(&path, &logical, &cache);
}

#[test]
fn hole_of_one_and_a_half_blocks() {
    // Hole covering [BLOCK_LEN, 2.5 * BLOCK_LEN): only the aligned middle
    // block may be substituted; the half-block tail is literal.
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("b3z.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let len = 4 * BLOCK_LEN as u64;
    let path = dir.path().join("gap.bin");
    let mut file = File::create(&path).unwrap();
    let head = patterned(BLOCK_LEN);
    let tail = patterned(BLOCK_LEN + BLOCK_LEN / 2);
    file.write_all(&head).unwrap();
    file.seek(SeekFrom::Start(len - tail.len() as u64)).unwrap();
    file.write_all(&tail).unwrap();
    drop(file);

    let mut logical = vec![0u8; len as usize];
    logical[..head.len()].copy_from_slice(&head);
    logical[len as usize - tail.len()..].copy_from_slice(&tail);

    assert_digest(&path, &logical, &cache);
    assert_eq!(
        hash_file(&path, &cache).unwrap(),
        hash_file(&path, &CacheTable::unavailable()).unwrap()
    );
}

#[test]
fn concurrent_hashers_share_one_table() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("b3z.cache");
    generate_table(&cache_path, WAVE_BATCH as u64, 1).unwrap();
    let cache = CacheTable::open(&cache_path);

    let (path, logical) = sparse_file(&dir, "shared", 4 * BLOCK_LEN as u64, 0, b"");
    let expected = blake3::hash(&logical);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(hash_file(&path, &cache).unwrap(), expected);
            });
        }
    });
}

#[test]
fn missing_file_reports_open_error() {
    let err = hash_file("/no/such/file", &CacheTable::unavailable()).unwrap_err();
    assert!(matches!(err, HashError::Open { .. }), "got {err:?}");
}
