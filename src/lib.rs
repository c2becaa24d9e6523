//! Sparse-aware BLAKE3 file checksums
//!
//! Hashing a mostly-empty file (disk image, pre-allocated container) spends
//! nearly all of its time compressing zero bytes. This crate asks the
//! filesystem where the holes are ([`sparse`]), and for every cache block
//! that lies wholly inside a hole substitutes a precomputed subtree record
//! ([`cache`]) instead of reading and compressing 2 MiB of zeros
//! ([`hasher`]). The substitution is a pure optimization: the digest is
//! always the plain BLAKE3 hash of the file's logical contents.
//!
//! The record table is generated once, offline, by [`cache::generate_table`]
//! (the `b3zgen` binary); hashing works with or without it, computing
//! missing records on the fly.

pub mod cache;
pub mod domain;
pub mod error;
pub mod hasher;
pub mod sparse;
pub mod tree;

pub use cache::{generate_table, CacheRecord, CacheTable, RECORD_LEN, WAVE_BATCH};
pub use domain::BlockIndex;
pub use error::{GenerateError, HashError};
pub use hasher::hash_file;
pub use sparse::{HoleRange, SparseMap};
pub use tree::{BLOCK_CHUNKS, BLOCK_LEN, CHUNK_LEN};
