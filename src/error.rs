//! Error types for hashing and cache-table generation
//!
//! Cache unavailability is deliberately absent here: a missing or truncated
//! table and an out-of-range lookup are not errors, they degrade to direct
//! compression of the zero block and leave the digest unchanged.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors while hashing a single file. Fatal for that file only; shared
/// state (the cache table) is never affected.
#[derive(Debug, Error)]
pub enum HashError {
    /// Failed to open the file for reading
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// Failed to query the file's size
    #[error("failed to read metadata of {path}: {source}")]
    Metadata { path: PathBuf, source: io::Error },

    /// Read or seek failed mid-stream
    #[error("read failed at offset {offset} in {path}: {source}")]
    Read {
        path: PathBuf,
        offset: u64,
        source: io::Error,
    },

    /// A literal read returned 0 bytes before the expected file size was
    /// reached (the file shrank underneath us)
    #[error("unexpected end of file in {path} at offset {offset}, {expected} more bytes expected")]
    UnexpectedEof {
        path: PathBuf,
        offset: u64,
        expected: u64,
    },
}

/// Errors while generating a cache table
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Block count does not divide into whole waves; rejected before any
    /// output is created
    #[error("block count {blocks} is not divisible by the wave size {wave} (threads * batch)")]
    InvalidBlockCount { blocks: u64, wave: u64 },

    /// Worker count of zero
    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    /// Failed to build the worker pool
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Failed to create the output file
    #[error("failed to create {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    /// Failed to append a completed wave
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}
