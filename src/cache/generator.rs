//! Parallel cache-table generation
//!
//! Records are produced in waves of `threads * WAVE_BATCH` consecutive
//! indices. Within a wave each worker fills its own `WAVE_BATCH`-record
//! slice of a wave-local buffer, and the buffer is appended to the output
//! file only after the whole wave has completed. Determinism is therefore
//! structural: the output is byte-identical for any thread count that
//! divides the block count, regardless of scheduling. Peak memory is one
//! wave of records plus one zero buffer per worker.

use crate::cache::record::{CacheRecord, RECORD_LEN};
use crate::domain::BlockIndex;
use crate::error::GenerateError;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Records computed by one worker per wave.
pub const WAVE_BATCH: usize = 32;

/// Generate `blocks` zero-block records into a table file at `path`,
/// indices strictly increasing, using `threads` workers.
///
/// `blocks` must be divisible by `threads * WAVE_BATCH`; the configuration
/// is rejected before the output file is created, so a rejected run leaves
/// nothing on disk. An I/O failure mid-run aborts the whole generation.
pub fn generate_table<P: AsRef<Path>>(
    path: P,
    blocks: u64,
    threads: usize,
) -> Result<(), GenerateError> {
    let path = path.as_ref();

    if threads == 0 {
        return Err(GenerateError::InvalidThreadCount);
    }
    let wave = threads as u64 * WAVE_BATCH as u64;
    if blocks % wave != 0 {
        return Err(GenerateError::InvalidBlockCount { blocks, wave });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let file = File::create(path).map_err(|source| GenerateError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let mut wave_buf = vec![0u8; wave as usize * RECORD_LEN];
    for wave_base in (0..blocks).step_by(wave as usize) {
        pool.install(|| {
            wave_buf
                .par_chunks_mut(WAVE_BATCH * RECORD_LEN)
                .enumerate()
                .for_each(|(worker, slice)| {
                    let zeros = vec![0u8; crate::tree::BLOCK_LEN / 2];
                    let base = wave_base + (worker * WAVE_BATCH) as u64;
                    for (i, out) in slice.chunks_exact_mut(RECORD_LEN).enumerate() {
                        let index = BlockIndex::new(base + i as u64);
                        let record = CacheRecord::for_zero_block_with(&zeros, index);
                        out.copy_from_slice(&record.to_bytes());
                    }
                });
        });
        writer
            .write_all(&wave_buf)
            .map_err(|source| GenerateError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("generated records {wave_base}..{} of {blocks}", wave_base + wave);
    }

    writer.flush().map_err(|source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {blocks} records to {}", path.display());
    Ok(())
}
