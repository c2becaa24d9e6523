//! Precomputed zero-block cache: record format, generator, read-only store

pub mod generator;
pub mod record;
pub mod table;

pub use generator::{generate_table, WAVE_BATCH};
pub use record::{CacheRecord, RECORD_LEN};
pub use table::CacheTable;
