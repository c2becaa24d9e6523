//! Read-only cache table store
//!
//! The table file is a flat, header-less array of [`CacheRecord`]s mapped
//! into memory once and shared by every hasher for the rest of the
//! process. Opening never fails the caller: a missing, unreadable or
//! malformed file yields the unavailable table, on which every lookup
//! misses and hashing silently computes zero-block subtrees directly.

use crate::cache::record::{CacheRecord, RECORD_LEN};
use crate::domain::BlockIndex;
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Positionally-indexed store of precomputed zero-block records.
///
/// Immutable after open; [`lookup`](Self::lookup) is pure and safe to call
/// concurrently from any number of hashers. Dropping the table unmaps the
/// file.
#[derive(Debug)]
pub struct CacheTable {
    inner: Option<Inner>,
}

#[derive(Debug)]
struct Inner {
    // None for a zero-length (yet valid) table file.
    map: Option<Mmap>,
    records: u64,
}

impl CacheTable {
    /// Open a table file. On any failure the table is merely unavailable;
    /// a warning is logged and all lookups miss.
    pub fn open<P: AsRef<Path>>(path: P) -> CacheTable {
        let path = path.as_ref();
        match Self::try_open(path) {
            Ok(table) => {
                log::info!(
                    "cache table {}: {} zero-block records",
                    path.display(),
                    table.len()
                );
                table
            }
            Err(err) => {
                log::warn!(
                    "cache table {} unavailable ({err}); zero blocks will be compressed directly",
                    path.display()
                );
                CacheTable::unavailable()
            }
        }
    }

    fn try_open(path: &Path) -> io::Result<CacheTable> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len % RECORD_LEN as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("table length {len} is not a multiple of {RECORD_LEN}"),
            ));
        }
        let map = if len == 0 {
            None
        } else {
            // The mapping is read-only and the file, once generated, is
            // never rewritten in place; a caller that truncates it while
            // hashers are running is outside the contract.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(CacheTable {
            inner: Some(Inner {
                map,
                records: len / RECORD_LEN as u64,
            }),
        })
    }

    /// A table on which every lookup misses, for running with the cache
    /// disabled.
    pub fn unavailable() -> CacheTable {
        CacheTable { inner: None }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of records, 0 when unavailable.
    pub fn len(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.records)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the record at `index`. `None` beyond the table's length or
    /// when the table is unavailable; the caller computes the record
    /// directly in that case and the digest is identical either way.
    pub fn lookup(&self, index: BlockIndex) -> Option<CacheRecord> {
        let inner = self.inner.as_ref()?;
        if index.as_u64() >= inner.records {
            return None;
        }
        let map = inner.map.as_ref()?;
        let offset = index.as_u64() as usize * RECORD_LEN;
        let bytes: [u8; RECORD_LEN] = map[offset..offset + RECORD_LEN]
            .try_into()
            .expect("record slice has fixed length");
        Some(CacheRecord::from_bytes(bytes))
    }
}
