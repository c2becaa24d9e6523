//! Sparse-region detection
//!
//! Builds a per-file [`SparseMap`]: the ordered set of byte ranges the
//! filesystem guarantees to read as zero without backing storage. The map
//! is advisory; a range the detector misses is simply read and hashed
//! literally, and detection failure of any kind degrades to the empty map
//! rather than failing the hash.
//!
//! Two detection algorithms exist, both pure and driven through injectable
//! backends so they can be tested without a filesystem that supports holes:
//!
//! - seek-based (`SEEK_HOLE`/`SEEK_DATA`), used on unix;
//! - allocated-ranges (`FSCTL_QUERY_ALLOCATED_RANGES`), used on windows,
//!   where every gap between allocated extents is a hole.

use std::io;
use std::path::Path;

/// A single hole: bytes `[start, end)` read as zero and are not backed by
/// physical storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoleRange {
    pub start: u64,
    pub end: u64,
}

impl HoleRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start < end);
        HoleRange { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Ordered, disjoint hole ranges of one file. Built once, immutable,
/// discarded after the file is hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMap {
    ranges: Vec<HoleRange>,
}

impl SparseMap {
    /// The map of a file with no detectable holes (also the degraded result
    /// when detection is unsupported or fails).
    pub fn empty() -> Self {
        SparseMap { ranges: Vec::new() }
    }

    /// Build from ranges that are already strictly increasing and disjoint.
    pub fn from_ranges(ranges: Vec<HoleRange>) -> Self {
        debug_assert!(
            ranges.windows(2).all(|w| w[0].end <= w[1].start),
            "hole ranges must be ordered and disjoint"
        );
        SparseMap { ranges }
    }

    pub fn ranges(&self) -> &[HoleRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Probe the platform for the file's holes. Never fails: filesystems
    /// without hole queries, permission problems and probe races all
    /// degrade to the empty map, which only costs literal reads.
    pub fn probe(path: &Path, size: u64) -> SparseMap {
        if size == 0 {
            return SparseMap::empty();
        }
        match imp::probe(path, size) {
            Ok(map) => map,
            Err(err) => {
                log::debug!(
                    "sparse probe of {} failed ({err}); falling back to literal reads",
                    path.display()
                );
                SparseMap::empty()
            }
        }
    }
}

/// Backend for the seek-based detection algorithm. Mirrors the
/// `SEEK_HOLE`/`SEEK_DATA` contract: implementations report positions at or
/// after the queried one, with `None` standing in for `ENXIO` (nothing
/// further before EOF).
pub trait SeekBackend {
    /// Position of the next hole at or after `pos`, if any.
    fn next_hole(&mut self, pos: u64) -> io::Result<Option<u64>>;

    /// Position of the next data at or after `pos`, if any.
    fn next_data(&mut self, pos: u64) -> io::Result<Option<u64>>;
}

/// Seek-based detection: alternate hole and data queries until EOF.
///
/// A hole with no data after it extends to EOF and is recorded as
/// `[hole, size)`, so a fully sparse file maps to the single range
/// `[0, size)`.
pub fn map_from_seek<B: SeekBackend>(backend: &mut B, size: u64) -> io::Result<SparseMap> {
    let mut ranges = Vec::new();
    let mut pos = 0u64;
    while pos < size {
        let hole = match backend.next_hole(pos)? {
            Some(hole) if hole < size => hole,
            // Filesystems report a virtual hole at EOF; that one carries no
            // bytes and is not a range.
            _ => break,
        };
        match backend.next_data(hole)? {
            Some(data) => {
                // A data position at or before the hole start would loop
                // forever; treat it as a probe inconsistency and stop.
                if data <= hole {
                    break;
                }
                ranges.push(HoleRange::new(hole, data.min(size)));
                pos = data;
            }
            None => {
                ranges.push(HoleRange::new(hole, size));
                break;
            }
        }
    }
    Ok(SparseMap::from_ranges(ranges))
}

/// Allocated-ranges detection: the holes are the complement of the
/// allocated extents within `[0, size)`. `allocated` must be ordered by
/// offset, as the allocated-ranges query returns it.
pub fn map_from_allocated(allocated: &[(u64, u64)], size: u64) -> SparseMap {
    let mut ranges = Vec::new();
    let mut pos = 0u64;
    for &(offset, len) in allocated {
        if offset > pos {
            ranges.push(HoleRange::new(pos, offset.min(size)));
        }
        pos = pos.max(offset.saturating_add(len));
        if pos >= size {
            break;
        }
    }
    if pos < size {
        ranges.push(HoleRange::new(pos, size));
    }
    SparseMap::from_ranges(ranges)
}

#[cfg(unix)]
mod imp {
    use super::{map_from_seek, SeekBackend, SparseMap};
    use std::fs::File;
    use std::io;
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::path::Path;

    struct LseekBackend {
        fd: RawFd,
    }

    impl LseekBackend {
        fn seek(&mut self, pos: u64, whence: libc::c_int) -> io::Result<Option<u64>> {
            let offset = libc::off_t::try_from(pos)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds off_t"))?;
            match unsafe { libc::lseek(self.fd, offset, whence) } {
                -1 => {
                    let err = io::Error::last_os_error();
                    // ENXIO: no hole/data at or after pos.
                    if err.raw_os_error() == Some(libc::ENXIO) {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                }
                found => Ok(Some(found as u64)),
            }
        }
    }

    impl SeekBackend for LseekBackend {
        fn next_hole(&mut self, pos: u64) -> io::Result<Option<u64>> {
            self.seek(pos, libc::SEEK_HOLE)
        }

        fn next_data(&mut self, pos: u64) -> io::Result<Option<u64>> {
            self.seek(pos, libc::SEEK_DATA)
        }
    }

    pub fn probe(path: &Path, size: u64) -> io::Result<SparseMap> {
        let file = File::open(path)?;
        let mut backend = LseekBackend {
            fd: file.as_raw_fd(),
        };
        map_from_seek(&mut backend, size)
    }
}

#[cfg(windows)]
mod imp {
    use super::{map_from_allocated, SparseMap};
    use std::fs::File;
    use std::io;
    use std::os::windows::io::AsRawHandle;
    use std::path::Path;
    use windows_sys::Win32::Foundation::{ERROR_MORE_DATA, FALSE};
    use windows_sys::Win32::System::Ioctl::{
        FILE_ALLOCATED_RANGE_BUFFER, FSCTL_QUERY_ALLOCATED_RANGES,
    };
    use windows_sys::Win32::System::IO::DeviceIoControl;

    const RANGES_PER_CALL: usize = 512;

    pub fn probe(path: &Path, size: u64) -> io::Result<SparseMap> {
        let file = File::open(path)?;
        let handle = file.as_raw_handle();

        let mut allocated: Vec<(u64, u64)> = Vec::new();
        let mut query_start = 0u64;

        // The query is issued repeatedly: a full output buffer comes back
        // as ERROR_MORE_DATA and the next call resumes after the last
        // extent returned.
        loop {
            let input = FILE_ALLOCATED_RANGE_BUFFER {
                FileOffset: query_start as i64,
                Length: (size - query_start) as i64,
            };
            let mut output = [FILE_ALLOCATED_RANGE_BUFFER {
                FileOffset: 0,
                Length: 0,
            }; RANGES_PER_CALL];
            let mut returned: u32 = 0;

            let ok = unsafe {
                DeviceIoControl(
                    handle as _,
                    FSCTL_QUERY_ALLOCATED_RANGES,
                    (&input as *const FILE_ALLOCATED_RANGE_BUFFER).cast(),
                    std::mem::size_of::<FILE_ALLOCATED_RANGE_BUFFER>() as u32,
                    output.as_mut_ptr().cast(),
                    std::mem::size_of_val(&output) as u32,
                    &mut returned,
                    std::ptr::null_mut(),
                )
            };
            let err = io::Error::last_os_error();
            let more = ok == FALSE && err.raw_os_error() == Some(ERROR_MORE_DATA as i32);
            if ok == FALSE && !more {
                return Err(err);
            }

            let count = returned as usize / std::mem::size_of::<FILE_ALLOCATED_RANGE_BUFFER>();
            for range in &output[..count] {
                allocated.push((range.FileOffset as u64, range.Length as u64));
            }

            match (more, allocated.last()) {
                (true, Some(&(offset, len))) => query_start = offset + len,
                _ => break,
            }
        }

        Ok(map_from_allocated(&allocated, size))
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use super::SparseMap;
    use std::io;
    use std::path::Path;

    // No hole query on this platform; every file hashes via literal reads.
    pub fn probe(_path: &Path, _size: u64) -> io::Result<SparseMap> {
        Ok(SparseMap::empty())
    }
}
