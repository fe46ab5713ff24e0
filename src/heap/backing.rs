//! Pool storage backends: anonymous memory by default, falling back to a
//! file-backed `memmap2` mapping under the `HEAP_SWAP` directory when the
//! anonymous allocation fails (grounded on `heap_mmap`'s fallback path in
//! `original_source/core/heap.c`).

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use memmap2::MmapMut;

use crate::common::error::{RayError, RayResult};

/// Backing storage for one pool's raw bytes.
pub enum PoolBacking {
    Anon(Vec<u8>),
    Swap { _file: std::fs::File, map: MmapMut },
}

impl PoolBacking {
    /// Allocate `size` bytes, trying anonymous memory first and falling back
    /// to a file-backed mapping under `HEAP_SWAP` (if set) on failure.
    pub fn allocate(size: usize) -> RayResult<Self> {
        match Self::try_anon(size) {
            Ok(b) => Ok(b),
            Err(_) => Self::try_swap(size),
        }
    }

    fn try_anon(size: usize) -> io::Result<Self> {
        let mut v = Vec::new();
        v.try_reserve_exact(size)?;
        v.resize(size, 0u8);
        Ok(PoolBacking::Anon(v))
    }

    fn try_swap(size: usize) -> RayResult<Self> {
        let dir = std::env::var("HEAP_SWAP")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let path = dir.join(format!("rayforce-heap-{}.swap", uuid::Uuid::new_v4()));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| RayError::Os {
                errno: e.raw_os_error().unwrap_or(-1),
            })?;
        file.set_len(size as u64).map_err(|e| RayError::Os {
            errno: e.raw_os_error().unwrap_or(-1),
        })?;
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| RayError::Os {
            errno: e.raw_os_error().unwrap_or(-1),
        })?;
        let _ = std::fs::remove_file(&path);
        Ok(PoolBacking::Swap { _file: file, map })
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            PoolBacking::Anon(v) => v.as_slice(),
            PoolBacking::Swap { map, .. } => map.as_ref(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            PoolBacking::Anon(v) => v.as_mut_slice(),
            PoolBacking::Swap { map, .. } => map.as_mut(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }
}
