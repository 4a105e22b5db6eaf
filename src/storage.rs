//! Immutable byte region backing an open database.
//!
//! The region is either memory-mapped or read fully into an owned buffer.
//! All accessors are positioned reads with bounds checking, so a single
//! region can serve concurrent lookups without a shared cursor.
//!
//! # Safety
//!
//! Memory-mapped files are inherently unsafe (file contents can change
//! underneath the map). The database is treated as immutable once opened;
//! replacing the file in place while it is mapped is not supported.

use crate::error::{GeoError, Result};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Storage for database data - either owned or memory-mapped
pub enum DatabaseStorage {
    /// Heap buffer (used for `from_bytes` and `in_memory` opens)
    Owned(Vec<u8>),
    /// Read-only memory map of the file
    Mmap(Mmap),
}

impl DatabaseStorage {
    /// Open a file and memory-map it
    pub fn map<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| GeoError::from_open(&display, e))?;
        if file.metadata()?.len() == 0 {
            // Mapping an empty file fails on some platforms
            return Ok(DatabaseStorage::Owned(Vec::new()));
        }
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| GeoError::NotReadable(format!("Failed to mmap {}: {}", display, e)))?;
        Ok(DatabaseStorage::Mmap(mmap))
    }

    /// Open a file and read it completely into memory
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let mut file = File::open(path).map_err(|e| GeoError::from_open(&display, e))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| GeoError::NotReadable(format!("{}: {}", display, e)))?;
        Ok(DatabaseStorage::Owned(buffer))
    }

    /// The whole region
    pub fn as_slice(&self) -> &[u8] {
        match self {
            DatabaseStorage::Owned(v) => v.as_slice(),
            DatabaseStorage::Mmap(m) => &m[..],
        }
    }

    /// Size of the region in bytes
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when the region holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DatabaseStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            DatabaseStorage::Owned(_) => "owned",
            DatabaseStorage::Mmap(_) => "mmap",
        };
        f.debug_struct("DatabaseStorage")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

/// Bounds-checked slice of `length` bytes at a 0-based `offset`.
pub fn slice_at(data: &[u8], offset: u64, length: usize) -> Result<&[u8]> {
    let start = usize::try_from(offset)
        .map_err(|_| GeoError::corrupt(format!("offset {} out of range", offset)))?;
    let end = start.checked_add(length).filter(|&end| end <= data.len());
    match end {
        Some(end) => Ok(&data[start..end]),
        None => Err(GeoError::corrupt(format!(
            "read of {} bytes at offset {} exceeds file size {}",
            length,
            offset,
            data.len()
        ))),
    }
}

/// Fixed-size array at a 0-based offset
pub fn array_at<const N: usize>(data: &[u8], offset: u64) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(slice_at(data, offset, N)?);
    Ok(bytes)
}

/// Little-endian u32 at a 0-based offset
pub fn read_u32_le(data: &[u8], offset: u64) -> Result<u32> {
    array_at::<4>(data, offset).map(u32::from_le_bytes)
}

/// Little-endian u128 at a 0-based offset
pub fn read_u128_le(data: &[u8], offset: u64) -> Result<u128> {
    array_at::<16>(data, offset).map(u128::from_le_bytes)
}

/// Little-endian IEEE-754 single at a 0-based offset
pub fn read_f32_le(data: &[u8], offset: u64) -> Result<f32> {
    array_at::<4>(data, offset).map(f32::from_le_bytes)
}
