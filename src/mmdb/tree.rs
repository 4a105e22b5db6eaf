//! MMDB Search Tree Traversal
//!
//! Implements binary search tree traversal for IP address lookups.
//! The tree uses a compact binary representation where each node contains
//! two records (left and right) that point to either:
//! - Another node (continue traversal)
//! - A data section offset (found)
//! - A "not found" marker (record == node_count)

use super::format::MmdbMetadata;
use super::types::{IpVersion, RecordSize, DATA_SECTION_SEPARATOR};
use crate::classify::{AddressFamily, AddressKey};
use crate::error::{GeoError, Result};
use crate::storage::slice_at;

/// Result of a tree walk that reached the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupResult {
    /// Offset into the data section (relative to the byte after the separator)
    pub data_offset: usize,
    /// Number of key bits consumed before the leaf (network prefix length)
    pub prefix_len: u8,
}

/// Search tree for IP address lookups
pub struct SearchTree<'a> {
    /// File bytes starting with the tree
    data: &'a [u8],
    node_count: u32,
    record_size: RecordSize,
    ip_version: IpVersion,
}

impl<'a> SearchTree<'a> {
    /// Create a search tree over the start of an MMDB image
    pub fn new(data: &'a [u8], metadata: &MmdbMetadata) -> Result<Self> {
        if data.len() < metadata.tree_size() {
            return Err(GeoError::corrupt(format!(
                "Search tree of {} bytes exceeds file size {}",
                metadata.tree_size(),
                data.len()
            )));
        }
        Ok(Self {
            data,
            node_count: metadata.node_count,
            record_size: metadata.record_size,
            ip_version: metadata.ip_version,
        })
    }

    /// Record reached from the root by following 96 zero bits
    ///
    /// This is where IPv4 keys start in an IPv6 tree. The value may already
    /// be terminal (>= node_count) when the tree stores no IPv4 space or maps
    /// all of it to one record. Callers compute this once per open database.
    pub fn ipv4_start_node(&self) -> Result<u32> {
        if self.ip_version == IpVersion::V4 {
            return Ok(0);
        }

        let mut node = 0u32;
        for _ in 0..96 {
            if node >= self.node_count {
                break;
            }
            node = self.read_record(node, 0)?;
        }
        Ok(node)
    }

    /// Walk the tree for `key`
    ///
    /// `ipv4_start` is the value returned by [`Self::ipv4_start_node`].
    /// Returns `Ok(None)` when the address has no data.
    pub fn lookup(&self, key: &AddressKey, ipv4_start: u32) -> Result<Option<LookupResult>> {
        let mut node = match (key.family, self.ip_version) {
            (AddressFamily::V4, IpVersion::V6) => ipv4_start,
            (AddressFamily::V6, IpVersion::V4) => return Ok(None),
            _ => 0,
        };

        let bit_count = key.family.bit_len();
        let mut depth = 0u32;
        while node < self.node_count && depth < bit_count {
            node = self.read_record(node, key.bit(depth))?;
            depth += 1;
        }

        if node <= self.node_count {
            // Either the explicit "no data" marker or the key ran out of bits
            return Ok(None);
        }

        Ok(Some(LookupResult {
            data_offset: self.calculate_data_offset(node)?,
            prefix_len: depth as u8,
        }))
    }

    /// Read a record from a node
    ///
    /// Each node contains two records. `side` determines which:
    /// - 0 = left record (for IP bit 0)
    /// - 1 = right record (for IP bit 1)
    fn read_record(&self, node: u32, side: u8) -> Result<u32> {
        if node >= self.node_count {
            return Err(GeoError::corrupt(format!(
                "Node index {} exceeds node count {}",
                node, self.node_count
            )));
        }

        let node_bytes = self.record_size.node_bytes();
        let b = slice_at(self.data, node as u64 * node_bytes as u64, node_bytes)?;

        let record = match (self.record_size, side) {
            (RecordSize::Bits24, 0) => be24(b[0], b[1], b[2]),
            (RecordSize::Bits24, _) => be24(b[3], b[4], b[5]),
            // Middle byte holds the high nibble of both records
            (RecordSize::Bits28, 0) => ((b[3] as u32 >> 4) << 24) | be24(b[0], b[1], b[2]),
            (RecordSize::Bits28, _) => ((b[3] as u32 & 0x0F) << 24) | be24(b[4], b[5], b[6]),
            (RecordSize::Bits32, 0) => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            (RecordSize::Bits32, _) => u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
        };
        Ok(record)
    }

    /// Calculate data section offset from record value
    ///
    /// Formula: data_offset = (record - node_count) - 16, where 16 is the
    /// separator between tree and data.
    fn calculate_data_offset(&self, record: u32) -> Result<usize> {
        let past_tree = (record - self.node_count) as usize;
        past_tree.checked_sub(DATA_SECTION_SEPARATOR).ok_or_else(|| {
            GeoError::corrupt(format!(
                "Record {} points into the data section separator (node_count = {})",
                record, self.node_count
            ))
        })
    }
}

#[inline]
fn be24(b0: u8, b1: u8, b2: u8) -> u32 {
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32
}
