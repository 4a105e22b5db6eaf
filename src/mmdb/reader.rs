//! MMDB lookup pipeline: metadata, tree walk, value decoding
//!
//! The reader holds only parsed metadata; the byte region is passed in on
//! every call so one region can back any number of concurrent lookups.

use super::format::MmdbMetadata;
use super::record::MmdbRecord;
use super::tree::{LookupResult, SearchTree};
use crate::classify::AddressKey;
use crate::data_section::{DataDecoder, DataValue};
use crate::error::{GeoError, Result};
use tracing::{debug, trace};

/// Opened Format-A database state
#[derive(Debug, Clone)]
pub struct MmdbReader {
    metadata: MmdbMetadata,
    ipv4_start: u32,
}

impl MmdbReader {
    /// Parse metadata and prepare the tree for lookups
    pub fn open(data: &[u8]) -> Result<Self> {
        let metadata = MmdbMetadata::from_file(data)?;
        let ipv4_start = SearchTree::new(data, &metadata)?.ipv4_start_node()?;

        debug!(
            database_type = %metadata.database_type,
            node_count = metadata.node_count,
            record_size = metadata.record_size.bits(),
            ip_version = metadata.ip_version.number(),
            "opened MaxMind DB"
        );

        Ok(Self {
            metadata,
            ipv4_start,
        })
    }

    /// Decoded metadata
    pub fn metadata(&self) -> &MmdbMetadata {
        &self.metadata
    }

    /// Walk the tree for `key` and return the leaf, if any
    pub fn find(&self, data: &[u8], key: &AddressKey) -> Result<Option<LookupResult>> {
        SearchTree::new(data, &self.metadata)?.lookup(key, self.ipv4_start)
    }

    /// Decoded value stored for `key`
    ///
    /// `Ok(None)` means the leaf held a value of a type the decoder skips.
    pub fn lookup_value(&self, data: &[u8], key: &AddressKey) -> Result<Option<DataValue>> {
        let hit = self
            .find(data, key)?
            .ok_or_else(|| GeoError::NotFound(key.to_ip().to_string()))?;

        trace!(
            data_offset = hit.data_offset,
            prefix_len = hit.prefix_len,
            "tree walk reached data"
        );

        let section = self.metadata.data_section(data)?;
        DataDecoder::new(section).decode(hit.data_offset)
    }

    /// Structured record for `key`, names in `language`
    pub fn lookup(&self, data: &[u8], key: &AddressKey, language: &str) -> Result<MmdbRecord> {
        Ok(match self.lookup_value(data, key)? {
            Some(value) => MmdbRecord::from_value(&value, language),
            None => MmdbRecord::default(),
        })
    }
}
