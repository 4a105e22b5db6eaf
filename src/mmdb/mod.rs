//! MaxMind DB (MMDB) Reader
//!
//! The MMDB format uses a binary search tree for IP address lookups.
//! Leaves point into a data section encoded with the self-describing
//! format implemented in `crate::data_section`.
//!
//! ## Architecture
//!
//! - **types**: MMDB-specific types and constants
//! - **format**: metadata marker search and metadata decoding
//! - **tree**: search tree traversal for IP lookups
//! - **record**: GeoIP2 field extraction from decoded values
//! - **reader**: the lookup pipeline tying the above together

pub mod format;
pub mod reader;
pub mod record;
pub mod tree;
pub mod types;

pub use format::{find_metadata_marker, MmdbMetadata};
pub use reader::MmdbReader;
pub use record::MmdbRecord;
pub use tree::{LookupResult, SearchTree};
pub use types::{IpVersion, RecordSize, METADATA_MARKER};

// Use DataValue from data_section as our MMDB value type
pub use crate::data_section::DataValue as MmdbValue;
