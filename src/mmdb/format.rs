//! MMDB Binary Format Parsing
//!
//! Locates the metadata block and decodes it into `MmdbMetadata`.
//!
//! Layout of a file:
//!
//! ```text
//! [search tree][16 zero bytes][data section][marker][metadata map]
//! ```
//!
//! The metadata map uses the same self-describing encoding as the data
//! section; its pointers are relative to the start of the metadata.

use super::types::{IpVersion, RecordSize, DATA_SECTION_SEPARATOR, METADATA_MARKER};
use crate::data_section::{DataDecoder, DataValue};
use crate::error::{GeoError, Result};
use memchr::memmem;
use std::collections::HashMap;

/// Trailing window searched for the metadata marker
pub const METADATA_SEARCH_WINDOW: usize = 128 * 1024;

/// Decoded MMDB metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MmdbMetadata {
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Record size in bits (24, 28, or 32)
    pub record_size: RecordSize,
    /// IP version (4 or 6)
    pub ip_version: IpVersion,
    /// `binary_format_major_version`
    pub format_major: u16,
    /// `binary_format_minor_version`
    pub format_minor: u16,
    /// Build time, seconds since the Unix epoch
    pub build_epoch: u64,
    /// Semantic database type (e.g. "GeoIP2-City")
    pub database_type: String,
    /// Locale tags present in `names` maps
    pub languages: Vec<String>,
    /// Human-readable descriptions keyed by language
    pub description: HashMap<String, String>,
    /// File offset of the metadata marker (end of the data section)
    pub marker_offset: usize,
}

impl MmdbMetadata {
    /// Find and decode the metadata of an MMDB image
    pub fn from_file(data: &[u8]) -> Result<Self> {
        let marker_offset = find_metadata_marker(data)?;
        let metadata_bytes = &data[marker_offset + METADATA_MARKER.len()..];

        let value = DataDecoder::new(metadata_bytes)
            .decode(0)
            .map_err(|e| GeoError::header(format!("Failed to decode metadata: {}", e)))?;

        let map = match value {
            Some(DataValue::Map(map)) => map,
            _ => return Err(GeoError::header("Metadata is not a map")),
        };

        let node_count = extract_uint(&map, "node_count")?;
        let node_count = u32::try_from(node_count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| GeoError::header(format!("Invalid node count: {}", node_count)))?;

        let metadata = MmdbMetadata {
            node_count,
            record_size: RecordSize::from_bits(extract_uint(&map, "record_size")?)?,
            ip_version: IpVersion::from_number(extract_uint(&map, "ip_version")?)?,
            format_major: to_u16(
                extract_uint(&map, "binary_format_major_version")?,
                "binary_format_major_version",
            )?,
            format_minor: to_u16(
                optional_uint(&map, "binary_format_minor_version"),
                "binary_format_minor_version",
            )?,
            build_epoch: optional_uint(&map, "build_epoch"),
            database_type: map
                .get("database_type")
                .and_then(DataValue::as_str)
                .unwrap_or_default()
                .to_string(),
            languages: extract_languages(&map),
            description: extract_description(&map),
            marker_offset,
        };

        let tree_end = metadata.data_section_start() + DATA_SECTION_SEPARATOR;
        if tree_end > marker_offset {
            return Err(GeoError::header(format!(
                "Search tree of {} bytes overlaps metadata at {}",
                metadata.tree_size(),
                marker_offset
            )));
        }

        Ok(metadata)
    }

    /// Size of the search tree in bytes
    pub fn tree_size(&self) -> usize {
        self.node_count as usize * self.record_size.node_bytes()
    }

    /// Offset a leaf record is resolved against: the trie byte size
    pub fn data_section_start(&self) -> usize {
        self.tree_size()
    }

    /// The data section proper, after the 16-byte separator
    ///
    /// Pointers and decoded leaf offsets are relative to its first byte.
    pub fn data_section<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.data_section_start() + DATA_SECTION_SEPARATOR..self.marker_offset)
            .ok_or_else(|| GeoError::corrupt("data section out of bounds"))
    }
}

/// Find the metadata marker in an MMDB image
///
/// The marker appears somewhere in the last 128KB of the file, and the
/// metadata comes after it. If there are multiple markers the last one
/// wins, as in libmaxminddb.
pub fn find_metadata_marker(data: &[u8]) -> Result<usize> {
    let search_start = data.len().saturating_sub(METADATA_SEARCH_WINDOW);
    memmem::rfind(&data[search_start..], METADATA_MARKER)
        .map(|pos| search_start + pos)
        .ok_or(GeoError::MetadataNotFound)
}

fn extract_uint(map: &HashMap<String, DataValue>, key: &str) -> Result<u64> {
    match map.get(key) {
        Some(value) => value.as_u64().ok_or_else(|| {
            GeoError::header(format!("Field '{}' is not an unsigned integer", key))
        }),
        None => Err(GeoError::header(format!(
            "Required field '{}' not found",
            key
        ))),
    }
}

fn optional_uint(map: &HashMap<String, DataValue>, key: &str) -> u64 {
    map.get(key).and_then(DataValue::as_u64).unwrap_or(0)
}

fn to_u16(value: u64, key: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| GeoError::header(format!("Field '{}' out of range: {}", key, value)))
}

fn extract_languages(map: &HashMap<String, DataValue>) -> Vec<String> {
    match map.get("languages") {
        Some(DataValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn extract_description(map: &HashMap<String, DataValue>) -> HashMap<String, String> {
    match map.get("description") {
        Some(DataValue::Map(desc)) => desc
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        _ => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_section::DataEncoder;

    fn metadata_map(node_count: u32, record_size: u16, ip_version: u16) -> DataValue {
        let mut map = HashMap::new();
        map.insert("node_count".to_string(), DataValue::Uint32(node_count));
        map.insert("record_size".to_string(), DataValue::Uint16(record_size));
        map.insert("ip_version".to_string(), DataValue::Uint16(ip_version));
        map.insert("binary_format_major_version".to_string(), DataValue::Uint16(2));
        map.insert("binary_format_minor_version".to_string(), DataValue::Uint16(0));
        map.insert("build_epoch".to_string(), DataValue::Uint64(1_700_000_000));
        map.insert(
            "database_type".to_string(),
            DataValue::String("Test-City".to_string()),
        );
        map.insert(
            "languages".to_string(),
            DataValue::Array(vec![
                DataValue::String("en".to_string()),
                DataValue::String("de".to_string()),
            ]),
        );
        DataValue::Map(map)
    }

    fn image_with_metadata(tree_bytes: usize, metadata: &DataValue) -> Vec<u8> {
        let mut data = vec![0u8; tree_bytes + DATA_SECTION_SEPARATOR];
        data.extend_from_slice(METADATA_MARKER);
        let mut encoder = DataEncoder::new();
        encoder.encode(metadata);
        data.extend_from_slice(&encoder.into_bytes());
        data
    }

    #[test]
    fn test_parse_metadata() {
        let data = image_with_metadata(6, &metadata_map(1, 24, 4));
        let metadata = MmdbMetadata::from_file(&data).unwrap();
        assert_eq!(metadata.node_count, 1);
        assert_eq!(metadata.record_size, RecordSize::Bits24);
        assert_eq!(metadata.ip_version, IpVersion::V4);
        assert_eq!(metadata.tree_size(), 6);
        assert_eq!(metadata.data_section_start(), 6);
        assert_eq!(metadata.database_type, "Test-City");
        assert_eq!(metadata.languages, vec!["en", "de"]);
        assert_eq!(metadata.build_epoch, 1_700_000_000);
        assert_eq!(metadata.format_major, 2);
        assert_eq!(metadata.marker_offset, 6 + DATA_SECTION_SEPARATOR);
        assert!(metadata.data_section(&data).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_size() {
        let data = image_with_metadata(6, &metadata_map(1, 26, 4));
        assert!(matches!(
            MmdbMetadata::from_file(&data),
            Err(GeoError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_zero_node_count() {
        let data = image_with_metadata(6, &metadata_map(0, 24, 4));
        assert!(matches!(
            MmdbMetadata::from_file(&data),
            Err(GeoError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_tree_larger_than_file() {
        let data = image_with_metadata(6, &metadata_map(1000, 32, 6));
        assert!(matches!(
            MmdbMetadata::from_file(&data),
            Err(GeoError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let mut map = HashMap::new();
        map.insert("node_count".to_string(), DataValue::Uint32(1));
        let data = image_with_metadata(6, &DataValue::Map(map));
        match MmdbMetadata::from_file(&data) {
            Err(GeoError::InvalidHeader(msg)) => assert!(msg.contains("record_size")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_format_version_out_of_range() {
        let mut metadata = metadata_map(1, 24, 4);
        if let DataValue::Map(map) = &mut metadata {
            map.insert(
                "binary_format_major_version".to_string(),
                DataValue::Uint32(0x1_0002),
            );
        }
        let data = image_with_metadata(6, &metadata);
        match MmdbMetadata::from_file(&data) {
            Err(GeoError::InvalidHeader(msg)) => {
                assert!(msg.contains("binary_format_major_version"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_metadata_not_a_map() {
        let data = image_with_metadata(0, &DataValue::Uint32(7));
        assert!(matches!(
            MmdbMetadata::from_file(&data),
            Err(GeoError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_metadata_not_found() {
        let data = b"not a valid mmdb file";
        assert_eq!(find_metadata_marker(data), Err(GeoError::MetadataNotFound));
        assert_eq!(find_metadata_marker(&[]), Err(GeoError::MetadataNotFound));
    }

    #[test]
    fn test_last_marker_wins() {
        let mut data = Vec::new();
        data.extend_from_slice(METADATA_MARKER);
        data.extend_from_slice(b"padding");
        data.extend_from_slice(METADATA_MARKER);
        assert_eq!(
            find_metadata_marker(&data).unwrap(),
            METADATA_MARKER.len() + 7
        );
    }

    #[test]
    fn test_marker_outside_window_is_ignored() {
        let mut data = Vec::new();
        data.extend_from_slice(METADATA_MARKER);
        data.resize(METADATA_SEARCH_WINDOW + 100, 0);
        assert_eq!(find_metadata_marker(&data), Err(GeoError::MetadataNotFound));
    }
}
