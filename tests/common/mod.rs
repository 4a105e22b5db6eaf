// Fixture builders shared by the integration tests
//
// Both formats are small enough to assemble by hand: an MMDB image is a
// trie, a 16-byte separator, an encoded data section and a metadata map;
// a BIN image is a 29-byte header, optional prefix indexes, range rows and
// a string pool.

#![allow(dead_code)]

use geodb::data_section::DataEncoder;
use geodb::mmdb::METADATA_MARKER;
use geodb::DataValue;
use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `bytes` to `name` inside a fresh temporary directory
pub fn write_temp(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    (dir, path)
}

/// Build a `DataValue::Map` from string keys
pub fn map(entries: Vec<(&str, DataValue)>) -> DataValue {
    DataValue::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}

/// Shorthand for `DataValue::String`
pub fn text(s: &str) -> DataValue {
    DataValue::String(s.to_string())
}

/// `{"en": name}` names map
pub fn names(en: &str) -> DataValue {
    map(vec![("en", text(en))])
}

/// A typical City-style record
pub fn city_record(country: &str, country_name: &str, city: &str, lat: f64, lon: f64) -> DataValue {
    map(vec![
        (
            "continent",
            map(vec![("code", text("NA")), ("names", names("North America"))]),
        ),
        (
            "country",
            map(vec![("iso_code", text(country)), ("names", names(country_name))]),
        ),
        ("city", map(vec![("names", names(city))])),
        (
            "location",
            map(vec![
                ("latitude", DataValue::Double(lat)),
                ("longitude", DataValue::Double(lon)),
                ("time_zone", text("America/Chicago")),
                ("accuracy_radius", DataValue::Uint16(1000)),
            ]),
        ),
    ])
}

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Node(usize),
    Data(usize),
}

/// MaxMind DB image builder
pub struct MmdbFixture {
    ip_version: u16,
    record_size: u16,
    database_type: String,
    languages: Vec<String>,
    build_epoch: u64,
    entries: Vec<(IpAddr, u32, DataValue)>,
}

impl MmdbFixture {
    pub fn new(ip_version: u16, record_size: u16) -> Self {
        Self {
            ip_version,
            record_size,
            database_type: "GeoIP2-City".to_string(),
            languages: vec!["en".to_string()],
            build_epoch: 1_700_000_000,
            entries: Vec::new(),
        }
    }

    pub fn database_type(mut self, name: &str) -> Self {
        self.database_type = name.to_string();
        self
    }

    pub fn languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Map `network/prefix_len` to `value`; more specific networks must
    /// be inserted after the networks containing them
    pub fn insert(mut self, network: &str, prefix_len: u32, value: DataValue) -> Self {
        self.entries
            .push((network.parse().unwrap(), prefix_len, value));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut nodes: Vec<[Slot; 2]> = vec![[Slot::Empty, Slot::Empty]];
        let mut encoder = DataEncoder::new();
        let mut offsets = Vec::new();

        for (index, (network, prefix_len, value)) in self.entries.iter().enumerate() {
            offsets.push(encoder.encode(value) as usize);

            let (bits, bit_len, prefix) = match (network, self.ip_version) {
                (IpAddr::V4(v4), 4) => (u32::from(*v4) as u128, 32, *prefix_len),
                (IpAddr::V4(v4), _) => (u32::from(*v4) as u128, 128, prefix_len + 96),
                (IpAddr::V6(v6), _) => (u128::from(*v6), 128, *prefix_len),
            };
            insert_prefix(&mut nodes, bits, bit_len, prefix, index);
        }

        let node_count = nodes.len() as u32;
        let record_value = |slot: Slot| -> u32 {
            match slot {
                Slot::Empty => node_count,
                Slot::Node(n) => n as u32,
                Slot::Data(i) => node_count + 16 + offsets[i] as u32,
            }
        };

        let mut data = Vec::new();
        for [left, right] in &nodes {
            write_node(&mut data, self.record_size, record_value(*left), record_value(*right));
        }
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&encoder.into_bytes());

        data.extend_from_slice(METADATA_MARKER);
        let metadata = map(vec![
            ("node_count", DataValue::Uint32(node_count)),
            ("record_size", DataValue::Uint16(self.record_size)),
            ("ip_version", DataValue::Uint16(self.ip_version)),
            ("binary_format_major_version", DataValue::Uint16(2)),
            ("binary_format_minor_version", DataValue::Uint16(0)),
            ("build_epoch", DataValue::Uint64(self.build_epoch)),
            ("database_type", text(&self.database_type)),
            (
                "languages",
                DataValue::Array(self.languages.iter().map(|l| text(l)).collect()),
            ),
            ("description", map(vec![("en", text("geodb test fixture"))])),
        ]);
        let mut encoder = DataEncoder::new();
        encoder.encode(&metadata);
        data.extend_from_slice(&encoder.into_bytes());
        data
    }
}

fn insert_prefix(nodes: &mut Vec<[Slot; 2]>, bits: u128, bit_len: u32, prefix: u32, data: usize) {
    assert!(prefix >= 1 && prefix <= bit_len);
    let mut node = 0usize;
    for depth in 0..prefix {
        let side = ((bits >> (bit_len - 1 - depth)) & 1) as usize;
        if depth == prefix - 1 {
            nodes[node][side] = Slot::Data(data);
            return;
        }
        node = match nodes[node][side] {
            Slot::Node(next) => next,
            inherited => {
                // Split a leaf (or empty slot) into a node covering both halves
                nodes.push([inherited, inherited]);
                let next = nodes.len() - 1;
                nodes[node][side] = Slot::Node(next);
                next
            }
        };
    }
}

fn write_node(data: &mut Vec<u8>, record_size: u16, left: u32, right: u32) {
    match record_size {
        24 => {
            data.extend_from_slice(&left.to_be_bytes()[1..]);
            data.extend_from_slice(&right.to_be_bytes()[1..]);
        }
        28 => {
            data.extend_from_slice(&left.to_be_bytes()[1..]);
            data.push((((left >> 24) & 0x0F) << 4) as u8 | ((right >> 24) & 0x0F) as u8);
            data.extend_from_slice(&right.to_be_bytes()[1..]);
        }
        32 => {
            data.extend_from_slice(&left.to_be_bytes());
            data.extend_from_slice(&right.to_be_bytes());
        }
        other => panic!("unsupported record size {}", other),
    }
}

/// One column value of a BIN row
#[derive(Clone, Debug)]
pub enum Cell {
    /// Country column: pointer to the code with the name 3 bytes later
    Country(&'static str, &'static str),
    /// Pointer to a length-prefixed string
    Text(&'static str),
    /// Inline little-endian f32
    Float(f32),
}

/// IP2Location BIN image builder
pub struct BinFixture {
    database_type: u8,
    column_count: u8,
    indexed: bool,
    v4_rows: Vec<(u32, Vec<Cell>)>,
    v6_rows: Vec<(u128, Vec<Cell>)>,
}

impl BinFixture {
    /// Rows carry `column_count - 1` cells, in column order
    pub fn new(database_type: u8, column_count: u8) -> Self {
        Self {
            database_type,
            column_count,
            indexed: false,
            v4_rows: Vec::new(),
            v6_rows: Vec::new(),
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn v4_row(mut self, ip_from: &str, cells: Vec<Cell>) -> Self {
        let ip: std::net::Ipv4Addr = ip_from.parse().unwrap();
        self.v4_rows.push((u32::from(ip), cells));
        self
    }

    pub fn v6_row(mut self, ip_from: &str, cells: Vec<Cell>) -> Self {
        let ip: std::net::Ipv6Addr = ip_from.parse().unwrap();
        self.v6_rows.push((u128::from(ip), cells));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const HEADER: usize = 29;
        const INDEX_BYTES: usize = 65536 * 8;

        let data_columns = self.column_count as usize - 1;
        let v4_row_size = 4 + data_columns * 4;
        let v6_row_size = 16 + data_columns * 4;
        let index_bytes = if self.indexed { INDEX_BYTES } else { 0 };
        let v4_rows_len = if self.v4_rows.is_empty() { 0 } else { self.v4_rows.len() + 1 };
        let v6_rows_len = if self.v6_rows.is_empty() { 0 } else { self.v6_rows.len() + 1 };

        // 0-based positions
        let v4_index_at = HEADER;
        let v4_base = v4_index_at + index_bytes;
        let v6_index_at = v4_base + v4_rows_len * v4_row_size;
        let v6_base = v6_index_at + index_bytes;
        let strings_at = v6_base + v6_rows_len * v6_row_size;

        let mut pool = Vec::new();
        let mut encode_cells = |cells: &[Cell], out: &mut Vec<u8>| {
            assert_eq!(cells.len(), data_columns, "row must fill every column");
            for cell in cells {
                match cell {
                    Cell::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
                    Cell::Text(s) => {
                        out.extend_from_slice(&((strings_at + pool.len()) as u32).to_le_bytes());
                        pool.push(s.len() as u8);
                        pool.extend_from_slice(s.as_bytes());
                    }
                    Cell::Country(code, name) => {
                        assert_eq!(code.len(), 2);
                        out.extend_from_slice(&((strings_at + pool.len()) as u32).to_le_bytes());
                        pool.push(2);
                        pool.extend_from_slice(code.as_bytes());
                        pool.push(name.len() as u8);
                        pool.extend_from_slice(name.as_bytes());
                    }
                }
            }
        };

        let mut data = vec![self.database_type, self.column_count, 24, 6, 1];
        let one_based = |at: usize, present: bool| if present { at as u32 + 1 } else { 0 };
        let has_v4 = !self.v4_rows.is_empty();
        let has_v6 = !self.v6_rows.is_empty();
        for v in [
            self.v4_rows.len() as u32,
            one_based(v4_base, has_v4),
            self.v6_rows.len() as u32,
            one_based(v6_base, has_v6),
            one_based(v4_index_at, self.indexed && has_v4),
            one_based(v6_index_at, self.indexed && has_v6),
        ] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(data.len(), HEADER);

        if self.indexed {
            let starts: Vec<u128> = self.v4_rows.iter().map(|(s, _)| *s as u128).collect();
            data.extend_from_slice(&prefix_index(&starts, 16));
        }
        for (ip_from, cells) in &self.v4_rows {
            data.extend_from_slice(&ip_from.to_le_bytes());
            encode_cells(cells, &mut data);
        }
        if has_v4 {
            data.extend_from_slice(&u32::MAX.to_le_bytes());
            data.extend_from_slice(&vec![0u8; data_columns * 4]);
        }

        if self.indexed {
            let starts: Vec<u128> = self.v6_rows.iter().map(|(s, _)| *s).collect();
            data.extend_from_slice(&prefix_index(&starts, 112));
        }
        for (ip_from, cells) in &self.v6_rows {
            data.extend_from_slice(&ip_from.to_le_bytes());
            encode_cells(cells, &mut data);
        }
        if has_v6 {
            data.extend_from_slice(&u128::MAX.to_le_bytes());
            data.extend_from_slice(&vec![0u8; data_columns * 4]);
        }

        assert_eq!(data.len(), strings_at);
        data.extend_from_slice(&pool);
        data
    }
}

/// (first row, last row) for every 16-bit prefix of the key space
fn prefix_index(starts: &[u128], shift: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(65536 * 8);
    if starts.is_empty() {
        out.resize(65536 * 8, 0);
        return out;
    }
    let row_for = |value: u128| -> u32 {
        starts.iter().rposition(|&s| s <= value).unwrap_or(0) as u32
    };
    for prefix in 0u128..65536 {
        let first = prefix << shift;
        let last = first | ((1u128 << shift) - 1);
        out.extend_from_slice(&row_for(first).to_le_bytes());
        out.extend_from_slice(&row_for(last).to_le_bytes());
    }
    out
}
