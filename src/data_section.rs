//! Self-describing data section encoding and decoding
//!
//! Implements the MaxMind DB data type specification used both by the
//! record data section and by the metadata block of MMDB files.
//!
//! # Supported Types
//!
//! - **Pointer** (1): reference to another item, followed transparently
//! - **String** (2), **Double** (3), **Bytes** (4)
//! - **Uint16** (5), **Uint32** (6), **Map** (7)
//! - **Int32** (8), **Uint64** (9), **Uint128** (10), **Array** (11)
//! - **Bool** (14), **Float** (15)
//!
//! Any other type (data cache container, end marker, or tags this decoder
//! does not model) is skipped by consuming its payload and yields no value.
//!
//! # Format
//!
//! Control byte: type in the top 3 bits (0 = extended, real type is the
//! next byte + 7, so extended types start at 8), size/payload in the low 5 bits. Sizes 29..=31 are
//! followed by 1..=3 big-endian size bytes.
//!
//! See: https://maxmind.github.io/MaxMind-DB/

use crate::error::{GeoError, Result};
use std::collections::HashMap;

const TYPE_EXTENDED: u8 = 0;
const TYPE_POINTER: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_DOUBLE: u8 = 3;
const TYPE_BYTES: u8 = 4;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;
const TYPE_INT32: u8 = 8;
const TYPE_UINT64: u8 = 9;
const TYPE_UINT128: u8 = 10;
const TYPE_ARRAY: u8 = 11;
const TYPE_BOOL: u8 = 14;
const TYPE_FLOAT: u8 = 15;

/// Nesting limit for maps, arrays and pointer hops
const MAX_DEPTH: usize = 64;

/// Decoded value
///
/// Values are materialized per lookup and never outlive record
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// UTF-8 string
    String(String),
    /// IEEE 754 double precision float
    Double(f64),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Key-value map (string keys only)
    Map(HashMap<String, DataValue>),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(u128),
    /// Array of values
    Array(Vec<DataValue>),
    /// Boolean value
    Bool(bool),
    /// IEEE 754 single precision float
    Float(f32),
}

impl DataValue {
    /// Map lookup; `None` for missing keys and for non-map values
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        match self {
            DataValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Array element; `None` when out of range or not an array
    pub fn index(&self, idx: usize) -> Option<&DataValue> {
        match self {
            DataValue::Array(items) => items.get(idx),
            _ => None,
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any unsigned (or non-negative signed) integer that fits in u64
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            DataValue::Uint16(n) => Some(n as u64),
            DataValue::Uint32(n) => Some(n as u64),
            DataValue::Uint64(n) => Some(n),
            DataValue::Uint128(n) => u64::try_from(n).ok(),
            DataValue::Int32(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Double or float payload
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            DataValue::Double(d) => Some(d),
            DataValue::Float(f) => Some(f as f64),
            _ => None,
        }
    }
}

/// Data section decoder
///
/// Decodes values from an encoded data section. Pointer offsets are
/// relative to the start of `buffer`.
pub struct DataDecoder<'a> {
    buffer: &'a [u8],
}

impl<'a> DataDecoder<'a> {
    /// Create a decoder over a data section
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Decode the value at `offset`
    ///
    /// Returns `Ok(None)` when the value has a type this decoder skips.
    pub fn decode(&self, offset: usize) -> Result<Option<DataValue>> {
        let mut cursor = offset;
        self.decode_at(&mut cursor, 0)
    }

    fn decode_at(&self, cursor: &mut usize, depth: usize) -> Result<Option<DataValue>> {
        if depth > MAX_DEPTH {
            return Err(GeoError::corrupt("data section nesting too deep"));
        }

        let ctrl = self.byte(cursor)?;
        let mut type_id = ctrl >> 5;

        if type_id == TYPE_POINTER {
            let target = self.pointer_target(cursor, ctrl)?;
            return self.follow_pointer(target, depth);
        }

        if type_id == TYPE_EXTENDED {
            let ext = self.byte(cursor)?;
            if ext == 0 {
                return Err(GeoError::corrupt("extended type byte of 0"));
            }
            // Saturate so absurd extended bytes land in the "unknown" arm
            type_id = ext.saturating_add(7);
        }

        let size = self.decode_size(cursor, ctrl & 0x1F)?;

        let value = match type_id {
            TYPE_STRING => {
                let bytes = self.take(cursor, size)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| GeoError::corrupt("invalid UTF-8 in string"))?;
                DataValue::String(s.to_string())
            }
            TYPE_DOUBLE => {
                if size != 8 {
                    return Err(GeoError::corrupt(format!("invalid double size: {}", size)));
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(self.take(cursor, 8)?);
                DataValue::Double(f64::from_be_bytes(bytes))
            }
            TYPE_BYTES => DataValue::Bytes(self.take(cursor, size)?.to_vec()),
            TYPE_UINT16 => DataValue::Uint16(self.read_uint(cursor, size, 2)? as u16),
            TYPE_UINT32 => DataValue::Uint32(self.read_uint(cursor, size, 4)? as u32),
            TYPE_MAP => self.decode_map(cursor, size, depth)?,
            TYPE_INT32 => DataValue::Int32(self.read_uint(cursor, size, 4)? as u32 as i32),
            TYPE_UINT64 => DataValue::Uint64(self.read_uint(cursor, size, 8)? as u64),
            TYPE_UINT128 => DataValue::Uint128(self.read_uint(cursor, size, 16)?),
            TYPE_ARRAY => self.decode_array(cursor, size, depth)?,
            TYPE_BOOL => DataValue::Bool(size != 0),
            TYPE_FLOAT => {
                if size != 4 {
                    return Err(GeoError::corrupt(format!("invalid float size: {}", size)));
                }
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(self.take(cursor, 4)?);
                DataValue::Float(f32::from_be_bytes(bytes))
            }
            _ => {
                self.take(cursor, size)?;
                return Ok(None);
            }
        };

        Ok(Some(value))
    }

    fn follow_pointer(&self, target: usize, depth: usize) -> Result<Option<DataValue>> {
        // A pointer may not resolve to another pointer
        if let Some(&ctrl) = self.buffer.get(target) {
            if ctrl >> 5 == TYPE_POINTER {
                return Err(GeoError::corrupt(format!(
                    "pointer at {} resolves to another pointer",
                    target
                )));
            }
        }
        let mut target_cursor = target;
        self.decode_at(&mut target_cursor, depth + 1)
    }

    fn pointer_target(&self, cursor: &mut usize, ctrl: u8) -> Result<usize> {
        let size_bits = (ctrl >> 3) & 0x3;
        let high = (ctrl & 0x7) as usize;
        let target = match size_bits {
            0 => (high << 8) | self.be_uint(cursor, 1)? as usize,
            1 => 0x800 + ((high << 16) | self.be_uint(cursor, 2)? as usize),
            2 => 0x80800 + ((high << 24) | self.be_uint(cursor, 3)? as usize),
            _ => self.be_uint(cursor, 4)? as usize,
        };
        Ok(target)
    }

    fn decode_map(&self, cursor: &mut usize, count: usize, depth: usize) -> Result<DataValue> {
        let mut map = HashMap::with_capacity(count.min(64));

        for _ in 0..count {
            let key = match self.decode_at(cursor, depth + 1)? {
                Some(DataValue::String(s)) => s,
                _ => return Err(GeoError::corrupt("map key must be a string")),
            };

            if let Some(value) = self.decode_at(cursor, depth + 1)? {
                map.insert(key, value);
            }
        }

        Ok(DataValue::Map(map))
    }

    fn decode_array(&self, cursor: &mut usize, count: usize, depth: usize) -> Result<DataValue> {
        let mut items = Vec::with_capacity(count.min(64));

        for _ in 0..count {
            if let Some(value) = self.decode_at(cursor, depth + 1)? {
                items.push(value);
            }
        }

        Ok(DataValue::Array(items))
    }

    fn decode_size(&self, cursor: &mut usize, size_bits: u8) -> Result<usize> {
        let size = match size_bits {
            0..=28 => size_bits as usize,
            29 => 29 + self.be_uint(cursor, 1)? as usize,
            30 => 285 + self.be_uint(cursor, 2)? as usize,
            _ => 65_821 + self.be_uint(cursor, 3)? as usize,
        };
        Ok(size)
    }

    /// Unsigned integer whose byte width is given by the size field
    fn read_uint(&self, cursor: &mut usize, size: usize, max: usize) -> Result<u128> {
        if size > max {
            return Err(GeoError::corrupt(format!(
                "integer of {} bytes exceeds {}-byte type",
                size, max
            )));
        }
        self.be_uint(cursor, size)
    }

    fn be_uint(&self, cursor: &mut usize, width: usize) -> Result<u128> {
        Ok(self
            .take(cursor, width)?
            .iter()
            .fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    fn byte(&self, cursor: &mut usize) -> Result<u8> {
        Ok(self.take(cursor, 1)?[0])
    }

    fn take(&self, cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
        let end = cursor
            .checked_add(len)
            .filter(|&end| end <= self.buffer.len())
            .ok_or_else(|| {
                GeoError::corrupt(format!(
                    "data section read of {} bytes at {} out of bounds",
                    len, cursor
                ))
            })?;
        let bytes = &self.buffer[*cursor..end];
        *cursor = end;
        Ok(bytes)
    }
}

/// Data section encoder
///
/// Writes values in the same format the decoder reads. Repeated strings
/// are written once and referenced through pointers afterwards, the way
/// production MMDB writers deduplicate keys.
#[derive(Default)]
pub struct DataEncoder {
    buffer: Vec<u8>,
    strings: HashMap<String, u32>,
}

impl DataEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a value and return its offset in the data section
    pub fn encode(&mut self, value: &DataValue) -> u32 {
        let offset = self.buffer.len() as u32;
        self.encode_value(value);
        offset
    }

    /// Get the final encoded data section
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Current size of the data section
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    fn encode_value(&mut self, value: &DataValue) {
        match value {
            DataValue::String(s) => self.encode_string(s),
            DataValue::Double(d) => {
                self.buffer.push((TYPE_DOUBLE << 5) | 8);
                self.buffer.extend_from_slice(&d.to_be_bytes());
            }
            DataValue::Bytes(b) => {
                self.write_control(TYPE_BYTES, b.len());
                self.buffer.extend_from_slice(b);
            }
            DataValue::Uint16(n) => self.write_uint(TYPE_UINT16, *n as u128),
            DataValue::Uint32(n) => self.write_uint(TYPE_UINT32, *n as u128),
            DataValue::Map(m) => {
                self.write_control(TYPE_MAP, m.len());
                // Sorted keys keep the output deterministic
                let mut pairs: Vec<_> = m.iter().collect();
                pairs.sort_by_key(|(k, _)| *k);
                for (key, value) in pairs {
                    self.encode_string(key);
                    self.encode_value(value);
                }
            }
            DataValue::Int32(n) => self.write_uint(TYPE_INT32, *n as u32 as u128),
            DataValue::Uint64(n) => self.write_uint(TYPE_UINT64, *n as u128),
            DataValue::Uint128(n) => self.write_uint(TYPE_UINT128, *n),
            DataValue::Array(items) => {
                self.write_control(TYPE_ARRAY, items.len());
                for item in items {
                    self.encode_value(item);
                }
            }
            DataValue::Bool(b) => self.write_control(TYPE_BOOL, *b as usize),
            DataValue::Float(f) => {
                self.write_control(TYPE_FLOAT, 4);
                self.buffer.extend_from_slice(&f.to_be_bytes());
            }
        }
    }

    fn encode_string(&mut self, s: &str) {
        // Pointers cost 2-5 bytes; only worth it for longer strings
        if s.len() >= 4 {
            if let Some(&target) = self.strings.get(s) {
                self.write_pointer(target);
                return;
            }
            self.strings.insert(s.to_string(), self.buffer.len() as u32);
        }
        self.write_control(TYPE_STRING, s.len());
        self.buffer.extend_from_slice(s.as_bytes());
    }

    /// Write a pointer item referencing `target`
    pub fn write_pointer(&mut self, target: u32) {
        let ptr = TYPE_POINTER << 5;
        if target < 0x800 {
            self.buffer.push(ptr | ((target >> 8) as u8 & 0x7));
            self.buffer.push(target as u8);
        } else if target < 0x80800 {
            let v = target - 0x800;
            self.buffer.push(ptr | (1 << 3) | ((v >> 16) as u8 & 0x7));
            self.buffer.extend_from_slice(&(v as u16).to_be_bytes());
        } else if target < 0x8080800 {
            let v = target - 0x80800;
            self.buffer.push(ptr | (2 << 3) | ((v >> 24) as u8 & 0x7));
            self.buffer.extend_from_slice(&v.to_be_bytes()[1..]);
        } else {
            self.buffer.push(ptr | (3 << 3));
            self.buffer.extend_from_slice(&target.to_be_bytes());
        }
    }

    /// Minimal-width big-endian unsigned payload
    fn write_uint(&mut self, type_id: u8, n: u128) {
        let bytes = n.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        self.write_control(type_id, bytes.len() - skip);
        self.buffer.extend_from_slice(&bytes[skip..]);
    }

    fn write_control(&mut self, type_id: u8, size: usize) {
        let (type_bits, extended) = if type_id > 7 {
            (TYPE_EXTENDED, Some(type_id - 7))
        } else {
            (type_id << 5, None)
        };

        let (size_bits, size_bytes): (u8, Vec<u8>) = if size < 29 {
            (size as u8, Vec::new())
        } else if size < 285 {
            (29, vec![(size - 29) as u8])
        } else if size < 65_821 {
            (30, ((size - 285) as u16).to_be_bytes().to_vec())
        } else {
            (31, ((size - 65_821) as u32).to_be_bytes()[1..].to_vec())
        };

        self.buffer.push(type_bits | size_bits);
        if let Some(ext) = extended {
            self.buffer.push(ext);
        }
        self.buffer.extend_from_slice(&size_bytes);
    }
}
