//! IP2Location BIN header
//!
//! Fixed 29-byte header at the start of the file. Addresses stored in the
//! header are 1-based file positions.
//!
//! ```text
//! byte 1      database type (1..=25)
//! byte 2      column count
//! bytes 3-5   build date: year - 2000, month, day
//! bytes 6-9   IPv4 row count           (LE u32)
//! bytes 10-13 IPv4 table address
//! bytes 14-17 IPv6 row count
//! bytes 18-21 IPv6 table address
//! bytes 22-25 IPv4 index address, 0 when absent
//! bytes 26-29 IPv6 index address, 0 when absent
//! ```

use super::columns::{FieldLayout, MAX_DATABASE_TYPE};
use crate::classify::AddressFamily;
use crate::error::{GeoError, Result};
use crate::storage::{read_u32_le, slice_at};

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 29;

/// Decoded BIN header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinHeader {
    /// Layout selector (1..=25)
    pub database_type: u8,
    /// Columns per row, `ip_from` included
    pub column_count: u8,
    /// Build year, month, day
    pub build_date: (u16, u8, u8),
    /// IPv4 table
    pub ipv4: RangeTable,
    /// IPv6 table
    pub ipv6: RangeTable,
}

/// Location and shape of one address family's range table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTable {
    /// Number of ranges (the table has one extra closing row)
    pub row_count: u32,
    /// 1-based address of row 0
    pub base_address: u32,
    /// 1-based address of the prefix index, 0 when absent
    pub index_address: u32,
    /// Bytes per row
    pub row_size: u32,
    /// Width of the leading `ip_from` column
    pub key_width: u32,
}

impl RangeTable {
    /// True when the table has a prefix index
    pub fn has_index(&self) -> bool {
        self.index_address > 0
    }

    /// 1-based address of row `row`
    pub fn row_address(&self, row: u32) -> u64 {
        self.base_address as u64 + row as u64 * self.row_size as u64
    }
}

impl BinHeader {
    /// Parse and validate the header
    pub fn parse(data: &[u8]) -> Result<Self> {
        let head = slice_at(data, 0, HEADER_SIZE).map_err(|_| {
            GeoError::header(format!(
                "file of {} bytes is shorter than the {}-byte header",
                data.len(),
                HEADER_SIZE
            ))
        })?;

        let database_type = head[0];
        let column_count = head[1];
        if database_type == 0 || database_type > MAX_DATABASE_TYPE {
            return Err(GeoError::header(format!(
                "unsupported database type {}",
                database_type
            )));
        }
        let needed = FieldLayout::max_column(database_type);
        if column_count < needed {
            return Err(GeoError::header(format!(
                "database type {} needs {} columns, header declares {}",
                database_type, needed, column_count
            )));
        }

        let column_count_u32 = column_count as u32;
        let ipv4 = RangeTable {
            row_count: read_u32_le(head, 5)?,
            base_address: read_u32_le(head, 9)?,
            index_address: read_u32_le(head, 21)?,
            row_size: column_count_u32 << 2,
            key_width: 4,
        };
        let ipv6 = RangeTable {
            row_count: read_u32_le(head, 13)?,
            base_address: read_u32_le(head, 17)?,
            index_address: read_u32_le(head, 25)?,
            row_size: 16 + ((column_count_u32 - 1) << 2),
            key_width: 16,
        };

        for (name, table) in [("IPv4", &ipv4), ("IPv6", &ipv6)] {
            if table.row_count > 0 && table.base_address == 0 {
                return Err(GeoError::header(format!(
                    "{} table has {} rows but no base address",
                    name, table.row_count
                )));
            }
        }

        Ok(Self {
            database_type,
            column_count,
            build_date: (2000 + head[2] as u16, head[3], head[4]),
            ipv4,
            ipv6,
        })
    }

    /// Range table searched for keys of `family`
    pub fn table(&self, family: AddressFamily) -> &RangeTable {
        match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        }
    }
}
