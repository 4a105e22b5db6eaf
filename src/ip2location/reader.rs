//! Range-table search and row decoding for IP2Location BIN files
//!
//! Rows are sorted by `ip_from`; a row's `ip_to` is the next row's
//! `ip_from`, so the table carries one extra closing row. Text columns hold
//! a 32-bit pointer to a length-prefixed string elsewhere in the file.

use super::columns::{Column, FieldLayout};
use super::header::{BinHeader, RangeTable};
use super::record::Ip2LocationRecord;
use crate::classify::{AddressFamily, AddressKey};
use crate::error::{GeoError, Result};
use crate::fields::{FieldSet, GeoField};
use crate::storage::{read_f32_le, read_u128_le, read_u32_le, slice_at};
use tracing::{debug, trace, warn};

/// Offset from a country code string to the country name string
const COUNTRY_NAME_SKIP: u64 = 3;

/// Opened Format-B database state
#[derive(Debug, Clone)]
pub struct Ip2LocationReader {
    header: BinHeader,
    layout: FieldLayout,
}

impl Ip2LocationReader {
    /// Parse the header and derive the column layout
    pub fn open(data: &[u8]) -> Result<Self> {
        let header = BinHeader::parse(data)?;
        let layout = FieldLayout::for_type(header.database_type);

        debug!(
            database_type = header.database_type,
            columns = header.column_count,
            ipv4_rows = header.ipv4.row_count,
            ipv6_rows = header.ipv6.row_count,
            ipv4_index = header.ipv4.has_index(),
            ipv6_index = header.ipv6.has_index(),
            "opened IP2Location BIN"
        );

        Ok(Self { header, layout })
    }

    /// Parsed header
    pub fn header(&self) -> &BinHeader {
        &self.header
    }

    /// Column layout of this database type
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Decode every column for `key`
    pub fn lookup(&self, data: &[u8], key: &AddressKey) -> Result<Ip2LocationRecord> {
        self.lookup_fields(data, key, &FieldSet::all())
    }

    /// Decode only the columns feeding `fields`
    pub fn lookup_fields(
        &self,
        data: &[u8],
        key: &AddressKey,
        fields: &FieldSet,
    ) -> Result<Ip2LocationRecord> {
        let table = self.header.table(key.family);
        let row = self.find_row(data, table, key)?;
        Ok(self.decode_row(data, table.row_address(row) - 1 + table.key_width as u64, fields))
    }

    /// Binary search for the row whose range contains `key`
    ///
    /// Returns the row number.
    pub fn find_row(&self, data: &[u8], table: &RangeTable, key: &AddressKey) -> Result<u32> {
        if table.row_count == 0 {
            return Err(GeoError::NotFound(key.to_ip().to_string()));
        }

        let (mut low, mut high) = if table.has_index() {
            let entry = key.index_offset(table.index_address) - 1;
            (read_u32_le(data, entry)?, read_u32_le(data, entry + 4)?)
        } else {
            (0, table.row_count)
        };

        // The last range is closed at the top of the address space
        let mut target = key.value;
        if target >= key.family.max_value() {
            target -= 1;
        }

        trace!(low, high, "searching range table");

        while low <= high {
            let mid = ((low as u64 + high as u64) >> 1) as u32;
            let ip_from = read_range_key(data, table, key.family, mid)?;
            let ip_to = read_range_key(data, table, key.family, mid + 1)?;

            if target >= ip_from && target < ip_to {
                return Ok(mid);
            }

            if target < ip_from {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else {
                low = mid + 1;
            }
        }

        Err(GeoError::corrupt(format!(
            "no range in the {:?} table contains {}",
            key.family,
            key.to_ip()
        )))
    }

    /// Decode the requested columns of the row whose data starts at
    /// `fields_start` (0-based, just past `ip_from`)
    fn decode_row(&self, data: &[u8], fields_start: u64, fields: &FieldSet) -> Ip2LocationRecord {
        let cell = |column: Column| -> Option<u64> {
            if !fields.contains_any(column.fields()) {
                return None;
            }
            self.layout
                .offset(column)
                .map(|offset| fields_start + offset as u64)
        };
        let text = |column: Column| cell(column).and_then(|at| read_text_column(data, at, 0));

        let mut record = Ip2LocationRecord::default();

        if let Some(at) = cell(Column::Country) {
            if fields.contains(GeoField::CountryCode) {
                record.country_code = read_text_column(data, at, 0);
            }
            if fields.contains(GeoField::CountryName) {
                record.country_name = read_text_column(data, at, COUNTRY_NAME_SKIP);
            }
        }

        record.region = text(Column::Region);
        record.city = text(Column::City);
        record.isp = text(Column::Isp);
        record.latitude = cell(Column::Latitude).and_then(|at| read_float_column(data, at));
        record.longitude = cell(Column::Longitude).and_then(|at| read_float_column(data, at));
        record.domain = text(Column::Domain);
        record.zip_code = text(Column::ZipCode);
        record.time_zone = text(Column::TimeZone);
        record.net_speed = text(Column::NetSpeed);
        record.idd_code = text(Column::IddCode);
        record.area_code = text(Column::AreaCode);
        record.weather_station_code = text(Column::WeatherStationCode);
        record.weather_station_name = text(Column::WeatherStationName);
        record.mcc = text(Column::Mcc);
        record.mnc = text(Column::Mnc);
        record.mobile_brand = text(Column::MobileBrand);
        record.elevation = text(Column::Elevation).and_then(|s| s.trim().parse::<f32>().ok());
        record.usage_type = text(Column::UsageType);

        record
    }
}

fn read_range_key(data: &[u8], table: &RangeTable, family: AddressFamily, row: u32) -> Result<u128> {
    let at = table.row_address(row) - 1;
    match family {
        AddressFamily::V4 => read_u32_le(data, at).map(|v| v as u128),
        AddressFamily::V6 => read_u128_le(data, at),
    }
}

/// Follow the string pointer stored at `at`; a bad pointer gives `None`
fn read_text_column(data: &[u8], at: u64, skip: u64) -> Option<String> {
    let result = read_u32_le(data, at).and_then(|ptr| read_string(data, ptr as u64 + skip));
    match result {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(offset = at, error = %e, "unreadable text column");
            None
        }
    }
}

fn read_float_column(data: &[u8], at: u64) -> Option<f32> {
    match read_f32_le(data, at) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(offset = at, error = %e, "unreadable float column");
            None
        }
    }
}

/// Length-prefixed string at a 0-based offset
fn read_string(data: &[u8], at: u64) -> Result<String> {
    let len = slice_at(data, at, 1)?[0] as usize;
    let bytes = slice_at(data, at + 1, len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}
