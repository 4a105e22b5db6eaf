//! Per-type column layout of IP2Location BIN rows
//!
//! Each table maps a database type (index 1..=25) to the 1-based column
//! holding that attribute, or 0 when the type does not carry it. Column 1
//! is always the range start (`ip_from`).

use crate::fields::{FieldSet, GeoField};

/// Highest database type with a known layout
pub const MAX_DATABASE_TYPE: u8 = 25;

const COUNTRY: [u8; 26] = [0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];
const REGION: [u8; 26] = [0, 0, 0, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3];
const CITY: [u8; 26] = [0, 0, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4];
const ISP: [u8; 26] = [0, 0, 3, 0, 5, 0, 7, 5, 7, 0, 8, 0, 9, 0, 9, 0, 9, 0, 9, 7, 9, 0, 9, 7, 9, 9];
const LATITUDE: [u8; 26] = [0, 0, 0, 0, 0, 5, 5, 0, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5];
const LONGITUDE: [u8; 26] = [0, 0, 0, 0, 0, 6, 6, 0, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6];
const DOMAIN: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 9, 0, 10, 0, 10, 0, 10, 0, 10, 8, 10, 0, 10, 8, 10, 10];
const ZIPCODE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 7, 7, 7, 0, 7, 7, 7, 0, 7, 0, 7, 7, 7, 0, 7, 7];
const TIMEZONE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 8, 7, 8, 8, 8, 7, 8, 0, 8, 8, 8, 0, 8, 8];
const NETSPEED: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 11, 0, 11, 8, 11, 0, 11, 0, 11, 0, 11, 11];
const IDDCODE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9, 12, 0, 12, 0, 12, 9, 12, 0, 12, 12];
const AREACODE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 13, 0, 13, 0, 13, 10, 13, 0, 13, 13];
const WEATHER_CODE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9, 14, 0, 14, 0, 14, 0, 14, 14];
const WEATHER_NAME: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 15, 0, 15, 0, 15, 0, 15, 15];
const MCC: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9, 16, 0, 16, 9, 16, 16];
const MNC: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 17, 0, 17, 10, 17, 17];
const MOBILE_BRAND: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 18, 0, 18, 11, 18, 18];
const ELEVATION: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 19, 0, 19, 19];
const USAGE_TYPE: [u8; 26] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 12, 20, 20];

/// A data column of a BIN row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Pointer to the country code; the name follows 3 bytes later
    Country,
    /// Region name
    Region,
    /// City name
    City,
    /// ISP name
    Isp,
    /// f32 latitude
    Latitude,
    /// f32 longitude
    Longitude,
    /// Domain name
    Domain,
    /// ZIP code
    ZipCode,
    /// UTC offset
    TimeZone,
    /// Net speed
    NetSpeed,
    /// IDD code
    IddCode,
    /// Area code
    AreaCode,
    /// Weather station code
    WeatherStationCode,
    /// Weather station name
    WeatherStationName,
    /// Mobile country code
    Mcc,
    /// Mobile network code
    Mnc,
    /// Mobile brand
    MobileBrand,
    /// Elevation, stored as text
    Elevation,
    /// Usage type
    UsageType,
}

impl Column {
    /// Every column, in table order
    pub const ALL: [Column; 19] = [
        Column::Country,
        Column::Region,
        Column::City,
        Column::Isp,
        Column::Latitude,
        Column::Longitude,
        Column::Domain,
        Column::ZipCode,
        Column::TimeZone,
        Column::NetSpeed,
        Column::IddCode,
        Column::AreaCode,
        Column::WeatherStationCode,
        Column::WeatherStationName,
        Column::Mcc,
        Column::Mnc,
        Column::MobileBrand,
        Column::Elevation,
        Column::UsageType,
    ];

    fn positions(self) -> &'static [u8; 26] {
        match self {
            Column::Country => &COUNTRY,
            Column::Region => &REGION,
            Column::City => &CITY,
            Column::Isp => &ISP,
            Column::Latitude => &LATITUDE,
            Column::Longitude => &LONGITUDE,
            Column::Domain => &DOMAIN,
            Column::ZipCode => &ZIPCODE,
            Column::TimeZone => &TIMEZONE,
            Column::NetSpeed => &NETSPEED,
            Column::IddCode => &IDDCODE,
            Column::AreaCode => &AREACODE,
            Column::WeatherStationCode => &WEATHER_CODE,
            Column::WeatherStationName => &WEATHER_NAME,
            Column::Mcc => &MCC,
            Column::Mnc => &MNC,
            Column::MobileBrand => &MOBILE_BRAND,
            Column::Elevation => &ELEVATION,
            Column::UsageType => &USAGE_TYPE,
        }
    }

    /// 1-based column number for `database_type`, 0 when absent
    pub fn position(self, database_type: u8) -> u8 {
        self.positions()
            .get(database_type as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Canonical fields this column feeds
    pub fn fields(self) -> &'static [GeoField] {
        match self {
            Column::Country => &[GeoField::CountryCode, GeoField::CountryName],
            Column::Region => &[GeoField::Region],
            Column::City => &[GeoField::City],
            Column::Isp => &[GeoField::Isp],
            Column::Latitude => &[GeoField::Latitude],
            Column::Longitude => &[GeoField::Longitude],
            Column::Domain => &[GeoField::Domain],
            Column::ZipCode => &[GeoField::PostalCode],
            Column::TimeZone => &[GeoField::TimeZone],
            Column::NetSpeed => &[GeoField::NetSpeed],
            Column::IddCode => &[GeoField::IddCode],
            Column::AreaCode => &[GeoField::AreaCode],
            Column::WeatherStationCode => &[GeoField::WeatherStationCode],
            Column::WeatherStationName => &[GeoField::WeatherStationName],
            Column::Mcc => &[GeoField::Mcc],
            Column::Mnc => &[GeoField::Mnc],
            Column::MobileBrand => &[GeoField::MobileBrand],
            Column::Elevation => &[GeoField::Elevation],
            Column::UsageType => &[GeoField::UsageType],
        }
    }
}

/// Byte offsets of the enabled columns for one database type
///
/// Offsets are relative to the end of the `ip_from` column, so the same
/// layout serves the IPv4 and IPv6 tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    offsets: [Option<u32>; 19],
}

impl FieldLayout {
    /// Layout for `database_type`
    pub fn for_type(database_type: u8) -> Self {
        let mut offsets = [None; 19];
        for (slot, column) in offsets.iter_mut().zip(Column::ALL) {
            let position = column.position(database_type);
            if position >= 2 {
                *slot = Some((position as u32 - 2) << 2);
            }
        }
        Self { offsets }
    }

    /// Offset of `column`, or `None` when this type does not carry it
    pub fn offset(&self, column: Column) -> Option<u32> {
        self.offsets[column as usize]
    }

    /// True when this type carries `column`
    pub fn is_enabled(&self, column: Column) -> bool {
        self.offset(column).is_some()
    }

    /// Highest column number used by this type
    pub fn max_column(database_type: u8) -> u8 {
        Column::ALL
            .iter()
            .map(|c| c.position(database_type))
            .max()
            .unwrap_or(0)
    }

    /// Fields this layout can ever populate
    pub fn available_fields(&self) -> FieldSet {
        Column::ALL
            .iter()
            .filter(|c| self.is_enabled(**c))
            .flat_map(|c| c.fields().iter().copied())
            .collect()
    }
}
