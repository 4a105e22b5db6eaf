//! Canonical record fields and field selection
//!
//! `GeoField` names every attribute a `GeoRecord` can carry. `FieldSet` is
//! a compact bitmask of fields, used both to limit Format-B decoding to the
//! columns a caller needs and to pick which fields to emit as headers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One attribute of a canonical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GeoField {
    /// ISO 3166-1 alpha-2 country code
    CountryCode,
    /// Country name
    CountryName,
    /// Two-letter continent code
    ContinentCode,
    /// Continent name
    ContinentName,
    /// Region / state name
    Region,
    /// Region ISO code
    RegionCode,
    /// City name
    City,
    /// Postal / ZIP code
    PostalCode,
    /// Latitude in degrees
    Latitude,
    /// Longitude in degrees
    Longitude,
    /// IANA time zone, or a UTC offset for Format B
    TimeZone,
    /// Location accuracy radius in km
    AccuracyRadius,
    /// Internet service provider
    Isp,
    /// Autonomous system number
    Asn,
    /// Autonomous system organization
    AsnOrganization,
    /// Domain name
    Domain,
    /// Connection type
    ConnectionType,
    /// User type
    UserType,
    /// Net speed (Format B)
    NetSpeed,
    /// International direct dialing code (Format B)
    IddCode,
    /// Area code (Format B)
    AreaCode,
    /// Weather station code (Format B)
    WeatherStationCode,
    /// Weather station name (Format B)
    WeatherStationName,
    /// Mobile country code (Format B)
    Mcc,
    /// Mobile network code (Format B)
    Mnc,
    /// Mobile carrier brand (Format B)
    MobileBrand,
    /// Elevation in metres (Format B)
    Elevation,
    /// Usage type (Format B)
    UsageType,
}

impl GeoField {
    /// Every field, in emission order
    pub const ALL: [GeoField; 28] = [
        GeoField::CountryCode,
        GeoField::CountryName,
        GeoField::ContinentCode,
        GeoField::ContinentName,
        GeoField::Region,
        GeoField::RegionCode,
        GeoField::City,
        GeoField::PostalCode,
        GeoField::Latitude,
        GeoField::Longitude,
        GeoField::TimeZone,
        GeoField::AccuracyRadius,
        GeoField::Isp,
        GeoField::Asn,
        GeoField::AsnOrganization,
        GeoField::Domain,
        GeoField::ConnectionType,
        GeoField::UserType,
        GeoField::NetSpeed,
        GeoField::IddCode,
        GeoField::AreaCode,
        GeoField::WeatherStationCode,
        GeoField::WeatherStationName,
        GeoField::Mcc,
        GeoField::Mnc,
        GeoField::MobileBrand,
        GeoField::Elevation,
        GeoField::UsageType,
    ];

    /// Configuration key naming this field
    pub fn header_key(self) -> &'static str {
        match self {
            GeoField::CountryCode => "country_code",
            GeoField::CountryName => "country_name",
            GeoField::ContinentCode => "continent_code",
            GeoField::ContinentName => "continent_name",
            GeoField::Region => "region",
            GeoField::RegionCode => "region_code",
            GeoField::City => "city",
            GeoField::PostalCode => "postal_code",
            GeoField::Latitude => "latitude",
            GeoField::Longitude => "longitude",
            GeoField::TimeZone => "timezone",
            GeoField::AccuracyRadius => "accuracy_radius",
            GeoField::Isp => "isp",
            GeoField::Asn => "asn",
            GeoField::AsnOrganization => "asn_organization",
            GeoField::Domain => "domain",
            GeoField::ConnectionType => "connection_type",
            GeoField::UserType => "user_type",
            GeoField::NetSpeed => "net_speed",
            GeoField::IddCode => "idd_code",
            GeoField::AreaCode => "area_code",
            GeoField::WeatherStationCode => "weather_station_code",
            GeoField::WeatherStationName => "weather_station_name",
            GeoField::Mcc => "mcc",
            GeoField::Mnc => "mnc",
            GeoField::MobileBrand => "mobile_brand",
            GeoField::Elevation => "elevation",
            GeoField::UsageType => "usage_type",
        }
    }

    /// Resolve a configuration key, including the legacy aliases
    /// `country_short`, `country_long` and `zipcode`
    pub fn from_key(key: &str) -> Option<GeoField> {
        let key = key.trim();
        match key {
            "country_short" => return Some(GeoField::CountryCode),
            "country_long" => return Some(GeoField::CountryName),
            "zipcode" => return Some(GeoField::PostalCode),
            _ => {}
        }
        GeoField::ALL.iter().copied().find(|f| f.header_key() == key)
    }

    #[inline]
    fn bit(self) -> u32 {
        1 << self as u8
    }
}

impl fmt::Display for GeoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_key())
    }
}

/// Set of fields, stored as a bitmask
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldSet(u32);

impl FieldSet {
    /// No fields
    pub const fn empty() -> Self {
        FieldSet(0)
    }

    /// Every field
    pub fn all() -> Self {
        GeoField::ALL.iter().copied().collect()
    }

    /// Add a field
    pub fn insert(&mut self, field: GeoField) {
        self.0 |= field.bit();
    }

    /// Builder-style [`Self::insert`]
    pub fn with(mut self, field: GeoField) -> Self {
        self.insert(field);
        self
    }

    /// True when `field` is in the set
    #[inline]
    pub fn contains(&self, field: GeoField) -> bool {
        self.0 & field.bit() != 0
    }

    /// True when any of `fields` is in the set
    pub fn contains_any(&self, fields: &[GeoField]) -> bool {
        fields.iter().any(|f| self.contains(*f))
    }

    /// True when the set holds no fields
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of fields in the set
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Fields in emission order
    pub fn iter(&self) -> impl Iterator<Item = GeoField> + '_ {
        GeoField::ALL.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<GeoField> for FieldSet {
    fn from_iter<I: IntoIterator<Item = GeoField>>(iter: I) -> Self {
        let mut set = FieldSet::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Error for an unrecognised field key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for FieldSet {
    type Err = UnknownField;

    /// Parse a comma-separated list of field keys; `all` selects every field
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = FieldSet::empty();
        for key in s.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            if key == "all" {
                return Ok(FieldSet::all());
            }
            let field = GeoField::from_key(key).ok_or_else(|| UnknownField(key.to_string()))?;
            set.insert(field);
        }
        Ok(set)
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(GeoField::header_key))
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        keys.iter()
            .map(|k| GeoField::from_key(k).ok_or_else(|| UnknownField(k.clone())))
            .collect::<Result<FieldSet, _>>()
            .map_err(serde::de::Error::custom)
    }
}
