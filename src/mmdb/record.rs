//! Structured record extraction from decoded MMDB values
//!
//! Pulls the well-known GeoIP2 paths out of a decoded data-section map.
//! A missing key or an unexpected value shape yields an absent field.

use crate::data_section::DataValue;

/// Fields a GeoIP2 / GeoLite2 record can carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MmdbRecord {
    /// `country.iso_code`
    pub country_code: Option<String>,
    /// `country.names.<lang>`
    pub country_name: Option<String>,
    /// `continent.code`
    pub continent_code: Option<String>,
    /// `continent.names.<lang>`
    pub continent_name: Option<String>,
    /// `subdivisions[0].iso_code`
    pub region_code: Option<String>,
    /// `subdivisions[0].names.<lang>`
    pub region_name: Option<String>,
    /// `city.names.<lang>`
    pub city_name: Option<String>,
    /// `postal.code`
    pub postal_code: Option<String>,
    /// `location.latitude`
    pub latitude: Option<f64>,
    /// `location.longitude`
    pub longitude: Option<f64>,
    /// `location.time_zone`
    pub time_zone: Option<String>,
    /// `location.accuracy_radius` in kilometres
    pub accuracy_radius: Option<u16>,
    /// `traits.isp`
    pub isp: Option<String>,
    /// `traits.autonomous_system_number`
    pub asn: Option<u32>,
    /// `traits.autonomous_system_organization`
    pub asn_organization: Option<String>,
    /// `traits.domain`
    pub domain: Option<String>,
    /// `traits.connection_type`
    pub connection_type: Option<String>,
    /// `traits.user_type`
    pub user_type: Option<String>,
}

impl MmdbRecord {
    /// Extract a record from the top-level value of a lookup
    ///
    /// Names come from the `language` entry of each `names` map, falling
    /// back to English. A top-level value that is not a map gives an empty
    /// record.
    pub fn from_value(value: &DataValue, language: &str) -> Self {
        if !matches!(value, DataValue::Map(_)) {
            return Self::default();
        }

        let country = value.get("country");
        let continent = value.get("continent");
        let subdivision = value.get("subdivisions").and_then(|s| s.index(0));
        let location = value.get("location");
        let traits = value.get("traits");

        // ASN databases keep the AS fields at the top level
        let asn_source = |key: &str| {
            traits
                .and_then(|t| t.get(key))
                .or_else(|| value.get(key))
        };

        Self {
            country_code: string_at(country, "iso_code"),
            country_name: name_of(country, language),
            continent_code: string_at(continent, "code"),
            continent_name: name_of(continent, language),
            region_code: string_at(subdivision, "iso_code"),
            region_name: name_of(subdivision, language),
            city_name: name_of(value.get("city"), language),
            postal_code: string_at(value.get("postal"), "code"),
            latitude: location.and_then(|l| l.get("latitude")).and_then(DataValue::as_f64),
            longitude: location.and_then(|l| l.get("longitude")).and_then(DataValue::as_f64),
            time_zone: string_at(location, "time_zone"),
            accuracy_radius: location
                .and_then(|l| l.get("accuracy_radius"))
                .and_then(DataValue::as_u64)
                .and_then(|n| u16::try_from(n).ok()),
            isp: string_at(traits, "isp"),
            asn: asn_source("autonomous_system_number")
                .and_then(DataValue::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
            asn_organization: asn_source("autonomous_system_organization")
                .and_then(DataValue::as_str)
                .map(str::to_string),
            domain: string_at(traits, "domain"),
            connection_type: string_at(traits, "connection_type"),
            user_type: string_at(traits, "user_type"),
        }
    }
}

fn string_at(parent: Option<&DataValue>, key: &str) -> Option<String> {
    parent
        .and_then(|p| p.get(key))
        .and_then(DataValue::as_str)
        .map(str::to_string)
}

fn name_of(parent: Option<&DataValue>, language: &str) -> Option<String> {
    let names = parent?.get("names")?;
    names
        .get(language)
        .or_else(|| names.get("en"))
        .and_then(DataValue::as_str)
        .map(str::to_string)
}
