//! Canonical geolocation record
//!
//! Both backends convert their native rows into `GeoRecord`, so callers
//! never need to know which file format answered a lookup.

use crate::fields::{FieldSet, GeoField};
use crate::ip2location::Ip2LocationRecord;
use crate::mmdb::MmdbRecord;
use serde::Serialize;

/// Format-agnostic lookup result
///
/// Every field is optional. `None` means the database had no value; an
/// empty string or zero is kept as stored and only dropped by [`GeoRecord::emit`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoRecord {
    /// ISO 3166-1 alpha-2 country code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Country name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    /// Two-letter continent code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent_code: Option<String>,
    /// Continent name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent_name: Option<String>,
    /// First-level subdivision name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// First-level subdivision ISO code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    /// City name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Postal / ZIP code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Latitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// IANA zone name (Format A) or UTC offset (Format B)
    #[serde(rename = "timezone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Kilometres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_radius: Option<u16>,
    /// Internet service provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// Autonomous system number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    /// Autonomous system organization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_organization: Option<String>,
    /// Domain name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Connection type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// User type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Net speed class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_speed: Option<String>,
    /// International dialing code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idd_code: Option<String>,
    /// Area code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    /// Weather station code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_station_code: Option<String>,
    /// Weather station name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_station_name: Option<String>,
    /// Mobile country code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc: Option<String>,
    /// Mobile network code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnc: Option<String>,
    /// Mobile carrier brand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_brand: Option<String>,
    /// Metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f32>,
    /// Usage type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_type: Option<String>,
}

impl GeoRecord {
    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        GeoField::ALL.iter().all(|f| !self.is_present(*f))
    }

    /// True when `field` holds a value (possibly empty or zero)
    pub fn is_present(&self, field: GeoField) -> bool {
        match field {
            GeoField::Latitude => self.latitude.is_some(),
            GeoField::Longitude => self.longitude.is_some(),
            GeoField::AccuracyRadius => self.accuracy_radius.is_some(),
            GeoField::Asn => self.asn.is_some(),
            GeoField::Elevation => self.elevation.is_some(),
            _ => self.text(field).is_some(),
        }
    }

    /// Header-ready rendering of one field
    ///
    /// `None` for absent fields, empty strings and numeric zeros.
    /// Coordinates use 6 decimals, elevation 2.
    pub fn value(&self, field: GeoField) -> Option<String> {
        match field {
            GeoField::Latitude => nonzero(self.latitude).map(|v| format!("{:.6}", v)),
            GeoField::Longitude => nonzero(self.longitude).map(|v| format!("{:.6}", v)),
            GeoField::AccuracyRadius => self.accuracy_radius.filter(|&r| r != 0).map(|r| r.to_string()),
            GeoField::Asn => self.asn.filter(|&n| n != 0).map(|n| n.to_string()),
            GeoField::Elevation => nonzero(self.elevation.map(f64::from)).map(|v| format!("{:.2}", v)),
            _ => self
                .text(field)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// Render the selected fields in emission order, skipping absent,
    /// empty and zero values
    pub fn emit(&self, fields: &FieldSet) -> Vec<(GeoField, String)> {
        fields
            .iter()
            .filter_map(|field| self.value(field).map(|v| (field, v)))
            .collect()
    }

    /// Drop every field not in `fields`
    pub fn select(mut self, fields: &FieldSet) -> Self {
        for field in GeoField::ALL {
            if !fields.contains(field) {
                self.clear(field);
            }
        }
        self
    }

    fn clear(&mut self, field: GeoField) {
        match field {
            GeoField::Latitude => self.latitude = None,
            GeoField::Longitude => self.longitude = None,
            GeoField::AccuracyRadius => self.accuracy_radius = None,
            GeoField::Asn => self.asn = None,
            GeoField::Elevation => self.elevation = None,
            _ => {
                if let Some(slot) = self.text_slot(field) {
                    *slot = None;
                }
            }
        }
    }

    fn text_slot(&mut self, field: GeoField) -> Option<&mut Option<String>> {
        let slot = match field {
            GeoField::CountryCode => &mut self.country_code,
            GeoField::CountryName => &mut self.country_name,
            GeoField::ContinentCode => &mut self.continent_code,
            GeoField::ContinentName => &mut self.continent_name,
            GeoField::Region => &mut self.region,
            GeoField::RegionCode => &mut self.region_code,
            GeoField::City => &mut self.city,
            GeoField::PostalCode => &mut self.postal_code,
            GeoField::TimeZone => &mut self.time_zone,
            GeoField::Isp => &mut self.isp,
            GeoField::AsnOrganization => &mut self.asn_organization,
            GeoField::Domain => &mut self.domain,
            GeoField::ConnectionType => &mut self.connection_type,
            GeoField::UserType => &mut self.user_type,
            GeoField::NetSpeed => &mut self.net_speed,
            GeoField::IddCode => &mut self.idd_code,
            GeoField::AreaCode => &mut self.area_code,
            GeoField::WeatherStationCode => &mut self.weather_station_code,
            GeoField::WeatherStationName => &mut self.weather_station_name,
            GeoField::Mcc => &mut self.mcc,
            GeoField::Mnc => &mut self.mnc,
            GeoField::MobileBrand => &mut self.mobile_brand,
            GeoField::UsageType => &mut self.usage_type,
            GeoField::Latitude
            | GeoField::Longitude
            | GeoField::AccuracyRadius
            | GeoField::Asn
            | GeoField::Elevation => return None,
        };
        Some(slot)
    }

    fn text(&self, field: GeoField) -> Option<&str> {
        let slot = match field {
            GeoField::CountryCode => &self.country_code,
            GeoField::CountryName => &self.country_name,
            GeoField::ContinentCode => &self.continent_code,
            GeoField::ContinentName => &self.continent_name,
            GeoField::Region => &self.region,
            GeoField::RegionCode => &self.region_code,
            GeoField::City => &self.city,
            GeoField::PostalCode => &self.postal_code,
            GeoField::TimeZone => &self.time_zone,
            GeoField::Isp => &self.isp,
            GeoField::AsnOrganization => &self.asn_organization,
            GeoField::Domain => &self.domain,
            GeoField::ConnectionType => &self.connection_type,
            GeoField::UserType => &self.user_type,
            GeoField::NetSpeed => &self.net_speed,
            GeoField::IddCode => &self.idd_code,
            GeoField::AreaCode => &self.area_code,
            GeoField::WeatherStationCode => &self.weather_station_code,
            GeoField::WeatherStationName => &self.weather_station_name,
            GeoField::Mcc => &self.mcc,
            GeoField::Mnc => &self.mnc,
            GeoField::MobileBrand => &self.mobile_brand,
            GeoField::UsageType => &self.usage_type,
            GeoField::Latitude
            | GeoField::Longitude
            | GeoField::AccuracyRadius
            | GeoField::Asn
            | GeoField::Elevation => return None,
        };
        slot.as_deref()
    }
}

fn nonzero(v: Option<f64>) -> Option<f64> {
    v.filter(|&x| x != 0.0)
}

impl From<MmdbRecord> for GeoRecord {
    fn from(r: MmdbRecord) -> Self {
        GeoRecord {
            country_code: r.country_code,
            country_name: r.country_name,
            continent_code: r.continent_code,
            continent_name: r.continent_name,
            region: r.region_name,
            region_code: r.region_code,
            city: r.city_name,
            postal_code: r.postal_code,
            latitude: r.latitude,
            longitude: r.longitude,
            time_zone: r.time_zone,
            accuracy_radius: r.accuracy_radius,
            isp: r.isp,
            asn: r.asn,
            asn_organization: r.asn_organization,
            domain: r.domain,
            connection_type: r.connection_type,
            user_type: r.user_type,
            ..Default::default()
        }
    }
}

impl From<Ip2LocationRecord> for GeoRecord {
    fn from(r: Ip2LocationRecord) -> Self {
        GeoRecord {
            country_code: r.country_code,
            country_name: r.country_name,
            region: r.region,
            city: r.city,
            postal_code: r.zip_code,
            latitude: r.latitude.map(f64::from),
            longitude: r.longitude.map(f64::from),
            time_zone: r.time_zone,
            isp: r.isp,
            domain: r.domain,
            net_speed: r.net_speed,
            idd_code: r.idd_code,
            area_code: r.area_code,
            weather_station_code: r.weather_station_code,
            weather_station_name: r.weather_station_name,
            mcc: r.mcc,
            mnc: r.mnc,
            mobile_brand: r.mobile_brand,
            elevation: r.elevation,
            usage_type: r.usage_type,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let record = GeoRecord::default();
        assert!(record.is_empty());
        assert!(record.emit(&FieldSet::all()).is_empty());
        assert_eq!(serde_json::to_string(&record).unwrap(), "{}");
    }

    #[test]
    fn test_presentation_rules() {
        let record = GeoRecord {
            country_code: Some("US".into()),
            city: Some(String::new()),
            latitude: Some(37.751),
            longitude: Some(0.0),
            asn: Some(0),
            accuracy_radius: Some(1000),
            elevation: Some(12.5),
            ..Default::default()
        };

        assert!(record.is_present(GeoField::City));
        assert_eq!(record.value(GeoField::City), None);
        assert_eq!(record.value(GeoField::Latitude).as_deref(), Some("37.751000"));
        assert_eq!(record.value(GeoField::Longitude), None);
        assert_eq!(record.value(GeoField::Asn), None);
        assert_eq!(record.value(GeoField::Elevation).as_deref(), Some("12.50"));

        let emitted = record.emit(&FieldSet::all());
        assert_eq!(
            emitted,
            vec![
                (GeoField::CountryCode, "US".to_string()),
                (GeoField::Latitude, "37.751000".to_string()),
                (GeoField::AccuracyRadius, "1000".to_string()),
                (GeoField::Elevation, "12.50".to_string()),
            ]
        );

        let only_country = FieldSet::empty().with(GeoField::CountryCode);
        assert_eq!(record.emit(&only_country).len(), 1);
    }

    #[test]
    fn test_select() {
        let record = GeoRecord {
            country_code: Some("US".into()),
            city: Some("Mountain View".into()),
            latitude: Some(37.4),
            ..Default::default()
        };
        let selected = record.select(&FieldSet::empty().with(GeoField::City));
        assert_eq!(
            selected,
            GeoRecord {
                city: Some("Mountain View".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_from_mmdb() {
        let native = MmdbRecord {
            country_code: Some("DE".into()),
            region_name: Some("Bavaria".into()),
            city_name: Some("Munich".into()),
            asn: Some(3320),
            ..Default::default()
        };
        let record = GeoRecord::from(native);
        assert_eq!(record.region.as_deref(), Some("Bavaria"));
        assert_eq!(record.city.as_deref(), Some("Munich"));
        assert_eq!(record.value(GeoField::Asn).as_deref(), Some("3320"));
        assert_eq!(record.net_speed, None);
    }

    #[test]
    fn test_from_ip2location() {
        let native = Ip2LocationRecord {
            country_code: Some("US".into()),
            zip_code: Some("94043".into()),
            latitude: Some(37.386),
            time_zone: Some("-07:00".into()),
            ..Default::default()
        };
        let record = GeoRecord::from(native);
        assert_eq!(record.postal_code.as_deref(), Some("94043"));
        assert_eq!(record.value(GeoField::Latitude).as_deref(), Some("37.386002"));
        assert_eq!(record.continent_code, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timezone"], "-07:00");
        assert!(json.get("asn").is_none());
    }
}
