//! Native IP2Location row contents

/// Decoded columns of one BIN row
///
/// Columns the database type does not carry, or that were not requested,
/// stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ip2LocationRecord {
    /// ISO 3166-1 alpha-2 code
    pub country_code: Option<String>,
    /// Country name
    pub country_name: Option<String>,
    /// Region or state
    pub region: Option<String>,
    /// City
    pub city: Option<String>,
    /// ISP name
    pub isp: Option<String>,
    /// Latitude in degrees
    pub latitude: Option<f32>,
    /// Longitude in degrees
    pub longitude: Option<f32>,
    /// Domain name
    pub domain: Option<String>,
    /// ZIP / postal code
    pub zip_code: Option<String>,
    /// UTC offset such as `-07:00`
    pub time_zone: Option<String>,
    /// Net speed class
    pub net_speed: Option<String>,
    /// IDD code
    pub idd_code: Option<String>,
    /// Area code
    pub area_code: Option<String>,
    /// Weather station code
    pub weather_station_code: Option<String>,
    /// Weather station name
    pub weather_station_name: Option<String>,
    /// Mobile country code
    pub mcc: Option<String>,
    /// Mobile network code
    pub mnc: Option<String>,
    /// Mobile carrier brand
    pub mobile_brand: Option<String>,
    /// Metres above sea level, parsed from the text column
    pub elevation: Option<f32>,
    /// Usage type
    pub usage_type: Option<String>,
}
