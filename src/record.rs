//! Raw inspection rows and the facility metadata derived from them.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::analyzers::types::Measurement;

/// Raw text for one measurement: primary reading, two repeats, and the compliance flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMeasurement {
    pub readings: [Option<String>; 3],
    pub flag: Option<String>,
}

/// One row of inspection data, exactly as loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub school_code: String,
    pub school_name: String,
    pub school_type_code: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub period: Option<String>,
    /// Which column the district is read from; fixed per table.
    pub district_source: DistrictSource,
    /// Indexed by [`Measurement::index`].
    pub measurements: [RawMeasurement; 7],
}

/// Column a table's districts come from.
///
/// Tables that carry a street address take the district from it alone, so an
/// address outside the city yields no district even when a region is present.
/// Only tables without an address column use the region name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistrictSource {
    #[default]
    Address,
    Region,
}

impl RawRecord {
    pub fn new(school_code: impl Into<String>, school_name: impl Into<String>) -> Self {
        Self {
            school_code: school_code.into(),
            school_name: school_name.into(),
            ..Default::default()
        }
    }

    pub fn measurement(&self, measurement: Measurement) -> &RawMeasurement {
        &self.measurements[measurement.index()]
    }

    pub fn measurement_mut(&mut self, measurement: Measurement) -> &mut RawMeasurement {
        &mut self.measurements[measurement.index()]
    }

    /// Builder-style helper that sets the readings of one measurement.
    pub fn with_readings(mut self, measurement: Measurement, readings: [Option<&str>; 3]) -> Self {
        self.measurement_mut(measurement).readings = readings.map(|r| r.map(str::to_string));
        self
    }

    /// Builder-style helper that sets the compliance flag of one measurement.
    pub fn with_flag(mut self, measurement: Measurement, flag: &str) -> Self {
        self.measurement_mut(measurement).flag = Some(flag.to_string());
        self
    }

    pub fn school_type(&self) -> SchoolType {
        SchoolType::from_code(self.school_type_code.as_deref())
    }

    pub fn district(&self) -> Option<String> {
        match self.district_source {
            DistrictSource::Address => self.address.as_deref().and_then(extract_district),
            DistrictSource::Region => self
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| r.contains('구'))
                .map(str::to_string),
        }
    }
}

/// School level, decoded from the school-kind code of the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchoolType {
    Elementary,
    Middle,
    High,
    Other,
    Unknown,
}

impl SchoolType {
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            None | Some("") => SchoolType::Unknown,
            Some("2") => SchoolType::Elementary,
            Some("3") => SchoolType::Middle,
            Some("4") => SchoolType::High,
            Some(_) => SchoolType::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SchoolType::Elementary => "elementary",
            SchoolType::Middle => "middle",
            SchoolType::High => "high",
            SchoolType::Other => "other",
            SchoolType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SchoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for SchoolType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

const CITY_PREFIX: &str = "서울특별시";

/// Pulls the district (`…구`) that directly follows the city name in a street address.
///
/// ```
/// use school_air_rater::record::extract_district;
///
/// assert_eq!(extract_district("서울특별시 강남구 테헤란로 1").as_deref(), Some("강남구"));
/// assert_eq!(extract_district("부산광역시 해운대구"), None);
/// ```
pub fn extract_district(address: &str) -> Option<String> {
    let (_, rest) = address.split_once(CITY_PREFIX)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let token = rest.split_whitespace().next()?;
    let end = token.rfind('구')?;
    (end > 0).then(|| token[..end + '구'.len_utf8()].to_string())
}
