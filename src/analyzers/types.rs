//! Data types shared by the evaluation, scoring and rollup stages.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::record::SchoolType;

/// Implements `Display` and `Serialize` for a label enum through its `label()` method.
macro_rules! label_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.label())
                }
            }
        )*
    };
}

/// A pollutant with its own grading table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pollutant {
    Pm10,
    Pm25,
    Co2,
    Co,
    No2,
    O3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::Co2,
        Pollutant::Co,
        Pollutant::No2,
        Pollutant::O3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Co2 => "CO2",
            Pollutant::Co => "CO",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Pollutant::Pm10 | Pollutant::Pm25 => "μg/m³",
            Pollutant::Co2 | Pollutant::Co | Pollutant::No2 | Pollutant::O3 => "ppm",
        }
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm10" => Ok(Pollutant::Pm10),
            "pm2.5" | "pm25" => Ok(Pollutant::Pm25),
            "co2" => Ok(Pollutant::Co2),
            "co" => Ok(Pollutant::Co),
            "no2" => Ok(Pollutant::No2),
            "o3" => Ok(Pollutant::O3),
            other => Err(format!(
                "unknown pollutant '{other}' (expected one of pm10, pm2.5, co2, co, no2, o3)"
            )),
        }
    }
}

/// One of the seven compliance-bearing measurements taken during an inspection.
///
/// PM10 is measured twice (classroom and gymnasium) and both are graded on the
/// PM10 table, but only the classroom reading feeds the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    Pm10Classroom,
    Pm10Gym,
    Pm25,
    Co2,
    Co,
    No2,
    O3,
}

impl Measurement {
    pub const ALL: [Measurement; 7] = [
        Measurement::Pm10Classroom,
        Measurement::Pm10Gym,
        Measurement::Pm25,
        Measurement::Co2,
        Measurement::Co,
        Measurement::No2,
        Measurement::O3,
    ];

    /// Measurements that contribute to the composite score.
    pub const SCORED: [Measurement; 6] = [
        Measurement::Pm10Classroom,
        Measurement::Pm25,
        Measurement::Co2,
        Measurement::Co,
        Measurement::No2,
        Measurement::O3,
    ];

    pub fn pollutant(self) -> Pollutant {
        match self {
            Measurement::Pm10Classroom | Measurement::Pm10Gym => Pollutant::Pm10,
            Measurement::Pm25 => Pollutant::Pm25,
            Measurement::Co2 => Pollutant::Co2,
            Measurement::Co => Pollutant::Co,
            Measurement::No2 => Pollutant::No2,
            Measurement::O3 => Pollutant::O3,
        }
    }

    /// Position of this measurement in [`Measurement::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Measurement::Pm10Classroom => "PM10_classroom",
            Measurement::Pm10Gym => "PM10_gym",
            Measurement::Pm25 => "PM2.5",
            Measurement::Co2 => "CO2",
            Measurement::Co => "CO",
            Measurement::No2 => "NO2",
            Measurement::O3 => "O3",
        }
    }
}

/// Grade assigned to a single pollutant concentration.
///
/// PM10 and PM2.5 use the six-step particulate scale; the gases use the
/// four-step good/moderate/caution/bad scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PollutantGrade {
    NoData,
    Good,
    ModerateSafe,
    ModerateCaution,
    ModerateAll,
    Moderate,
    Caution,
    Bad,
    VeryBad,
    Hazardous,
}

impl PollutantGrade {
    pub fn label(self) -> &'static str {
        match self {
            PollutantGrade::NoData => "no data",
            PollutantGrade::Good => "good",
            PollutantGrade::ModerateSafe => "moderate-safe",
            PollutantGrade::ModerateCaution => "moderate-caution",
            PollutantGrade::ModerateAll => "moderate-all",
            PollutantGrade::Moderate => "moderate",
            PollutantGrade::Caution => "caution",
            PollutantGrade::Bad => "bad",
            PollutantGrade::VeryBad => "very bad",
            PollutantGrade::Hazardous => "hazardous",
        }
    }
}

/// Outcome of a compliance flag check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suitability {
    NoData,
    Compliant,
    NonCompliant,
}

impl Suitability {
    pub fn label(self) -> &'static str {
        match self {
            Suitability::NoData => "no data",
            Suitability::Compliant => "compliant",
            Suitability::NonCompliant => "non-compliant",
        }
    }

    pub fn score(self) -> u8 {
        match self {
            Suitability::NoData => 0,
            Suitability::Compliant => 1,
            Suitability::NonCompliant => 2,
        }
    }
}

/// Letter-style grade for the weighted composite score of a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositeGrade {
    InsufficientData,
    VeryGood,
    Good,
    Moderate,
    Caution,
    Hazardous,
}

impl CompositeGrade {
    pub const ALL: [CompositeGrade; 6] = [
        CompositeGrade::InsufficientData,
        CompositeGrade::VeryGood,
        CompositeGrade::Good,
        CompositeGrade::Moderate,
        CompositeGrade::Caution,
        CompositeGrade::Hazardous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CompositeGrade::InsufficientData => "insufficient data",
            CompositeGrade::VeryGood => "very good",
            CompositeGrade::Good => "good",
            CompositeGrade::Moderate => "moderate",
            CompositeGrade::Caution => "caution",
            CompositeGrade::Hazardous => "hazardous",
        }
    }
}

label_display!(Pollutant, Measurement, PollutantGrade, Suitability, CompositeGrade);

/// A (grade, ordinal score) pair. Score 0 is reserved for [`PollutantGrade::NoData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grading {
    pub grade: PollutantGrade,
    pub score: u8,
}

impl Grading {
    pub const NO_DATA: Grading = Grading {
        grade: PollutantGrade::NoData,
        score: 0,
    };
}

/// Evaluated state of one measurement for one school.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollutantReading {
    pub value: Option<f64>,
    pub grade: PollutantGrade,
    pub score: u8,
    pub suitability: Suitability,
}

impl Default for PollutantReading {
    fn default() -> Self {
        Self {
            value: None,
            grade: PollutantGrade::NoData,
            score: 0,
            suitability: Suitability::NoData,
        }
    }
}

/// Result of the composite scoring step for one school.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeScore {
    pub observed_items: usize,
    pub score: f64,
    pub grade: CompositeGrade,
    pub non_compliance_count: usize,
}

/// Complete assessment of a single school, produced once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolAssessment {
    pub school_code: String,
    pub school_name: String,
    pub school_type: SchoolType,
    pub district: Option<String>,
    pub period: Option<String>,
    /// Indexed by [`Measurement::index`].
    pub readings: [PollutantReading; 7],
    pub observed_items: usize,
    pub composite_score: f64,
    pub composite_grade: CompositeGrade,
    pub non_compliance_count: usize,
}

impl SchoolAssessment {
    pub fn reading(&self, measurement: Measurement) -> &PollutantReading {
        &self.readings[measurement.index()]
    }

    /// True when the composite score was actually computed.
    pub fn has_composite(&self) -> bool {
        self.composite_grade != CompositeGrade::InsufficientData
    }
}
