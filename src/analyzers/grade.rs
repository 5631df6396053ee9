//! Pollutant grading tables and compliance-flag evaluation.
//!
//! Every pollutant is graded by walking an ascending list of inclusive upper
//! bounds; the first bound at or above the value decides the grade, and the
//! score is the 1-based position in the table. Values above the last bound
//! fall into the table's open-ended grade.

use crate::analyzers::reading::{ReconcileStrategy, reconcile_multi_reading};
use crate::analyzers::types::{Grading, Measurement, Pollutant, PollutantGrade, PollutantReading, Suitability};
use crate::record::RawRecord;

use PollutantGrade::*;

/// Ascending inclusive upper bounds for one pollutant, plus the grade above the last bound.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdTable {
    pub bands: &'static [(f64, PollutantGrade)],
    pub above: PollutantGrade,
}

/// PM10, μg/m³.
pub const PM10_TABLE: ThresholdTable = ThresholdTable {
    bands: &[
        (30.0, Good),
        (50.0, ModerateSafe),
        (65.0, ModerateCaution),
        (75.0, ModerateAll),
        (150.0, Bad),
    ],
    above: VeryBad,
};

/// PM2.5, μg/m³.
pub const PM25_TABLE: ThresholdTable = ThresholdTable {
    bands: &[
        (15.0, Good),
        (25.0, ModerateSafe),
        (35.0, ModerateCaution),
        (50.0, Bad),
        (75.0, VeryBad),
    ],
    above: Hazardous,
};

/// CO2, ppm.
pub const CO2_TABLE: ThresholdTable = ThresholdTable {
    bands: &[(700.0, Good), (1000.0, Moderate), (1500.0, Caution)],
    above: Bad,
};

/// CO, ppm.
pub const CO_TABLE: ThresholdTable = ThresholdTable {
    bands: &[(2.0, Good), (5.0, Moderate), (10.0, Caution)],
    above: Bad,
};

/// NO2, ppm.
pub const NO2_TABLE: ThresholdTable = ThresholdTable {
    bands: &[(0.03, Good), (0.05, Moderate), (0.1, Caution)],
    above: Bad,
};

/// O3, ppm.
pub const O3_TABLE: ThresholdTable = ThresholdTable {
    bands: &[(0.03, Good), (0.06, Moderate), (0.1, Caution)],
    above: Bad,
};

impl ThresholdTable {
    pub fn for_pollutant(pollutant: Pollutant) -> &'static ThresholdTable {
        match pollutant {
            Pollutant::Pm10 => &PM10_TABLE,
            Pollutant::Pm25 => &PM25_TABLE,
            Pollutant::Co2 => &CO2_TABLE,
            Pollutant::Co => &CO_TABLE,
            Pollutant::No2 => &NO2_TABLE,
            Pollutant::O3 => &O3_TABLE,
        }
    }

    /// Highest score this table can produce.
    pub fn max_score(&self) -> u8 {
        self.bands.len() as u8 + 1
    }

    pub fn classify(&self, value: Option<f64>) -> Grading {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return Grading::NO_DATA;
        };

        for (i, &(upper, grade)) in self.bands.iter().enumerate() {
            if value <= upper {
                return Grading {
                    grade,
                    score: i as u8 + 1,
                };
            }
        }

        Grading {
            grade: self.above,
            score: self.max_score(),
        }
    }
}

/// Grades a concentration of `pollutant`. `None` yields [`Grading::NO_DATA`].
pub fn evaluate(pollutant: Pollutant, value: Option<f64>) -> Grading {
    ThresholdTable::for_pollutant(pollutant).classify(value)
}

pub fn evaluate_pm10(value: Option<f64>) -> Grading {
    PM10_TABLE.classify(value)
}

pub fn evaluate_pm25(value: Option<f64>) -> Grading {
    PM25_TABLE.classify(value)
}

pub fn evaluate_co2(value: Option<f64>) -> Grading {
    CO2_TABLE.classify(value)
}

pub fn evaluate_co(value: Option<f64>) -> Grading {
    CO_TABLE.classify(value)
}

pub fn evaluate_no2(value: Option<f64>) -> Grading {
    NO2_TABLE.classify(value)
}

pub fn evaluate_o3(value: Option<f64>) -> Grading {
    O3_TABLE.classify(value)
}

/// Flag values that mean "this check was not carried out".
const NOT_APPLICABLE: &[&str] = &["해당없음", "not applicable"];
const NOT_PERFORMED: &[&str] = &["미실시", "not performed"];
/// The positive verdict, in the source data's wording and in English.
const COMPLIANT: &[&str] = &["적합", "compliant"];

/// Maps a raw compliance flag to a three-way suitability label.
///
/// Any non-empty flag that is not a recognised positive or skip marker counts
/// as non-compliant.
pub fn evaluate_suitability(flag: Option<&str>) -> Suitability {
    let Some(flag) = flag.map(str::trim).filter(|f| !f.is_empty()) else {
        return Suitability::NoData;
    };

    if NOT_APPLICABLE.contains(&flag) || NOT_PERFORMED.contains(&flag) {
        Suitability::NoData
    } else if COMPLIANT.contains(&flag) {
        Suitability::Compliant
    } else {
        Suitability::NonCompliant
    }
}

/// Reconciles, grades and checks compliance for one measurement of a record.
pub fn evaluate_measurement(
    record: &RawRecord,
    measurement: Measurement,
    strategy: ReconcileStrategy,
) -> PollutantReading {
    let raw = record.measurement(measurement);
    let [primary, secondary, tertiary] = &raw.readings;
    let value = reconcile_multi_reading(
        primary.as_deref(),
        secondary.as_deref(),
        tertiary.as_deref(),
        strategy,
    );
    let grading = evaluate(measurement.pollutant(), value);

    PollutantReading {
        value,
        grade: grading.grade,
        score: grading.score,
        suitability: evaluate_suitability(raw.flag.as_deref()),
    }
}
