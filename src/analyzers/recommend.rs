//! Improvement recommendations derived from a finished school assessment.

use serde::Serialize;

use crate::analyzers::types::{CompositeGrade, Measurement, SchoolAssessment};

/// Ordered recommendation messages for one school. Empty when no rule fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub school_code: String,
    pub school_name: String,
    pub messages: Vec<String>,
}

impl Recommendation {
    pub fn for_assessment(assessment: &SchoolAssessment) -> Self {
        Self {
            school_code: assessment.school_code.clone(),
            school_name: assessment.school_name.clone(),
            messages: recommend(assessment),
        }
    }
}

fn pm10_classroom(value: f64) -> Option<String> {
    if value > 75.0 {
        Some(format!(
            "Classroom PM10 at {value:.1} μg/m³ exceeds the 75 μg/m³ standard; restrict outdoor activity and run air purifiers"
        ))
    } else if value > 65.0 {
        Some(format!(
            "Classroom PM10 at {value:.1} μg/m³ is at caution level; keep students with respiratory conditions indoors"
        ))
    } else if value > 50.0 {
        Some(format!(
            "Classroom PM10 at {value:.1} μg/m³ calls for care with sensitive groups; monitor students with asthma"
        ))
    } else {
        None
    }
}

fn pm25(value: f64) -> Option<String> {
    if value > 35.0 {
        Some(format!(
            "PM2.5 at {value:.1} μg/m³ exceeds the 35 μg/m³ standard; move activities indoors"
        ))
    } else if value > 25.0 {
        Some(format!(
            "PM2.5 at {value:.1} μg/m³ is at caution level; sensitive students should wear masks"
        ))
    } else {
        None
    }
}

fn co2(value: f64) -> Option<String> {
    if value > 1500.0 {
        Some(format!(
            "CO2 at {value:.0} ppm exceeds the 1500 ppm standard; inspect the ventilation system and ventilate more often"
        ))
    } else if value > 1000.0 {
        Some(format!(
            "CO2 at {value:.0} ppm is at caution level; ventilate classrooms regularly"
        ))
    } else {
        None
    }
}

fn composite(grade: CompositeGrade) -> Option<String> {
    match grade {
        CompositeGrade::Hazardous => {
            Some("Overall air quality graded 'hazardous'; immediate action required".to_string())
        }
        CompositeGrade::Caution => Some(
            "Overall air quality graded 'caution'; improve ventilation and air quality".to_string(),
        ),
        _ => None,
    }
}

fn non_compliance(count: usize) -> Option<String> {
    (count > 0).then(|| {
        format!("{count} item(s) judged non-compliant; draw up an air-quality improvement plan")
    })
}

/// Runs the recommendation rules in their fixed order and collects every
/// message that fires. Rules are independent; a missing value skips its rule.
pub fn recommend(assessment: &SchoolAssessment) -> Vec<String> {
    let value = |m: Measurement| assessment.reading(m).value;

    [
        value(Measurement::Pm10Classroom).and_then(pm10_classroom),
        value(Measurement::Pm25).and_then(pm25),
        value(Measurement::Co2).and_then(co2),
        composite(assessment.composite_grade),
        non_compliance(assessment.non_compliance_count),
    ]
    .into_iter()
    .flatten()
    .collect()
}
