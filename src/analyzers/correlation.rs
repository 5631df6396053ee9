//! Pearson correlations between measured concentrations, composite scores and
//! non-compliance counts.
//!
//! Only variables with enough observations across the table take part, and
//! every coefficient uses the schools that have both values.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::types::{Measurement, SchoolAssessment};
use crate::analyzers::utility::pearson;
use crate::record::SchoolType;

/// Observations a variable needs across the table to be correlated at all.
pub const MIN_VARIABLE_SAMPLES: usize = 10;
/// Fewer usable variables than this and no correlation is reported.
pub const MIN_VARIABLES: usize = 3;
/// Schools a type needs for its own matrix.
pub const MIN_TYPE_SCHOOLS: usize = 10;
/// Schools a district needs for its PM10 / PM2.5 coefficient.
pub const MIN_DISTRICT_SCHOOLS: usize = 15;
/// Districts needed before per-district coefficients are compared.
pub const MIN_DISTRICTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Reading(Measurement),
    CompositeScore,
    NonComplianceCount,
}

impl Variable {
    pub const ALL: [Variable; 9] = [
        Variable::Reading(Measurement::Pm10Classroom),
        Variable::Reading(Measurement::Pm10Gym),
        Variable::Reading(Measurement::Pm25),
        Variable::Reading(Measurement::Co2),
        Variable::Reading(Measurement::Co),
        Variable::Reading(Measurement::No2),
        Variable::Reading(Measurement::O3),
        Variable::CompositeScore,
        Variable::NonComplianceCount,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Variable::Reading(m) => m.label(),
            Variable::CompositeScore => "composite_score",
            Variable::NonComplianceCount => "non_compliance_count",
        }
    }

    /// Value for one school. Unscored schools have no composite.
    pub fn value(self, assessment: &SchoolAssessment) -> Option<f64> {
        match self {
            Variable::Reading(m) => assessment.reading(m).value,
            Variable::CompositeScore => assessment
                .has_composite()
                .then_some(assessment.composite_score),
            Variable::NonComplianceCount => Some(assessment.non_compliance_count as f64),
        }
    }
}

/// Symmetric coefficient matrix over `variables`, row-major.
/// A cell is `None` when fewer than two schools have both values or one side is constant.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<&'static str>,
    pub schools: usize,
    pub coefficients: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCorrelation {
    pub school_type: SchoolType,
    pub matrix: CorrelationMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictCorrelation {
    pub district: String,
    pub schools: usize,
    pub pm10_pm25: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelationReport {
    pub overall: Option<CorrelationMatrix>,
    pub by_school_type: Vec<TypeCorrelation>,
    /// Highest coefficient first.
    pub pm10_pm25_by_district: Vec<DistrictCorrelation>,
}

/// Pearson coefficient of `x` and `y` over the schools that have both.
pub fn correlate(x: Variable, y: Variable, schools: &[&SchoolAssessment]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = schools
        .iter()
        .filter_map(|s| Some((x.value(s)?, y.value(s)?)))
        .collect();
    pearson(&pairs)
}

/// Variables with at least [`MIN_VARIABLE_SAMPLES`] observations, in [`Variable::ALL`] order.
pub fn usable_variables(assessments: &[SchoolAssessment]) -> Vec<Variable> {
    Variable::ALL
        .into_iter()
        .filter(|v| {
            assessments.iter().filter(|a| v.value(a).is_some()).count() >= MIN_VARIABLE_SAMPLES
        })
        .collect()
}

pub fn correlation_matrix(
    schools: &[&SchoolAssessment],
    variables: &[Variable],
) -> CorrelationMatrix {
    let coefficients = variables
        .iter()
        .map(|&x| {
            variables
                .iter()
                .map(|&y| correlate(x, y, schools))
                .collect()
        })
        .collect();

    CorrelationMatrix {
        variables: variables.iter().map(|v| v.label()).collect(),
        schools: schools.len(),
        coefficients,
    }
}

fn by_coefficient_desc(a: &DistrictCorrelation, b: &DistrictCorrelation) -> Ordering {
    match (a.pm10_pm25, b.pm10_pm25) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Table-wide matrix, per-type matrices, and the per-district PM10 / PM2.5 coefficient.
pub fn analyze_correlations(assessments: &[SchoolAssessment]) -> CorrelationReport {
    let variables = usable_variables(assessments);
    if variables.len() < MIN_VARIABLES {
        debug!(
            usable = variables.len(),
            "Too few variables with enough data for correlation"
        );
        return CorrelationReport::default();
    }

    let all: Vec<&SchoolAssessment> = assessments.iter().collect();
    let overall = correlation_matrix(&all, &variables);

    let mut types: BTreeMap<SchoolType, Vec<&SchoolAssessment>> = BTreeMap::new();
    let mut districts: BTreeMap<&str, Vec<&SchoolAssessment>> = BTreeMap::new();
    for assessment in assessments {
        if assessment.school_type != SchoolType::Unknown {
            types.entry(assessment.school_type).or_default().push(assessment);
        }
        if let Some(district) = assessment.district.as_deref() {
            districts.entry(district).or_default().push(assessment);
        }
    }

    types.retain(|_, schools| schools.len() >= MIN_TYPE_SCHOOLS);
    let by_school_type = if types.len() >= 2 {
        types
            .into_iter()
            .map(|(school_type, schools)| TypeCorrelation {
                school_type,
                matrix: correlation_matrix(&schools, &variables),
            })
            .collect()
    } else {
        Vec::new()
    };

    let pm10 = Variable::Reading(Measurement::Pm10Classroom);
    let pm25 = Variable::Reading(Measurement::Pm25);
    districts.retain(|_, schools| schools.len() >= MIN_DISTRICT_SCHOOLS);

    let mut pm10_pm25_by_district = Vec::new();
    if variables.contains(&pm10) && variables.contains(&pm25) && districts.len() >= MIN_DISTRICTS
    {
        pm10_pm25_by_district = districts
            .into_iter()
            .map(|(district, schools)| DistrictCorrelation {
                district: district.to_string(),
                schools: schools.len(),
                pm10_pm25: correlate(pm10, pm25, &schools),
            })
            .collect();
        pm10_pm25_by_district.sort_by(by_coefficient_desc);
    }

    CorrelationReport {
        overall: Some(overall),
        by_school_type,
        pm10_pm25_by_district,
    }
}
