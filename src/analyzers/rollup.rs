//! District, school-type and period rollups over the assessment table.
//!
//! Rollups are plain descriptive statistics; every decision was already made
//! per school by the scorer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::correlation::{CorrelationReport, analyze_correlations};
use crate::analyzers::types::{CompositeGrade, Measurement, SchoolAssessment, Suitability};
use crate::analyzers::utility::{max, mean, median, stddev};
use crate::record::SchoolType;

/// Districts listed in the worst/best rankings and the issue summary.
pub const RANKED_DISTRICTS: usize = 5;
/// Districts listed per pollutant in the issue summary.
pub const TOP_DISTRICTS: usize = 3;
/// Periods that must reach the minimum size before periods are compared.
pub const MIN_COMPARED_PERIODS: usize = 2;

/// Minimum group sizes below which a group is left out of the report.
#[derive(Debug, Clone, Copy)]
pub struct RollupOptions {
    pub min_district_schools: usize,
    pub min_type_schools: usize,
    pub min_period_schools: usize,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            min_district_schools: 3,
            min_type_schools: 5,
            min_period_schools: 10,
        }
    }
}

/// Mean, median and maximum of one measured concentration across a group.
#[derive(Debug, Clone, Serialize)]
pub struct ValueSummary {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub samples: usize,
}

impl ValueSummary {
    fn from_values(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            median: median(values),
            max: max(values),
            samples: values.len(),
        }
    }
}

/// Statistics for one group of schools.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub school_count: usize,
    /// Schools whose composite was actually computed.
    pub scored_schools: usize,
    pub composite_mean: f64,
    pub composite_median: f64,
    pub composite_stddev: f64,
    pub pm10: ValueSummary,
    pub pm25: ValueSummary,
    pub co2: ValueSummary,
    pub non_compliance_mean: f64,
    pub non_compliance_total: usize,
    /// Share of each composite grade in percent.
    pub grade_distribution: BTreeMap<String, f64>,
}

/// Non-compliance rate of one measurement within one school type.
#[derive(Debug, Clone, Serialize)]
pub struct NonComplianceRate {
    pub school_type: SchoolType,
    pub measurement: Measurement,
    pub inspected: usize,
    pub non_compliant: usize,
    pub rate_percent: f64,
}

/// One of the worst districts, with how far it sits above the city.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictIssue {
    pub district: String,
    pub composite_mean: f64,
    /// Composite mean minus the mean over all scored districts; positive is worse.
    pub above_city_mean: f64,
    pub pm10: ValueSummary,
    pub pm25: ValueSummary,
    pub co2: ValueSummary,
    pub non_compliance_mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcentrationRank {
    pub district: String,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NonComplianceRank {
    pub district: String,
    pub mean: f64,
    pub total: usize,
}

/// Districts that stand out, for a quick read of where to act first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueSummary {
    pub city_composite_mean: f64,
    pub worst_districts: Vec<DistrictIssue>,
    pub top_pm10: Vec<ConcentrationRank>,
    pub top_pm25: Vec<ConcentrationRank>,
    pub top_co2: Vec<ConcentrationRank>,
    pub top_non_compliance: Vec<NonComplianceRank>,
}

/// Full rollup report, written as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RollupReport {
    pub generated_at: DateTime<Utc>,
    pub school_count: usize,
    pub by_district: Vec<GroupSummary>,
    pub by_school_type: Vec<GroupSummary>,
    /// Empty unless at least [`MIN_COMPARED_PERIODS`] periods reach the minimum size.
    pub by_period: Vec<GroupSummary>,
    pub worst_districts: Vec<String>,
    pub best_districts: Vec<String>,
    pub issues: IssueSummary,
    pub non_compliance_by_type: Vec<NonComplianceRate>,
    pub correlations: CorrelationReport,
}

/// Summarizes one group of assessments under `key`.
pub fn summarize_group(key: &str, schools: &[&SchoolAssessment]) -> GroupSummary {
    let composites: Vec<f64> = schools
        .iter()
        .filter(|s| s.has_composite())
        .map(|s| s.composite_score)
        .collect();
    let composite_mean = mean(&composites);

    let values = |m: Measurement| -> Vec<f64> {
        schools.iter().filter_map(|s| s.reading(m).value).collect()
    };

    let non_compliance: Vec<f64> = schools
        .iter()
        .map(|s| s.non_compliance_count as f64)
        .collect();

    let mut grade_distribution = BTreeMap::new();
    if !schools.is_empty() {
        for grade in CompositeGrade::ALL {
            let count = schools.iter().filter(|s| s.composite_grade == grade).count();
            if count > 0 {
                grade_distribution.insert(
                    grade.label().to_string(),
                    count as f64 * 100.0 / schools.len() as f64,
                );
            }
        }
    }

    GroupSummary {
        key: key.to_string(),
        school_count: schools.len(),
        scored_schools: composites.len(),
        composite_mean,
        composite_median: median(&composites),
        composite_stddev: stddev(&composites, composite_mean),
        pm10: ValueSummary::from_values(&values(Measurement::Pm10Classroom)),
        pm25: ValueSummary::from_values(&values(Measurement::Pm25)),
        co2: ValueSummary::from_values(&values(Measurement::Co2)),
        non_compliance_mean: mean(&non_compliance),
        non_compliance_total: schools.iter().map(|s| s.non_compliance_count).sum(),
        grade_distribution,
    }
}

/// Groups by `key_fn`, skipping `None` keys and groups smaller than `min_schools`.
/// Results are sorted by mean composite score, worst first.
pub fn group_by<F>(
    assessments: &[SchoolAssessment],
    min_schools: usize,
    key_fn: F,
) -> Vec<GroupSummary>
where
    F: Fn(&SchoolAssessment) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<&SchoolAssessment>> = BTreeMap::new();
    for assessment in assessments {
        if let Some(key) = key_fn(assessment) {
            groups.entry(key).or_default().push(assessment);
        }
    }

    let mut summaries: Vec<GroupSummary> = groups
        .iter()
        .filter(|(_, schools)| schools.len() >= min_schools)
        .map(|(key, schools)| summarize_group(key, schools))
        .collect();

    summaries.sort_by(|a, b| b.composite_mean.total_cmp(&a.composite_mean));
    summaries
}

/// Per school type and measurement, the share of inspected items judged non-compliant.
pub fn non_compliance_by_type(assessments: &[SchoolAssessment]) -> Vec<NonComplianceRate> {
    let mut counts: BTreeMap<(SchoolType, Measurement), (usize, usize)> = BTreeMap::new();

    for assessment in assessments {
        if assessment.school_type == SchoolType::Unknown {
            continue;
        }
        for measurement in Measurement::ALL {
            let entry = counts
                .entry((assessment.school_type, measurement))
                .or_default();
            match assessment.reading(measurement).suitability {
                Suitability::Compliant => entry.0 += 1,
                Suitability::NonCompliant => {
                    entry.0 += 1;
                    entry.1 += 1;
                }
                Suitability::NoData => {}
            }
        }
    }

    counts
        .into_iter()
        .map(
            |((school_type, measurement), (inspected, non_compliant))| NonComplianceRate {
                school_type,
                measurement,
                inspected,
                non_compliant,
                rate_percent: if inspected == 0 {
                    0.0
                } else {
                    non_compliant as f64 * 100.0 / inspected as f64
                },
            },
        )
        .collect()
}

fn top_by_concentration(
    by_district: &[GroupSummary],
    values: impl Fn(&GroupSummary) -> &ValueSummary,
) -> Vec<ConcentrationRank> {
    let mut measured: Vec<&GroupSummary> = by_district
        .iter()
        .filter(|g| values(*g).samples > 0)
        .collect();
    measured.sort_by(|a, b| values(*b).mean.total_cmp(&values(*a).mean));

    measured
        .into_iter()
        .take(TOP_DISTRICTS)
        .map(|g| ConcentrationRank {
            district: g.key.clone(),
            mean: values(g).mean,
            max: values(g).max,
        })
        .collect()
}

/// Picks out the worst districts and the leaders per pollutant and non-compliance.
/// Expects `by_district` ordered worst first, as [`group_by`] returns it.
pub fn summarize_issues(by_district: &[GroupSummary]) -> IssueSummary {
    let scored: Vec<&GroupSummary> = by_district.iter().filter(|g| g.scored_schools > 0).collect();
    let city_means: Vec<f64> = scored.iter().map(|g| g.composite_mean).collect();
    let city_composite_mean = mean(&city_means);

    let worst_districts = scored
        .iter()
        .take(RANKED_DISTRICTS)
        .map(|g| DistrictIssue {
            district: g.key.clone(),
            composite_mean: g.composite_mean,
            above_city_mean: g.composite_mean - city_composite_mean,
            pm10: g.pm10.clone(),
            pm25: g.pm25.clone(),
            co2: g.co2.clone(),
            non_compliance_mean: g.non_compliance_mean,
        })
        .collect();

    let mut by_non_compliance: Vec<&GroupSummary> = by_district.iter().collect();
    by_non_compliance.sort_by(|a, b| b.non_compliance_mean.total_cmp(&a.non_compliance_mean));
    let top_non_compliance = by_non_compliance
        .into_iter()
        .take(TOP_DISTRICTS)
        .map(|g| NonComplianceRank {
            district: g.key.clone(),
            mean: g.non_compliance_mean,
            total: g.non_compliance_total,
        })
        .collect();

    IssueSummary {
        city_composite_mean,
        worst_districts,
        top_pm10: top_by_concentration(by_district, |g| &g.pm10),
        top_pm25: top_by_concentration(by_district, |g| &g.pm25),
        top_co2: top_by_concentration(by_district, |g| &g.co2),
        top_non_compliance,
    }
}

/// Builds the full rollup report over an assessment table.
pub fn build_rollups(assessments: &[SchoolAssessment], options: RollupOptions) -> RollupReport {
    let by_district = group_by(assessments, options.min_district_schools, |a| {
        a.district.clone()
    });
    let by_school_type = group_by(assessments, options.min_type_schools, |a| {
        (a.school_type != SchoolType::Unknown).then(|| a.school_type.label().to_string())
    });
    let mut by_period = group_by(assessments, options.min_period_schools, |a| {
        a.period.clone().filter(|p| !p.trim().is_empty())
    });
    if by_period.len() < MIN_COMPARED_PERIODS {
        debug!(periods = by_period.len(), "Not enough periods to compare");
        by_period.clear();
    }

    // by_district is already ordered worst first; unscored districts have no rank
    let scored: Vec<&GroupSummary> = by_district.iter().filter(|g| g.scored_schools > 0).collect();
    let worst_districts = scored
        .iter()
        .take(RANKED_DISTRICTS)
        .map(|g| g.key.clone())
        .collect();
    let best_districts = scored
        .iter()
        .rev()
        .take(RANKED_DISTRICTS)
        .map(|g| g.key.clone())
        .collect();
    let issues = summarize_issues(&by_district);

    RollupReport {
        generated_at: Utc::now(),
        school_count: assessments.len(),
        by_district,
        by_school_type,
        by_period,
        worst_districts,
        best_districts,
        issues,
        non_compliance_by_type: non_compliance_by_type(assessments),
        correlations: analyze_correlations(assessments),
    }
}
