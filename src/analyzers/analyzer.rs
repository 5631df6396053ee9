use crate::analyzers::aggregate::assess_all;
use crate::analyzers::reading::ReconcileStrategy;
use crate::analyzers::recommend::Recommendation;
use crate::analyzers::rollup::{RollupOptions, RollupReport, build_rollups};
use crate::analyzers::types::SchoolAssessment;
use crate::config::ColumnMap;
use crate::output::{create_output, write_assessments, write_json, write_recommendations};
use crate::parser::load_records;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the per-school assessment table inside the output directory.
pub const ASSESSMENTS_FILE: &str = "assessments.csv";
/// File name of the exploded recommendation table inside the output directory.
pub const RECOMMENDATIONS_FILE: &str = "recommendations.csv";

/// What an `assess` run produced.
#[derive(Debug)]
pub struct AssessmentSummary {
    pub schools: usize,
    pub grade_counts: BTreeMap<String, usize>,
    pub assessments_path: PathBuf,
    pub recommendations_path: PathBuf,
}

/// Loads an inspection table and runs the evaluate → score → recommend pipeline.
pub fn assess_file(
    input: &Path,
    columns: &ColumnMap,
    strategy: ReconcileStrategy,
) -> Result<(Vec<SchoolAssessment>, Vec<Recommendation>)> {
    let records = load_records(input, columns)
        .with_context(|| format!("loading inspection table {}", input.display()))?;

    if records.is_empty() {
        warn!(path = %input.display(), "Inspection table has no rows");
    }

    let assessments = assess_all(&records, strategy);
    let recommendations = assessments
        .iter()
        .map(Recommendation::for_assessment)
        .collect();

    Ok((assessments, recommendations))
}

/// Assesses every school in `input` and writes the assessment and
/// recommendation tables into `output_dir`.
#[tracing::instrument(skip_all, fields(input = %input.display(), output_dir = %output_dir.display()))]
pub fn analyze(
    input: &Path,
    output_dir: &Path,
    columns: &ColumnMap,
    strategy: ReconcileStrategy,
    gzip: bool,
) -> Result<AssessmentSummary> {
    let (assessments, recommendations) = assess_file(input, columns, strategy)?;

    let (mut writer, assessments_path) =
        create_output(&output_dir.join(ASSESSMENTS_FILE), gzip)?;
    write_assessments(&mut writer, &assessments, &recommendations)?;
    writer
        .finish()
        .with_context(|| format!("closing {}", assessments_path.display()))?;

    let (mut writer, recommendations_path) =
        create_output(&output_dir.join(RECOMMENDATIONS_FILE), gzip)?;
    write_recommendations(&mut writer, &recommendations)?;
    writer
        .finish()
        .with_context(|| format!("closing {}", recommendations_path.display()))?;

    let mut grade_counts = BTreeMap::new();
    for assessment in &assessments {
        *grade_counts
            .entry(assessment.composite_grade.to_string())
            .or_insert(0) += 1;
    }

    let with_recommendations = recommendations
        .iter()
        .filter(|r| !r.messages.is_empty())
        .count();

    info!(
        schools = assessments.len(),
        with_recommendations,
        strategy = %strategy,
        "Assessment complete"
    );

    Ok(AssessmentSummary {
        schools: assessments.len(),
        grade_counts,
        assessments_path,
        recommendations_path,
    })
}

/// Assesses `input` and writes the district, school-type and period rollups to `output` as JSON.
#[tracing::instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn rollup(
    input: &Path,
    output: &Path,
    columns: &ColumnMap,
    strategy: ReconcileStrategy,
    options: RollupOptions,
) -> Result<RollupReport> {
    let (assessments, _) = assess_file(input, columns, strategy)?;
    let report = build_rollups(&assessments, options);

    write_json(output, &report)?;

    info!(
        districts = report.by_district.len(),
        school_types = report.by_school_type.len(),
        periods = report.by_period.len(),
        "Rollups written"
    );

    Ok(report)
}
