use approx::assert_relative_eq;
use school_air_rater::analyzers::aggregate::assess_all;
use school_air_rater::analyzers::analyzer::{ASSESSMENTS_FILE, RECOMMENDATIONS_FILE, analyze, assess_file, rollup};
use school_air_rater::analyzers::reading::ReconcileStrategy;
use school_air_rater::analyzers::recommend::Recommendation;
use school_air_rater::analyzers::rollup::RollupOptions;
use school_air_rater::analyzers::types::{CompositeGrade, Measurement, PollutantGrade, Suitability};
use school_air_rater::config::ColumnMap;
use school_air_rater::output::{write_assessments, write_recommendations};
use school_air_rater::parser::{TableError, load_records, read_records};
use school_air_rater::record::SchoolType;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_inspections.csv")
}

fn assess(strategy: ReconcileStrategy) -> (Vec<school_air_rater::analyzers::types::SchoolAssessment>, Vec<Recommendation>) {
    assess_file(&fixture(), &ColumnMap::default(), strategy).expect("fixture should load")
}

#[test]
fn test_full_pipeline() {
    let (assessments, recommendations) = assess(ReconcileStrategy::Conservative);

    assert_eq!(assessments.len(), 6);
    assert_eq!(recommendations.len(), 6);
    let codes: Vec<&str> = assessments.iter().map(|a| a.school_code.as_str()).collect();
    assert_eq!(codes, vec!["B001", "B002", "B003", "B004", "B005", "B006"]);

    // Worked example: PM10 80, PM2.5 30, CO2 1200, CO 1, NO2 0.02, O3 0.02
    let first = &assessments[0];
    assert_eq!(first.reading(Measurement::Pm10Classroom).grade, PollutantGrade::Bad);
    assert_eq!(first.reading(Measurement::Pm25).grade, PollutantGrade::ModerateCaution);
    assert_eq!(first.reading(Measurement::Co2).grade, PollutantGrade::Caution);
    assert_eq!(first.reading(Measurement::Pm10Gym).suitability, Suitability::NoData);
    assert_eq!(first.observed_items, 6);
    assert_relative_eq!(first.composite_score, 2.8, epsilon = 1e-9);
    assert_eq!(first.composite_grade, CompositeGrade::Good);
    assert_eq!(first.non_compliance_count, 0);
    assert_eq!(first.school_type, SchoolType::Elementary);
    assert_eq!(first.district.as_deref(), Some("강남구"));

    let messages = &recommendations[0].messages;
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("Classroom PM10 at 80.0"));
    assert!(messages[1].starts_with("PM2.5 at 30.0"));
    assert!(messages[2].starts_with("CO2 at 1200 ppm is at caution level"));
}

#[test]
fn test_insufficient_data_schools() {
    let (assessments, recommendations) = assess(ReconcileStrategy::Conservative);

    let sparse = &assessments[1];
    assert_eq!(sparse.observed_items, 2);
    assert_eq!(sparse.composite_score, 0.0);
    assert_eq!(sparse.composite_grade, CompositeGrade::InsufficientData);
    assert_eq!(sparse.non_compliance_count, 0);
    assert!(recommendations[1].messages.is_empty());

    // Unparseable readings are absent, but the non-compliant flag still counts
    let unreadable = &assessments[4];
    assert_eq!(unreadable.reading(Measurement::Pm10Classroom).value, None);
    assert_eq!(unreadable.reading(Measurement::Co2).score, 0);
    assert_eq!(unreadable.observed_items, 1);
    assert_eq!(unreadable.composite_grade, CompositeGrade::InsufficientData);
    assert_eq!(unreadable.non_compliance_count, 1);
    // Non-Seoul address; the region column is not consulted when addresses exist
    assert_eq!(unreadable.district, None);
    assert_eq!(recommendations[4].messages.len(), 1);
}

#[test]
fn test_hazardous_school_gets_every_rule() {
    let (assessments, recommendations) = assess(ReconcileStrategy::Conservative);

    let worst = &assessments[2];
    assert_eq!(worst.reading(Measurement::Pm10Classroom).value, Some(170.0));
    assert_eq!(worst.observed_items, 3);
    assert_eq!(worst.composite_grade, CompositeGrade::Hazardous);
    assert_eq!(worst.non_compliance_count, 4);

    let messages = &recommendations[2].messages;
    assert_eq!(messages.len(), 5);
    assert!(messages[0].contains("170.0"));
    assert!(messages[1].contains("80.0"));
    assert!(messages[2].contains("1600"));
    assert!(messages[3].contains("'hazardous'"));
    assert!(messages[4].starts_with("4 item(s)"));

    let best = &assessments[3];
    assert_relative_eq!(best.composite_score, 1.0, epsilon = 1e-9);
    assert_eq!(best.composite_grade, CompositeGrade::VeryGood);
    assert!(recommendations[3].messages.is_empty());
}

#[test]
fn test_strategy_changes_representative_value() {
    let (conservative, conservative_recs) = assess(ReconcileStrategy::Conservative);
    let (average, average_recs) = assess(ReconcileStrategy::Average);

    let c = conservative[5].reading(Measurement::Pm10Classroom);
    let a = average[5].reading(Measurement::Pm10Classroom);
    assert_eq!(c.value, Some(60.0));
    assert_eq!(c.grade, PollutantGrade::ModerateCaution);
    assert_eq!(a.value, Some(50.0));
    assert_eq!(a.grade, PollutantGrade::ModerateSafe);

    assert_eq!(conservative_recs[5].messages.len(), 1);
    assert!(average_recs[5].messages.is_empty());
}

#[test]
fn test_pipeline_is_idempotent() {
    let render = || {
        let records = load_records(&fixture(), &ColumnMap::default()).unwrap();
        let assessments = assess_all(&records, ReconcileStrategy::Conservative);
        let recommendations: Vec<Recommendation> =
            assessments.iter().map(Recommendation::for_assessment).collect();

        let mut table = Vec::new();
        write_assessments(&mut table, &assessments, &recommendations).unwrap();
        write_recommendations(&mut table, &recommendations).unwrap();
        table
    };

    assert_eq!(render(), render());
}

#[test]
fn test_analyze_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let summary = analyze(
        &fixture(),
        dir.path(),
        &ColumnMap::default(),
        ReconcileStrategy::Conservative,
        false,
    )
    .unwrap();

    assert_eq!(summary.schools, 6);
    assert_eq!(summary.grade_counts["insufficient data"], 2);
    assert_eq!(summary.assessments_path, dir.path().join(ASSESSMENTS_FILE));
    assert_eq!(summary.recommendations_path, dir.path().join(RECOMMENDATIONS_FILE));

    let assessments = fs::read_to_string(&summary.assessments_path).unwrap();
    assert_eq!(assessments.lines().count(), 7);

    // 3 + 0 + 5 + 0 + 1 + 1 messages plus the header
    let recommendations = fs::read_to_string(&summary.recommendations_path).unwrap();
    assert_eq!(recommendations.lines().count(), 11);
}

#[test]
fn test_analyze_gzip_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let summary = analyze(
        &fixture(),
        dir.path(),
        &ColumnMap::default(),
        ReconcileStrategy::Conservative,
        true,
    )
    .unwrap();

    assert!(summary.assessments_path.to_string_lossy().ends_with(".csv.gz"));
    assert!(summary.recommendations_path.to_string_lossy().ends_with(".csv.gz"));

    let decode = |path: &Path| {
        let mut text = String::new();
        GzDecoder::new(fs::File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    };
    assert_eq!(decode(&summary.assessments_path).lines().count(), 7);
    assert_eq!(decode(&summary.recommendations_path).lines().count(), 11);
}

#[test]
fn test_rollup_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("rollups.json");
    let options = RollupOptions {
        min_district_schools: 2,
        min_type_schools: 2,
        min_period_schools: 2,
    };

    let report = rollup(
        &fixture(),
        &output,
        &ColumnMap::default(),
        ReconcileStrategy::Conservative,
        options,
    )
    .unwrap();

    assert_eq!(report.school_count, 6);
    let districts: Vec<&str> = report.by_district.iter().map(|g| g.key.as_str()).collect();
    // 강남구 has three schools, 마포구 and 종로구 one each, B005 none
    assert_eq!(districts, vec!["강남구"]);

    let gangnam = report.by_district.iter().find(|g| g.key == "강남구").unwrap();
    assert_eq!(gangnam.school_count, 3);
    assert_eq!(gangnam.scored_schools, 2);
    assert_relative_eq!(gangnam.composite_mean, (2.8 + 1.0) / 2.0, epsilon = 1e-9);

    let periods: Vec<&str> = report.by_period.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(periods.len(), 2);

    // Too few schools for any correlation
    assert!(report.correlations.overall.is_none());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["school_count"], 6);
    assert_eq!(written["issues"]["worst_districts"][0]["district"], "강남구");
    assert_eq!(written["issues"]["top_pm10"][0]["district"], "강남구");
}

#[test]
fn test_missing_identifier_column_fails_fast() {
    let csv = "SCHUL_NM,MNUT_DST_RSLT_NMVL\n학교,40\n";
    let err = read_records(csv.as_bytes(), &ColumnMap::default()).unwrap_err();
    assert!(matches!(err, TableError::MissingColumn(_)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    fs::write(&path, csv).unwrap();
    let err = assess_file(&path, &ColumnMap::default(), ReconcileStrategy::Conservative)
        .unwrap_err();
    assert!(err.downcast_ref::<TableError>().is_some());
}

#[test]
fn test_custom_column_map() {
    let columns = ColumnMap::from_json(
        r#"{"school_code": "id", "school_name": "name",
            "measurements": {"CO2": {"reading": "co2", "flag": "co2_ok"}}}"#,
    )
    .unwrap();

    let csv = "id,name,co2,co2_ok\nX1,Test,1700,부적합\n";
    let records = read_records(csv.as_bytes(), &columns).unwrap();
    let assessments = assess_all(&records, ReconcileStrategy::Conservative);

    let co2 = assessments[0].reading(Measurement::Co2);
    assert_eq!(co2.grade, PollutantGrade::Bad);
    assert_eq!(co2.suitability, Suitability::NonCompliant);
    assert_eq!(assessments[0].composite_grade, CompositeGrade::InsufficientData);
}
