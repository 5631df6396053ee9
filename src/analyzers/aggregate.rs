use crate::analyzers::grade::evaluate_measurement;
use crate::analyzers::reading::ReconcileStrategy;
use crate::analyzers::types::{
    CompositeGrade, CompositeScore, Measurement, PollutantReading, SchoolAssessment, Suitability,
};
use crate::record::RawRecord;
use rayon::prelude::*;
use tracing::debug;

/// Weights of each scored measurement in the composite.
/// Particulates count the most; the weights of the present items are renormalized.
pub static WEIGHTS: &[(Measurement, f64)] = &[
    (Measurement::Pm10Classroom, 0.25),
    (Measurement::Pm25, 0.25),
    (Measurement::Co2, 0.15),
    (Measurement::Co, 0.10),
    (Measurement::No2, 0.10),
    (Measurement::O3, 0.15),
];

/// A composite is only computed when at least this many scored measurements have data.
pub const MIN_OBSERVED_ITEMS: usize = 3;

/// Maps a computed composite score to its grade.
///
/// | Range       | Grade     |
/// |-------------|-----------|
/// | < 2         | very good |
/// | < 3         | good      |
/// | < 4         | moderate  |
/// | < 5         | caution   |
/// | >= 5        | hazardous |
pub fn composite_grade(score: f64) -> CompositeGrade {
    match score {
        s if s < 2.0 => CompositeGrade::VeryGood,
        s if s < 3.0 => CompositeGrade::Good,
        s if s < 4.0 => CompositeGrade::Moderate,
        s if s < 5.0 => CompositeGrade::Caution,
        _ => CompositeGrade::Hazardous,
    }
}

/// Combines the seven readings of a school into a weighted composite score.
///
/// Only measurements with a non-zero score take part, and below
/// [`MIN_OBSERVED_ITEMS`] the school is graded as insufficient data with a
/// score of 0.
pub fn score_school(readings: &[PollutantReading; 7]) -> CompositeScore {
    let non_compliance_count = readings
        .iter()
        .filter(|r| r.suitability == Suitability::NonCompliant)
        .count();

    let observed_items = Measurement::SCORED
        .iter()
        .filter(|m| readings[m.index()].score > 0)
        .count();

    if observed_items < MIN_OBSERVED_ITEMS {
        return CompositeScore {
            observed_items,
            score: 0.0,
            grade: CompositeGrade::InsufficientData,
            non_compliance_count,
        };
    }

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for &(measurement, weight) in WEIGHTS {
        let score = readings[measurement.index()].score;
        if score > 0 {
            weighted_sum += f64::from(score) * weight;
            weight_sum += weight;
        }
    }

    let score = weighted_sum / weight_sum;

    CompositeScore {
        observed_items,
        score,
        grade: composite_grade(score),
        non_compliance_count,
    }
}

/// Evaluates every measurement of one record and scores the school.
pub fn assess_record(record: &RawRecord, strategy: ReconcileStrategy) -> SchoolAssessment {
    let readings = Measurement::ALL.map(|m| evaluate_measurement(record, m, strategy));
    let composite = score_school(&readings);

    debug!(
        school_code = %record.school_code,
        observed = composite.observed_items,
        score = composite.score,
        grade = %composite.grade,
        "School assessed"
    );

    SchoolAssessment {
        school_code: record.school_code.clone(),
        school_name: record.school_name.clone(),
        school_type: record.school_type(),
        district: record.district(),
        period: record.period.clone(),
        readings,
        observed_items: composite.observed_items,
        composite_score: composite.score,
        composite_grade: composite.grade,
        non_compliance_count: composite.non_compliance_count,
    }
}

/// Assesses a whole table. Schools are independent, so the map runs in
/// parallel; the output keeps the input order.
pub fn assess_all(records: &[RawRecord], strategy: ReconcileStrategy) -> Vec<SchoolAssessment> {
    records
        .par_iter()
        .map(|record| assess_record(record, strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::PollutantGrade;
    use approx::assert_relative_eq;

    fn with_scores(scores: [u8; 7]) -> [PollutantReading; 7] {
        scores.map(|score| PollutantReading {
            value: (score > 0).then_some(1.0),
            grade: if score > 0 {
                PollutantGrade::Good
            } else {
                PollutantGrade::NoData
            },
            score,
            suitability: Suitability::NoData,
        })
    }

    fn sample_record() -> RawRecord {
        RawRecord::new("B000001", "Sample Elementary")
            .with_readings(Measurement::Pm10Classroom, [Some("80"), None, None])
            .with_readings(Measurement::Pm25, [Some("30"), None, None])
            .with_readings(Measurement::Co2, [Some("1200"), None, None])
            .with_readings(Measurement::Co, [Some("1"), None, None])
            .with_readings(Measurement::No2, [Some("0.02"), None, None])
            .with_readings(Measurement::O3, [Some("0.02"), None, None])
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        assert!(!WEIGHTS.iter().any(|(m, _)| *m == Measurement::Pm10Gym));
    }

    #[test]
    fn test_composite_grade_boundaries() {
        assert_eq!(composite_grade(1.0), CompositeGrade::VeryGood);
        assert_eq!(composite_grade(1.99), CompositeGrade::VeryGood);
        assert_eq!(composite_grade(2.0), CompositeGrade::Good);
        assert_eq!(composite_grade(3.0), CompositeGrade::Moderate);
        assert_eq!(composite_grade(4.0), CompositeGrade::Caution);
        assert_eq!(composite_grade(4.99), CompositeGrade::Caution);
        assert_eq!(composite_grade(5.0), CompositeGrade::Hazardous);
        assert_eq!(composite_grade(6.0), CompositeGrade::Hazardous);
    }

    #[test]
    fn test_worked_example() {
        let mut record = sample_record();
        for m in Measurement::ALL {
            record = record.with_flag(m, "적합");
        }

        let assessment = assess_record(&record, ReconcileStrategy::Conservative);
        let scores: Vec<u8> = Measurement::SCORED
            .iter()
            .map(|m| assessment.reading(*m).score)
            .collect();

        // 80 μg/m³ falls in the 75-150 PM10 band, 1200 ppm in the 1000-1500 CO2 band
        assert_eq!(scores, vec![5, 3, 3, 1, 1, 1]);
        assert_eq!(assessment.observed_items, 6);
        assert_relative_eq!(assessment.composite_score, 2.8, epsilon = 1e-9);
        assert_eq!(assessment.composite_grade, CompositeGrade::Good);
        assert_eq!(assessment.non_compliance_count, 0);
    }

    #[test]
    fn test_insufficient_data_regardless_of_severity() {
        // Two extreme scores plus gym PM10, which is not a scored item
        let composite = score_school(&with_scores([6, 6, 6, 0, 0, 0, 0]));
        assert_eq!(composite.observed_items, 2);
        assert_eq!(composite.score, 0.0);
        assert_eq!(composite.grade, CompositeGrade::InsufficientData);

        let empty = score_school(&with_scores([0; 7]));
        assert_eq!(empty.observed_items, 0);
        assert_eq!(empty.grade, CompositeGrade::InsufficientData);
    }

    #[test]
    fn test_weights_renormalize_over_present_items() {
        // PM10 6 (0.25), PM2.5 absent, CO2 4 (0.15), CO 1 (0.10), rest absent
        let composite = score_school(&with_scores([6, 0, 0, 4, 1, 0, 0]));
        assert_eq!(composite.observed_items, 3);
        let expected = (6.0 * 0.25 + 4.0 * 0.15 + 1.0 * 0.10) / (0.25 + 0.15 + 0.10);
        assert_relative_eq!(composite.score, expected, epsilon = 1e-12);
        assert_relative_eq!(composite.score, 4.4, epsilon = 1e-9);
        assert_eq!(composite.grade, CompositeGrade::Caution);
    }

    #[test]
    fn test_composite_stays_within_score_range() {
        for low in 1..=4u8 {
            for high in low..=6u8 {
                let scores = [high, 0, low, low.min(4), low, high.min(4), low];
                let composite = score_school(&with_scores(scores));
                assert!(composite.score >= 1.0 && composite.score <= 6.0);
            }
        }
    }

    #[test]
    fn test_non_compliance_counts_only_non_compliant() {
        let mut readings = with_scores([1; 7]);
        readings[Measurement::Pm10Gym.index()].suitability = Suitability::NonCompliant;
        readings[Measurement::Co.index()].suitability = Suitability::NonCompliant;
        readings[Measurement::O3.index()].suitability = Suitability::Compliant;

        let composite = score_school(&readings);
        assert_eq!(composite.non_compliance_count, 2);
    }

    #[test]
    fn test_assess_all_preserves_order_and_count() {
        let records: Vec<RawRecord> = (0..50)
            .map(|i| RawRecord::new(format!("S{i:03}"), format!("School {i}")))
            .collect();

        let assessments = assess_all(&records, ReconcileStrategy::Conservative);
        assert_eq!(assessments.len(), records.len());
        for (record, assessment) in records.iter().zip(&assessments) {
            assert_eq!(record.school_code, assessment.school_code);
            assert_eq!(assessment.composite_grade, CompositeGrade::InsufficientData);
        }
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let records = vec![sample_record(), RawRecord::new("X", "Empty")];
        let first = assess_all(&records, ReconcileStrategy::Conservative);
        let second = assess_all(&records, ReconcileStrategy::Conservative);
        assert_eq!(first, second);
    }
}
