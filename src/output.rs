//! Output formatting and persistence for assessments.
//!
//! Writes the per-school assessment table and the exploded recommendation
//! table as CSV (optionally gzip-compressed) and reports as pretty JSON.

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::recommend::Recommendation;
use crate::analyzers::types::{Measurement, SchoolAssessment};

/// Separator used when all recommendations of a school share one CSV cell.
pub const RECOMMENDATION_SEPARATOR: &str = " | ";

/// Header row of the assessment table.
pub fn assessment_headers() -> Vec<String> {
    let mut headers: Vec<String> = [
        "school_code",
        "school_name",
        "school_type",
        "district",
        "period",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    for m in Measurement::ALL {
        let label = m.label();
        headers.push(format!("{label}_value"));
        headers.push(format!("{label}_grade"));
        headers.push(format!("{label}_score"));
        headers.push(format!("{label}_suitability"));
    }

    headers.extend(
        [
            "observed_items",
            "composite_score",
            "composite_grade",
            "non_compliance_count",
            "recommendations",
        ]
        .iter()
        .map(|h| h.to_string()),
    );
    headers
}

fn assessment_row(assessment: &SchoolAssessment, recommendation: &Recommendation) -> Vec<String> {
    let mut row = vec![
        assessment.school_code.clone(),
        assessment.school_name.clone(),
        assessment.school_type.to_string(),
        assessment.district.clone().unwrap_or_default(),
        assessment.period.clone().unwrap_or_default(),
    ];

    for reading in &assessment.readings {
        row.push(reading.value.map(|v| v.to_string()).unwrap_or_default());
        row.push(reading.grade.to_string());
        row.push(reading.score.to_string());
        row.push(reading.suitability.to_string());
    }

    row.push(assessment.observed_items.to_string());
    row.push(format!("{:.4}", assessment.composite_score));
    row.push(assessment.composite_grade.to_string());
    row.push(assessment.non_compliance_count.to_string());
    row.push(recommendation.messages.join(RECOMMENDATION_SEPARATOR));
    row
}

/// Writes one row per school to `writer`.
pub fn write_assessments<W: Write>(
    writer: W,
    assessments: &[SchoolAssessment],
    recommendations: &[Recommendation],
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(assessment_headers())?;

    for (assessment, recommendation) in assessments.iter().zip(recommendations) {
        wtr.write_record(assessment_row(assessment, recommendation))?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct RecommendationRow<'a> {
    school_code: &'a str,
    school_name: &'a str,
    rank: usize,
    recommendation: &'a str,
}

/// Writes the exploded recommendation table: one row per message, ranked in rule order.
pub fn write_recommendations<W: Write>(writer: W, recommendations: &[Recommendation]) -> Result<()> {
    // Header written up front so a table with no messages is still well-formed
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(["school_code", "school_name", "rank", "recommendation"])?;

    for rec in recommendations {
        for (i, message) in rec.messages.iter().enumerate() {
            wtr.serialize(RecommendationRow {
                school_code: &rec.school_code,
                school_name: &rec.school_name,
                rank: i + 1,
                recommendation: message,
            })?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// An output file, plain or gzip-compressed.
///
/// Must be closed with [`OutputWriter::finish`]; dropping it loses any error
/// from the final flush or the gzip trailer.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gzip(w) => w.flush(),
        }
    }
}

impl OutputWriter {
    /// Flushes buffered data and, when compressing, writes the gzip trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut w) => w.flush(),
            OutputWriter::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

/// Creates `path` for writing, wrapped in a gzip encoder when `gzip` is set.
/// Returns the writer and the final path (`.gz` appended when compressing).
pub fn create_output(path: &Path, gzip: bool) -> Result<(OutputWriter, PathBuf)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let final_path = if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };

    let file = File::create(&final_path)
        .with_context(|| format!("creating {}", final_path.display()))?;
    let writer = if gzip {
        OutputWriter::Gzip(GzEncoder::new(BufWriter::new(file), Compression::default()))
    } else {
        OutputWriter::Plain(BufWriter::new(file))
    };

    debug!(path = %final_path.display(), gzip, "Output opened");
    Ok((writer, final_path))
}

/// Writes `value` as pretty-printed JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let (mut writer, final_path) = create_output(path, false)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer
        .finish()
        .with_context(|| format!("closing {}", final_path.display()))?;
    info!(path = %final_path.display(), "JSON report written");
    Ok(())
}
