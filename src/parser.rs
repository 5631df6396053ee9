//! CSV loader for inspection tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, info};

use crate::analyzers::types::Measurement;
use crate::config::ColumnMap;
use crate::record::{DistrictSource, RawMeasurement, RawRecord};

/// A table that cannot be turned into records at all.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("input has no header row")]
    MissingHeader,
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Header positions resolved against a [`ColumnMap`]. Absent optional columns are `None`.
struct ColumnIndex {
    school_code: usize,
    school_name: Option<usize>,
    school_type: Option<usize>,
    address: Option<usize>,
    region: Option<usize>,
    period: Option<usize>,
    readings: [[Option<usize>; 3]; 7],
    flags: [Option<usize>; 7],
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnMap) -> Result<Self, TableError> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim(), i))
            .collect();
        let find = |name: &str| positions.get(name).copied();

        let school_code = find(&columns.school_code)
            .ok_or_else(|| TableError::MissingColumn(columns.school_code.clone()))?;

        let readings = Measurement::ALL.map(|m| {
            columns
                .measurement(m)
                .reading_columns()
                .map(|name| find(&name))
        });
        let flags = Measurement::ALL.map(|m| find(&columns.measurement(m).flag));

        for m in Measurement::ALL {
            if readings[m.index()][0].is_none() {
                debug!(measurement = %m, "Reading column absent; treating as no data");
            }
        }

        Ok(Self {
            school_code,
            school_name: find(&columns.school_name),
            school_type: find(&columns.school_type),
            address: find(&columns.address),
            region: find(&columns.region),
            period: find(&columns.period),
            readings,
            flags,
        })
    }

    fn record(&self, row: &StringRecord) -> RawRecord {
        let cell = |i: Option<usize>| -> Option<String> {
            i.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let school_code = cell(Some(self.school_code)).unwrap_or_default();
        let school_name = cell(self.school_name).unwrap_or_else(|| school_code.clone());

        let measurements = Measurement::ALL.map(|m| RawMeasurement {
            readings: self.readings[m.index()].map(|i| cell(i)),
            flag: cell(self.flags[m.index()]),
        });

        RawRecord {
            school_code,
            school_name,
            school_type_code: cell(self.school_type),
            address: cell(self.address),
            region: cell(self.region),
            period: cell(self.period),
            district_source: if self.address.is_some() {
                DistrictSource::Address
            } else {
                DistrictSource::Region
            },
            measurements,
        }
    }
}

/// Reads every row of a CSV table into [`RawRecord`]s.
///
/// # Errors
///
/// Fails on a missing header row, a missing school identifier column, or a
/// row whose field count differs from the header. Missing or unparseable
/// values inside well-formed rows are never errors.
pub fn read_records<R: Read>(reader: R, columns: &ColumnMap) -> Result<Vec<RawRecord>, TableError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(TableError::MissingHeader);
    }
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(index.record(&row));
    }

    Ok(records)
}

/// Opens `path` and reads it with [`read_records`].
pub fn load_records(path: &Path, columns: &ColumnMap) -> Result<Vec<RawRecord>, TableError> {
    let file = File::open(path).map_err(|source| TableError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let records = read_records(file, columns)?;
    info!(path = %path.display(), rows = records.len(), "Inspection table loaded");
    Ok(records)
}
