//! Source column mapping.
//!
//! Defaults follow the municipal open-data layout. Any subset can be
//! overridden from a JSON file:
//! ```json
//! {
//!   "school_code": "school_id",
//!   "measurements": {
//!     "CO2": { "reading": "co2_ppm", "flag": "co2_ok" }
//!   }
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::analyzers::types::Measurement;

/// Source columns of one measurement. Repeats live at `<reading>_2` and `<reading>_3`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeasurementColumns {
    pub reading: String,
    pub flag: String,
}

impl MeasurementColumns {
    fn new(reading: &str, flag: &str) -> Self {
        Self {
            reading: reading.to_string(),
            flag: flag.to_string(),
        }
    }

    /// Primary, second and third reading column names.
    pub fn reading_columns(&self) -> [String; 3] {
        [
            self.reading.clone(),
            format!("{}_2", self.reading),
            format!("{}_3", self.reading),
        ]
    }
}

/// Maps every logical input field to its source column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub school_code: String,
    pub school_name: String,
    pub school_type: String,
    pub address: String,
    pub region: String,
    pub period: String,
    /// Indexed by [`Measurement::index`].
    pub measurements: [MeasurementColumns; 7],
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            school_code: "SCHUL_CODE".to_string(),
            school_name: "SCHUL_NM".to_string(),
            school_type: "SCHUL_KND_SC_CODE".to_string(),
            address: "SCHUL_ADRES".to_string(),
            region: "ADRCD_NM".to_string(),
            period: "SEM_STR".to_string(),
            measurements: [
                MeasurementColumns::new("MNUT_DST_RSLT_NMVL", "MNUT_DST_STB_YN"),
                MeasurementColumns::new("GMNSM_MNUT_DST_RSLT_NMVL", "GMNSM_MNUT_DST_STB_YN"),
                MeasurementColumns::new("ULTRA_DST_RSLT_NMVL", "ULTRA_DST_STB_YN"),
                MeasurementColumns::new("CO2_RSLT_NMVL", "CO2_STB_YN"),
                MeasurementColumns::new("CO_RSLT_NMVL", "CO_STB_YN"),
                MeasurementColumns::new("NO2_RSLT_NMVL", "NO2_STB_YN"),
                MeasurementColumns::new("O3_RSLT_NMVL", "O3_STB_YN"),
            ],
        }
    }
}

/// On-disk shape of a column override file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnOverrides {
    school_code: Option<String>,
    school_name: Option<String>,
    school_type: Option<String>,
    address: Option<String>,
    region: Option<String>,
    period: Option<String>,
    #[serde(default)]
    measurements: HashMap<String, MeasurementColumns>,
}

impl ColumnMap {
    pub fn measurement(&self, measurement: Measurement) -> &MeasurementColumns {
        &self.measurements[measurement.index()]
    }

    /// Loads the defaults with the overrides from the JSON file at `path` applied.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading column map {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing column map {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let overrides: ColumnOverrides = serde_json::from_str(content)?;
        let mut map = Self::default();

        macro_rules! apply {
            ($($field:ident),*) => {
                $(
                    if let Some(value) = overrides.$field {
                        map.$field = value;
                    }
                )*
            };
        }
        apply!(school_code, school_name, school_type, address, region, period);

        for (label, columns) in overrides.measurements {
            let Some(measurement) = Measurement::ALL.into_iter().find(|m| m.label() == label)
            else {
                bail!("unknown measurement '{label}' in column map");
            };
            map.measurements[measurement.index()] = columns;
        }

        Ok(map)
    }
}
