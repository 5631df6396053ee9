//! Raw reading parsing and reconciliation of repeated measurements.

use std::fmt;
use std::str::FromStr;

/// How repeated readings of one measurement collapse into a single value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// Highest reading wins.
    #[default]
    Conservative,
    /// Arithmetic mean of the valid readings.
    Average,
}

impl FromStr for ReconcileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" | "max" => Ok(ReconcileStrategy::Conservative),
            "average" | "mean" => Ok(ReconcileStrategy::Average),
            other => Err(format!(
                "unknown strategy '{other}' (expected conservative or average)"
            )),
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::Conservative => f.write_str("conservative"),
            ReconcileStrategy::Average => f.write_str("average"),
        }
    }
}

/// Parses one raw reading. Empty, unparseable and non-finite text is absent.
pub fn parse_reading(raw: Option<&str>) -> Option<f64> {
    let value: f64 = raw?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Collapses up to three raw readings into one representative value.
///
/// Unusable entries are dropped rather than read as zero; `None` means no
/// reading survived.
pub fn reconcile_multi_reading(
    primary: Option<&str>,
    secondary: Option<&str>,
    tertiary: Option<&str>,
    strategy: ReconcileStrategy,
) -> Option<f64> {
    let values: Vec<f64> = [primary, secondary, tertiary]
        .into_iter()
        .filter_map(parse_reading)
        .collect();

    if values.is_empty() {
        return None;
    }

    match strategy {
        ReconcileStrategy::Conservative => values.into_iter().reduce(f64::max),
        ReconcileStrategy::Average => Some(values.iter().sum::<f64>() / values.len() as f64),
    }
}
