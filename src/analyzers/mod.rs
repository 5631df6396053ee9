//! School air-quality evaluation and scoring.
//!
//! This module grades each measured pollutant against fixed threshold
//! tables, combines the grades into a weighted composite per school, derives
//! improvement recommendations, rolls the results up by district, school
//! type and inspection period, and correlates the measured variables.

pub mod aggregate;
pub mod analyzer;
pub mod correlation;
pub mod grade;
pub mod reading;
pub mod recommend;
pub mod rollup;
pub mod types;
pub mod utility;
