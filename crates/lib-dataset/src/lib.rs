//! # lib-dataset
//!
//! Tabular dataset handling for downlink planning.
//!
//! This crate provides:
//! - CSV tables with named, dynamically typed columns
//! - Time-series feature extraction (SNR percentiles, fades, outage, slope)
//! - Left-join enrichment with column-mean imputation
//! - Declared column schemas with role validation
//! - Design matrices and temporal train/test splits
//! - Descriptive statistics

pub mod error;
pub mod features;
pub mod matrix;
pub mod merge;
pub mod schema;
pub mod stats;
pub mod table;

pub use error::{DatasetError, DatasetResult};
pub use features::{extract_all, extract_features};
pub use matrix::{parse_utc, DesignMatrix};
pub use merge::{left_join_impute, MergeOutcome};
pub use schema::{ColumnRole, Schema};
pub use stats::{describe, ColumnSummary};
pub use table::{read_records, write_records, Cell, Table};
