//! Design-matrix construction and temporal splitting.
//!
//! Model inputs are the schema's `Feature` columns in table order, with
//! `modem_modcod` replaced by its category code, followed by the pass start
//! and end as Unix seconds. Missing or unparsable feature cells become 0.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lib_types::pass::Modcod;
use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DatasetError, DatasetResult};
use crate::schema::{ColumnRole, Schema, MODCOD, PASS_END, PASS_START};
use crate::table::{Cell, Table};

pub const PASS_START_TS: &str = "pass_start_ts";
pub const PASS_END_TS: &str = "pass_end_ts";

/// Parse a UTC timestamp: RFC 3339, or ISO 8601 without an offset (taken
/// as UTC). A bare date means midnight.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Numeric value of a feature cell.
pub fn encode_feature(column: &str, cell: &Cell) -> f64 {
    match cell {
        Cell::Number(v) if v.is_finite() => *v,
        Cell::Text(s) if column == MODCOD => Modcod::from_label(s)
            .map(|m| f64::from(m.category_code()))
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Feature matrix with aligned targets and pass start times.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignMatrix {
    pub feature_names: Vec<String>,
    /// Rows are passes, columns follow `feature_names`.
    pub features: Array2<f64>,
    /// Target name and values, in schema order.
    pub targets: Vec<(String, Array1<f64>)>,
    pub start_times: Vec<DateTime<Utc>>,
}

impl DesignMatrix {
    /// Build from a table validated against `schema`.
    ///
    /// Rows with any missing target are dropped.
    pub fn from_table(table: &Table, schema: &Schema) -> DatasetResult<Self> {
        schema.validate(table)?;

        let feature_cols: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| schema.role_of(name) == Some(ColumnRole::Feature))
            .map(|(i, _)| i)
            .collect();
        let target_cols: Vec<usize> = schema
            .names_with_role(ColumnRole::Target)
            .iter()
            .map(|name| table.require_column(schema.name(), name))
            .collect::<DatasetResult<_>>()?;
        let start_col = table.require_column(schema.name(), PASS_START)?;
        let end_col = table.require_column(schema.name(), PASS_END)?;

        let mut feature_names: Vec<String> =
            feature_cols.iter().map(|&c| table.columns()[c].clone()).collect();
        feature_names.push(PASS_START_TS.into());
        feature_names.push(PASS_END_TS.into());

        let kept: Vec<usize> = (0..table.len())
            .filter(|&r| target_cols.iter().all(|&c| table.rows()[r][c].as_f64().is_some()))
            .collect();
        if kept.len() < table.len() {
            warn!(dropped = table.len() - kept.len(), "Rows without targets dropped");
        }

        let width = feature_names.len();
        let mut features = Array2::<f64>::zeros((kept.len(), width));
        let mut start_times = Vec::with_capacity(kept.len());

        for (i, &r) in kept.iter().enumerate() {
            let row = &table.rows()[r];
            for (j, &c) in feature_cols.iter().enumerate() {
                features[[i, j]] = encode_feature(&table.columns()[c], &row[c]);
            }
            let start = timestamp(row, start_col, PASS_START, r)?;
            let end = timestamp(row, end_col, PASS_END, r)?;
            features[[i, width - 2]] = start.timestamp() as f64;
            features[[i, width - 1]] = end.timestamp() as f64;
            start_times.push(start);
        }

        let targets = target_cols
            .iter()
            .map(|&c| {
                let values: Array1<f64> = kept
                    .iter()
                    .map(|&r| table.rows()[r][c].as_f64().unwrap_or(f64::NAN))
                    .collect();
                (table.columns()[c].clone(), values)
            })
            .collect();

        debug!(rows = kept.len(), features = width, "Design matrix built");
        Ok(Self {
            feature_names,
            features,
            targets,
            start_times,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Values of a named target.
    pub fn target(&self, name: &str) -> DatasetResult<&Array1<f64>> {
        self.targets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DatasetError::missing_column("design matrix", name))
    }

    /// Sort by pass start and split: the earliest `train_fraction` of rows
    /// train, the rest test.
    pub fn temporal_split(&self, train_fraction: f64) -> DatasetResult<(Self, Self)> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(DatasetError::invalid_value(
                "train_fraction",
                0,
                format!("must be in (0, 1), got {}", train_fraction),
            ));
        }

        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by_key(|&i| self.start_times[i]);

        let cut = (self.n_rows() as f64 * train_fraction) as usize;
        let (train, test) = order.split_at(cut);
        info!(train = train.len(), test = test.len(), "Temporal split");
        Ok((self.select(train), self.select(test)))
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), rows),
            targets: self
                .targets
                .iter()
                .map(|(n, v)| (n.clone(), v.select(Axis(0), rows)))
                .collect(),
            start_times: rows.iter().map(|&i| self.start_times[i]).collect(),
        }
    }

    /// Row whose pass start is closest to `when`. Ties go to the earlier row.
    pub fn closest_row(&self, when: DateTime<Utc>) -> Option<usize> {
        self.start_times
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (**t - when).num_milliseconds().unsigned_abs())
            .map(|(i, _)| i)
    }

    /// Named feature values of one row.
    pub fn row_map(&self, row: usize) -> HashMap<String, f64> {
        self.feature_names
            .iter()
            .cloned()
            .zip(self.features.row(row).iter().copied())
            .collect()
    }
}

fn timestamp(row: &[Cell], col: usize, name: &str, r: usize) -> DatasetResult<DateTime<Utc>> {
    let raw = row[col].to_string();
    parse_utc(&raw).ok_or_else(|| DatasetError::invalid_value(name, r, format!("bad timestamp '{}'", raw)))
}
