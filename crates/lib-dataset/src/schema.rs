//! Declared column schemas.
//!
//! Every column of a training table is declared with a role. Tables are
//! validated against the declaration when loaded: a declared column that
//! is absent, or a present column that is undeclared, is an error.

use lib_types::profile::FeatureVector;
use std::fmt;

use crate::error::{DatasetError, DatasetResult};
use crate::table::Table;

/// Role a column plays for model training.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Identifier,
    Timestamp,
    /// Model input.
    Feature,
    /// Supervised target.
    Target,
    /// Derived from the outcome; never a model input.
    Leakage,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Identifier => "identifier",
            Self::Timestamp => "timestamp",
            Self::Feature => "feature",
            Self::Target => "target",
            Self::Leakage => "leakage",
        };
        f.write_str(s)
    }
}

pub const PASS_ID: &str = "pass_id";
pub const PASS_START: &str = "pass_start_utc";
pub const PASS_END: &str = "pass_end_utc";
pub const MODCOD: &str = "modem_modcod";
pub const CAN_SEND_ALL: &str = "can_send_all";
pub const COMPRESSION_RATIO: &str = "recommended_compression_ratio";

/// Columns of the aggregated pass table, in file order, with their roles.
pub const AGGREGATED_COLUMNS: [(&str, ColumnRole); 35] = [
    (PASS_ID, ColumnRole::Identifier),
    (PASS_START, ColumnRole::Timestamp),
    (PASS_END, ColumnRole::Timestamp),
    ("pass_duration_s", ColumnRole::Feature),
    ("max_elevation_deg", ColumnRole::Feature),
    ("mean_elevation_deg", ColumnRole::Feature),
    ("range_km_at_max", ColumnRole::Feature),
    ("mean_range_km", ColumnRole::Feature),
    ("doppler_rate_hz_s", ColumnRole::Feature),
    ("tx_freq_hz", ColumnRole::Feature),
    ("tx_power_dbm", ColumnRole::Feature),
    ("antenna_gain_tx_db", ColumnRole::Feature),
    ("antenna_gain_rx_db", ColumnRole::Feature),
    ("pointing_error_deg", ColumnRole::Feature),
    ("modem_bandwidth_hz", ColumnRole::Feature),
    (MODCOD, ColumnRole::Feature),
    ("recent_mean_snr_db", ColumnRole::Feature),
    ("recent_snr_std_db", ColumnRole::Feature),
    ("last_pass_packet_loss", ColumnRole::Feature),
    ("battery_voltage_v", ColumnRole::Feature),
    ("pa_temperature_C", ColumnRole::Feature),
    ("payload_size_bytes", ColumnRole::Feature),
    ("payload_priority_pct", ColumnRole::Feature),
    ("local_time_of_day", ColumnRole::Feature),
    ("day_of_year", ColumnRole::Feature),
    ("rain_rate_mmhr_at_GS", ColumnRole::Feature),
    ("cloud_cover_pct", ColumnRole::Feature),
    ("TEC_total", ColumnRole::Feature),
    ("kp_index", ColumnRole::Feature),
    ("rfi_flag", ColumnRole::Feature),
    ("historical_max_bytes", ColumnRole::Leakage),
    ("max_bytes_transferable", ColumnRole::Leakage),
    (CAN_SEND_ALL, ColumnRole::Target),
    (COMPRESSION_RATIO, ColumnRole::Target),
    ("predicted_mean_snr_db", ColumnRole::Leakage),
];

/// One declared column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Ordered column declarations for a table.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    name: String,
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// The aggregated pass table.
    pub fn aggregated_passes() -> Self {
        let columns = AGGREGATED_COLUMNS
            .iter()
            .map(|&(name, role)| ColumnSpec {
                name: name.to_string(),
                role,
            })
            .collect();
        Self::new("aggregated_passes", columns)
    }

    /// The aggregated pass table enriched with time-series features.
    pub fn enriched_passes() -> Self {
        let mut schema = Self::aggregated_passes();
        schema.name = "aggregated_passes_enriched".into();
        schema
            .columns
            .extend(FeatureVector::FEATURE_COLUMNS.iter().map(|name| ColumnSpec {
                name: name.to_string(),
                role: ColumnRole::Feature,
            }));
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.role)
    }

    /// Names with the given role, in declaration order.
    pub fn names_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Check the table has exactly the declared columns.
    pub fn validate(&self, table: &Table) -> DatasetResult<()> {
        for column in &self.columns {
            if table.column_index(&column.name).is_none() {
                return Err(DatasetError::missing_column(&self.name, &column.name));
            }
        }
        for column in table.columns() {
            if self.role_of(column).is_none() {
                return Err(DatasetError::UndeclaredColumn {
                    table: self.name.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn table_with(columns: &[&str]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        t.push_row(vec![Cell::Missing; columns.len()]).unwrap();
        t
    }

    #[test]
    fn test_enriched_roles() {
        let schema = Schema::enriched_passes();
        assert_eq!(schema.columns().len(), 47);
        assert_eq!(schema.role_of("pass_id"), Some(ColumnRole::Identifier));
        assert_eq!(schema.role_of("snr_p90"), Some(ColumnRole::Feature));
        assert_eq!(schema.names_with_role(ColumnRole::Target), vec![CAN_SEND_ALL, COMPRESSION_RATIO]);
        let leakage = schema.names_with_role(ColumnRole::Leakage);
        assert!(leakage.contains(&"max_bytes_transferable"));
        assert!(leakage.contains(&"historical_max_bytes"));
        assert!(leakage.contains(&"predicted_mean_snr_db"));
        assert!(!schema.names_with_role(ColumnRole::Feature).contains(&"pass_start_utc"));
    }

    #[test]
    fn test_validate_accepts_exact_columns() {
        let schema = Schema::aggregated_passes();
        let names: Vec<&str> = AGGREGATED_COLUMNS.iter().map(|(n, _)| *n).collect();
        assert!(schema.validate(&table_with(&names)).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_column() {
        let schema = Schema::aggregated_passes();
        let names: Vec<&str> = AGGREGATED_COLUMNS[1..].iter().map(|(n, _)| *n).collect();
        let err = schema.validate(&table_with(&names)).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn test_validate_rejects_undeclared_column() {
        let schema = Schema::aggregated_passes();
        let mut names: Vec<&str> = AGGREGATED_COLUMNS.iter().map(|(n, _)| *n).collect();
        names.push("mystery");
        let err = schema.validate(&table_with(&names)).unwrap_err();
        assert!(matches!(err, DatasetError::UndeclaredColumn { .. }));
    }
}
