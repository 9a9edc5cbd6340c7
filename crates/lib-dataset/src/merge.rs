//! Dataset enrichment: left join with column-mean imputation.
//!
//! Every left row is kept. Right columns are appended; a left row with no
//! match gets, for each appended column, the mean of that column over the
//! joined table. Because the mean is taken over the whole column, the
//! result does not depend on input row order.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DatasetError, DatasetResult};
use crate::table::{Cell, Table};

/// Outcome of an enrichment join.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub table: Table,
    /// Left rows that found a right match.
    pub matched: usize,
    /// Left rows whose appended columns were imputed.
    pub imputed: usize,
}

/// Left-join `right` onto `left` by `key` and impute unmatched rows.
///
/// The key must be unique on the right side, and the two tables may share
/// no column other than the key.
pub fn left_join_impute(left: &Table, right: &Table, key: &str) -> DatasetResult<MergeOutcome> {
    let left_key = left.require_column("left table", key)?;
    let right_key = right.require_column("right table", key)?;

    let appended: Vec<usize> = (0..right.columns().len()).filter(|&c| c != right_key).collect();
    for &c in &appended {
        let name = &right.columns()[c];
        if left.column_index(name).is_some() {
            return Err(DatasetError::ColumnCollision(name.clone()));
        }
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(right.len());
    for (i, row) in right.rows().iter().enumerate() {
        let Some(k) = key_text(&row[right_key], key, i)? else {
            continue;
        };
        if index.insert(k, i).is_some() {
            return Err(DatasetError::DuplicateKey {
                table: "right table".into(),
                key: k.to_string(),
            });
        }
    }

    let mut columns = left.columns().to_vec();
    columns.extend(appended.iter().map(|&c| right.columns()[c].clone()));
    let mut table = Table::new(columns);

    let mut matched = 0;
    for (i, row) in left.rows().iter().enumerate() {
        let mut out = row.clone();
        let found = key_text(&row[left_key], key, i)?.and_then(|k| index.get(k));
        match found {
            Some(&r) => {
                matched += 1;
                out.extend(appended.iter().map(|&c| right.rows()[r][c].clone()));
            }
            None => out.extend(std::iter::repeat(Cell::Missing).take(appended.len())),
        }
        table.push_row(out)?;
    }

    let appended_range = left.columns().len()..table.columns().len();
    let imputed = impute_column_means(&mut table, appended_range);

    info!(
        rows = table.len(),
        matched,
        imputed = left.len() - matched,
        "Left join complete"
    );
    debug!(cells = imputed, "Imputed cells");

    Ok(MergeOutcome {
        matched,
        imputed: left.len() - matched,
        table,
    })
}

/// Join keys match as exact strings. A numeric cell means the key column
/// was parsed, which would equate `007` with `7`, so it is rejected.
fn key_text<'a>(cell: &'a Cell, column: &str, row: usize) -> DatasetResult<Option<&'a str>> {
    match cell {
        Cell::Text(s) => Ok(Some(s)),
        Cell::Missing => Ok(None),
        Cell::Number(_) => Err(DatasetError::invalid_value(
            column,
            row,
            "join key must be read as text",
        )),
    }
}

/// Fill missing cells of each column in `range` with that column's mean.
///
/// Columns with no numeric value are left as they are. Returns the number
/// of cells filled.
pub fn impute_column_means(table: &mut Table, range: std::ops::Range<usize>) -> usize {
    let mut filled = 0;
    for c in range {
        let present: Vec<f64> = table.numeric_column(c).into_iter().flatten().collect();
        if present.is_empty() {
            warn!(column = %table.columns()[c], "No values to impute from");
            continue;
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        filled += table.fill_missing(c, Cell::Number(mean));
    }
    filled
}
