use polars::prelude::*;

use crate::config::PipelineError;
use crate::normalize::{FEMININE, NEGROS};
use crate::registry::Field;
use crate::table::Table;

/// Counts the distinct values of a column, most frequent first. Ties are ordered by
/// label. Nulls are not counted. An absent column gives no counts.
pub fn value_counts(table: &Table, column: &str) -> Result<Vec<(String, usize)>, PipelineError> {
    let series = match table.frame().column(column) {
        Ok(s) => s.drop_nulls(),
        Err(_) => return Ok(Vec::new()),
    };
    if series.is_empty() {
        return Ok(Vec::new());
    }
    let counts = series.value_counts(true, false)?;
    let values = counts.get_columns()[0].utf8()?;
    let tallies = counts.get_columns()[1].cast(&DataType::UInt64)?;
    let mut res: Vec<(String, usize)> = values
        .into_iter()
        .zip(tallies.u64()?.into_iter())
        .filter_map(|(v, n)| Some((v?.to_string(), n? as usize)))
        .collect();
    res.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(res)
}

/// The share of `count` in `total`, in percent. An empty set has a share of 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// The figures shown at the top of the dashboard.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct HeadlineMetrics {
    pub total: usize,
    /// The share of the Pretos and Pardos groups.
    pub negros_pct: f64,
    pub mulheres_pct: f64,
}

impl HeadlineMetrics {
    pub fn compute(table: &Table) -> Result<HeadlineMetrics, PipelineError> {
        let total = table.len();
        let count = |column: &str, value: &str| -> Result<usize, PipelineError> {
            Ok(value_counts(table, column)?
                .into_iter()
                .find(|(v, _)| v == value)
                .map_or(0, |(_, n)| n))
        };
        Ok(HeadlineMetrics {
            total,
            negros_pct: percentage(count(Field::RaceSupergroup.name(), NEGROS)?, total),
            mulheres_pct: percentage(count(Field::Gender.name(), FEMININE)?, total),
        })
    }
}
