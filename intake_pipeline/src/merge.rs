use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::config::{MergeOutcome, PipelineError};
use crate::filter::COMPLETED;
use crate::normalize::{first_integer, normalize_gender};
use crate::registry::{Field, EXPORT_VARIANT_ALIASES};
use crate::table::{Cell, Table};

/// The id sequence starts after this value when the main export is empty.
pub const EMPTY_ID_BASE: i64 = 1000;

/// The format of the `created_at` and `updated_at` stamps. The offset is always written
/// so that the stamps compare correctly against the ones of the main export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Appends the records of a spreadsheet-tool export to the main export.
///
/// The new records are renamed onto the short names of the main export, get fresh
/// sequential ids after the largest existing one, fresh form uuids, and `now` as their
/// creation and update time. Columns of the main export that the new export does not
/// provide are null for the new records.
pub fn merge_exports(
    main: &Table,
    new_export: &Table,
    now: DateTime<Utc>,
) -> Result<MergeOutcome, PipelineError> {
    let max_id = max_id(main)?;
    let first_new_id = max_id.unwrap_or(EMPTY_ID_BASE) + 1;
    debug!(
        "merge_exports: max id in main export: {:?}, first new id: {}",
        max_id, first_new_id
    );

    let n = new_export.len();
    let transformed = transform_export(new_export);
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();

    let ids: Vec<Cell> = (0..n as i64)
        .map(|i| Some((first_new_id + i).to_string()))
        .collect();
    let uuids: Vec<Cell> = (0..n)
        .map(|_| Some(Uuid::new_v4().to_string()))
        .collect();
    let transformed = transformed
        .with_column(Field::FormStatus.name(), vec![Some(COMPLETED.to_string()); n])
        .with_column(Field::FormUuid.name(), uuids)
        .with_column(Field::Id.name(), ids)
        .with_column(Field::CreatedAt.name(), vec![Some(stamp.clone()); n])
        .with_column(Field::UpdatedAt.name(), vec![Some(stamp); n]);

    let table = main.append(&transformed)?;
    info!(
        "merge_exports: added {} records, {} records in total",
        n,
        table.len()
    );
    Ok(MergeOutcome {
        table,
        added: n,
        first_new_id,
    })
}

/// Renames the export onto the short names and cleans the free-text age and gender.
/// Columns without a mapping are dropped.
fn transform_export(export: &Table) -> Table {
    let mut columns: Vec<(String, Vec<Cell>)> = Vec::new();
    for (from, to) in EXPORT_VARIANT_ALIASES.iter() {
        if columns.iter().any(|(c, _)| c == to) {
            continue;
        }
        let source = export.columns().into_iter().find(|c| c.trim() == from.trim());
        if let Some(values) = source.and_then(|c| export.column_values(&c)) {
            columns.push((to.to_string(), values));
        }
    }
    let mut res = Table::from_columns(columns);
    debug!("transform_export: kept columns {:?}", res.columns());

    let gender_col = Field::Gender.snake_name();
    if let Some(values) = res.column_values(gender_col) {
        let values = values
            .into_iter()
            .map(|v| v.map(|s| normalize_gender(&s)))
            .collect();
        res = res.with_column(gender_col, values);
    }
    let age_col = Field::Age.snake_name();
    if let Some(values) = res.column_values(age_col) {
        let values = values
            .into_iter()
            .map(|v| v.and_then(|s| first_integer(&s)).map(|a| a.to_string()))
            .collect();
        res = res.with_column(age_col, values);
    }
    res
}

/// The largest record id, or `None` when there is no record.
fn max_id(table: &Table) -> Result<Option<i64>, PipelineError> {
    let values = match table.column_values(Field::Id.name()) {
        Some(v) => v,
        None if table.is_empty() => return Ok(None),
        None => {
            return Err(PipelineError::MissingColumn {
                column: Field::Id.name().to_string(),
                operation: "merge",
            })
        }
    };
    let mut res: Option<i64> = None;
    for (row, v) in values.iter().enumerate() {
        if let Some(s) = v {
            let id = parse_id(s).ok_or_else(|| PipelineError::InvalidId {
                row,
                value: s.clone(),
            })?;
            res = Some(res.map_or(id, |m| m.max(id)));
        }
    }
    Ok(res)
}

/// Parses a record id. Spreadsheet round-trips sometimes write them as `1001.0`.
pub fn parse_id(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
