use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use polars::prelude::*;

use crate::config::{ConsolidationOutcome, ConsolidationReport, PipelineError};
use crate::merge::parse_id;
use crate::registry::Field;
use crate::table::Table;

/// Sort key of the survivor election: the update time, then the export it comes from.
const RECENCY_KEY: &str = "__recency";
/// Sort key of the result: the numeric record id.
const ID_KEY: &str = "__id";

/// Combines two snapshots of the same interviews into one, keeping the most recently
/// updated version of each form (last write wins, no field-level merge).
///
/// When two versions carry the same update time, the one from `newer` wins. The
/// result is sorted by id. Any update timestamp that cannot be read stops the
/// consolidation.
pub fn consolidate(older: &Table, newer: &Table) -> Result<ConsolidationOutcome, PipelineError> {
    let uuid_col = Field::FormUuid.name();
    let updated_col = Field::UpdatedAt.name();
    for t in [older, newer] {
        for col in [uuid_col, updated_col] {
            if !t.has_column(col) {
                return Err(PipelineError::MissingColumn {
                    column: col.to_string(),
                    operation: "consolidate",
                });
            }
        }
    }

    let combined = older.append(newer)?;
    let initial_rows = combined.len();
    debug!(
        "consolidate: {} older rows, {} newer rows",
        older.len(),
        newer.len()
    );

    // Twice the update time in milliseconds, plus one for the rows of the newer export.
    let mut recency: Vec<i64> = Vec::with_capacity(initial_rows);
    for r in combined.iter_rows() {
        let value = r.get(updated_col);
        let ts = value
            .and_then(parse_timestamp)
            .ok_or_else(|| PipelineError::UnparsableTimestamp {
                row: r.index(),
                form_uuid: r.get(uuid_col).map(str::to_string),
                value: value.map(str::to_string),
            })?;
        let from_newer = (r.index() >= older.len()) as i64;
        recency.push(ts.timestamp_millis() * 2 + from_newer);
    }
    let ids: Vec<Option<i64>> = combined
        .iter_rows()
        .map(|r| r.get(Field::Id.name()).and_then(parse_id))
        .collect();

    let mut frame = combined.into_frame();
    frame.with_column(Series::new(RECENCY_KEY, recency))?;
    frame.with_column(Series::new(ID_KEY, ids))?;

    let uuids = frame.column(uuid_col)?;
    let anonymous = frame.filter(&uuids.is_null())?;
    if anonymous.height() > 0 {
        warn!(
            "consolidate: {} rows have no form uuid, keeping them",
            anonymous.height()
        );
    }
    let identified = frame.filter(&uuids.is_not_null())?;

    let subset = [uuid_col.to_string()];
    let survivors = identified
        .lazy()
        .sort(
            RECENCY_KEY,
            SortOptions {
                descending: true,
                maintain_order: true,
                ..Default::default()
            },
        )
        .collect()?
        .unique_stable(Some(&subset[..]), UniqueKeepStrategy::First, None)?
        .vstack(&anonymous)?;

    let sorted = survivors
        .lazy()
        .sort(
            ID_KEY,
            SortOptions {
                nulls_last: true,
                maintain_order: true,
                ..Default::default()
            },
        )
        .collect()?
        .drop(RECENCY_KEY)?
        .drop(ID_KEY)?;
    let table = Table::from_frame(sorted)?;

    let newer_uuids: HashSet<&str> = newer.iter_rows().filter_map(|r| r.get(uuid_col)).collect();
    let mut recovered: Vec<String> = Vec::new();
    for u in older.iter_rows().filter_map(|r| r.get(uuid_col)) {
        if !newer_uuids.contains(u) && !recovered.iter().any(|x| x == u) {
            recovered.push(u.to_string());
        }
    }

    let report = ConsolidationReport {
        initial_rows,
        duplicates_removed: initial_rows - table.len(),
        final_rows: table.len(),
        recovered,
    };
    info!(
        "consolidate: {} rows combined, {} duplicates removed, {} unique rows, {} recovered from the older export",
        report.initial_rows,
        report.duplicates_removed,
        report.final_rows,
        report.recovered.len()
    );
    Ok(ConsolidationOutcome { table, report })
}

/// Reads an update timestamp. Stamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
    ] {
        if let Ok(d) = DateTime::parse_from_str(s, fmt) {
            return Some(d.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&d));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::cell;

    fn export(rows: &[(&str, &str, &str, &str)]) -> Table {
        Table::from_rows(
            vec![
                "id".to_string(),
                "form_uuid".to_string(),
                "updated_at".to_string(),
                "cidade".to_string(),
            ],
            rows.iter()
                .map(|(id, u, t, c)| vec![cell(id), cell(u), cell(t), cell(c)])
                .collect(),
        )
    }

    #[test]
    fn latest_version_wins() {
        let old = export(&[
            ("1", "U1", "2026-02-01 10:00:00", "Santos"),
            ("2", "U2", "2026-02-02 10:00:00", "Santos"),
            ("3", "U3", "2026-02-03 10:00:00", "Praia Grande"),
        ]);
        let new = export(&[
            ("2", "U2", "2026-02-09T08:00:00-03:00", "São Vicente"),
            ("4", "U4", "2026-02-05 09:00:00+00:00", "Cubatão"),
        ]);
        let res = consolidate(&old, &new).unwrap();
        let t = res.table;
        assert_eq!(t.len(), 4);
        let uuids: Vec<&str> = t.iter_rows().filter_map(|r| r.get("form_uuid")).collect();
        assert_eq!(uuids, vec!["U1", "U2", "U3", "U4"]);
        assert_eq!(t.get(1, "cidade"), Some("São Vicente"));

        assert_eq!(res.report.initial_rows, 5);
        assert_eq!(res.report.duplicates_removed, 1);
        assert_eq!(res.report.final_rows, 4);
        assert_eq!(res.report.recovered, vec!["U1".to_string(), "U3".to_string()]);
    }

    #[test]
    fn older_version_can_win() {
        let old = export(&[("2", "U2", "2026-03-01 10:00:00", "recent")]);
        let new = export(&[("2", "U2", "2026-02-01 10:00:00", "stale")]);
        let res = consolidate(&old, &new).unwrap();
        assert_eq!(res.table.len(), 1);
        assert_eq!(res.table.get(0, "cidade"), Some("recent"));
        assert!(res.report.recovered.is_empty());
    }

    #[test]
    fn ties_go_to_the_newer_export() {
        let old = export(&[("2", "U2", "2026-02-01 10:00:00", "old")]);
        let new = export(&[("2", "U2", "2026-02-01T10:00:00Z", "new")]);
        let res = consolidate(&old, &new).unwrap();
        assert_eq!(res.table.get(0, "cidade"), Some("new"));
    }

    #[test]
    fn row_count_is_a_plus_b_minus_shared() {
        let old = export(&[
            ("1", "A", "2026-01-01 00:00:00", ""),
            ("2", "B", "2026-01-01 00:00:00", ""),
            ("3", "C", "2026-01-01 00:00:00", ""),
            ("4", "D", "2026-01-01 00:00:00", ""),
        ]);
        let new = export(&[
            ("2", "B", "2026-01-02 00:00:00", ""),
            ("4", "D", "2026-01-02 00:00:00", ""),
            ("5", "E", "2026-01-02 00:00:00", ""),
        ]);
        let res = consolidate(&old, &new).unwrap();
        assert_eq!(res.table.len(), 4 + 3 - 2);
    }

    #[test]
    fn unparsable_timestamp_is_fatal() {
        let old = export(&[("1", "U1", "yesterday", "")]);
        let new = export(&[]);
        assert_eq!(
            consolidate(&old, &new),
            Err(PipelineError::UnparsableTimestamp {
                row: 0,
                form_uuid: Some("U1".to_string()),
                value: Some("yesterday".to_string()),
            })
        );
    }

    #[test]
    fn missing_identity_column_is_fatal() {
        let old = Table::new(vec!["id".to_string(), "updated_at".to_string()]);
        let new = export(&[]);
        assert!(matches!(
            consolidate(&old, &new),
            Err(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn timestamps_with_offsets() {
        let a = parse_timestamp("2026-02-10 14:03:22.123456+00").unwrap();
        let b = parse_timestamp("2026-02-10T11:03:22-03:00").unwrap();
        let c = parse_timestamp("2026-02-10 14:03:22").unwrap();
        assert!(a > b);
        assert_eq!(b, c);
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn rows_without_uuid_are_all_kept() {
        let old = Table::from_rows(
            vec![
                "id".to_string(),
                "form_uuid".to_string(),
                "updated_at".to_string(),
            ],
            vec![
                vec![cell("3"), None, cell("2026-01-01 00:00:00")],
                vec![cell("1"), cell("U1"), cell("2026-01-01 00:00:00")],
            ],
        );
        let new = Table::from_rows(
            vec![
                "id".to_string(),
                "form_uuid".to_string(),
                "updated_at".to_string(),
            ],
            vec![
                vec![None, None, cell("2026-01-02 00:00:00")],
                vec![cell("1"), cell("U1"), cell("2026-01-02 00:00:00")],
            ],
        );
        let res = consolidate(&old, &new).unwrap();
        assert_eq!(res.table.len(), 3);
        assert_eq!(res.report.duplicates_removed, 1);
        // Sorted by id, rows without id last.
        assert_eq!(res.table.get(0, "id"), Some("1"));
        assert_eq!(res.table.get(0, "updated_at"), Some("2026-01-02 00:00:00"));
        assert_eq!(res.table.get(1, "id"), Some("3"));
        assert_eq!(res.table.get(2, "id"), None);
        assert!(!res.table.has_column("__id"));
    }
}
