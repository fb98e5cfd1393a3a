use log::{debug, info, warn};

use crate::config::PipelineError;
use crate::table::Table;

/// The value of the submission status for a finished interview.
pub const COMPLETED: &str = "completo";

/// The status columns, in the order they are probed.
const STATUS_COLUMNS: &[&str] = &["status_formulario", "Status"];

/// Keeps the records whose submission status is `completo`.
///
/// Tables without any status column are older exports that only contain finished
/// interviews: they are passed through untouched.
pub fn keep_completed(table: &Table) -> Result<Table, PipelineError> {
    let status_col = match STATUS_COLUMNS.iter().find(|c| table.has_column(c)) {
        Some(c) => *c,
        None => {
            warn!("keep_completed: no status column found, keeping all the records");
            return Ok(table.clone());
        }
    };
    debug!("keep_completed: using status column {:?}", status_col);
    let res = table.filter_rows(|r| r.get(status_col).map(str::trim) == Some(COMPLETED))?;
    info!(
        "keep_completed: kept {} of {} records",
        res.len(),
        table.len()
    );
    Ok(res)
}
