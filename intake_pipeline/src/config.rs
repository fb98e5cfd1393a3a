// ********* Options **********

use std::error::Error;
use std::fmt::Display;

use polars::prelude::PolarsError;

use crate::registry::SchemaGeneration;
use crate::table::Table;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// The year the ages are computed against.
    pub reference_year: i32,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub normalize: NormalizeOptions,
    /// Drops the identifying columns before any processing.
    pub privacy: bool,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PipelineOutput {
    pub table: Table,
    pub generation: SchemaGeneration,
    /// The number of records removed because their form was not complete.
    pub dropped_incomplete: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MergeOutcome {
    pub table: Table,
    /// The number of records appended from the new export.
    pub added: usize,
    /// The id of the first appended record.
    pub first_new_id: i64,
}

/// The audit trail of a consolidation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ConsolidationReport {
    pub initial_rows: usize,
    pub duplicates_removed: usize,
    pub final_rows: usize,
    /// The form uuids of the older export that the newer export does not contain.
    /// They survive in the result through the older export.
    pub recovered: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ConsolidationOutcome {
    pub table: Table,
    pub report: ConsolidationReport,
}

// ********* Errors **********

/// Errors that stop a pipeline, a merge or a consolidation.
///
/// The normalization steps never reject a value: they degrade to nulls instead.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineError {
    /// A column the operation cannot work without.
    MissingColumn {
        column: String,
        operation: &'static str,
    },
    /// An update timestamp that is null or cannot be read.
    UnparsableTimestamp {
        row: usize,
        form_uuid: Option<String>,
        value: Option<String>,
    },
    /// A record id that is not an integer.
    InvalidId { row: usize, value: String },
    /// A failure of the underlying data frame.
    Frame { message: String },
}

impl From<PolarsError> for PipelineError {
    fn from(e: PolarsError) -> PipelineError {
        PipelineError::Frame {
            message: e.to_string(),
        }
    }
}

impl Error for PipelineError {}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MissingColumn { column, operation } => {
                write!(f, "{}: missing column {:?}", operation, column)
            }
            PipelineError::UnparsableTimestamp {
                row,
                form_uuid,
                value,
            } => write!(
                f,
                "cannot read the update timestamp {:?} of row {} (form {:?})",
                value, row, form_uuid
            ),
            PipelineError::InvalidId { row, value } => {
                write!(f, "row {}: the id {:?} is not an integer", row, value)
            }
            PipelineError::Frame { message } => write!(f, "data frame error: {}", message),
        }
    }
}
