use log::{debug, info, warn};

use intake_pipeline::registry::Field;
use intake_pipeline::summary::{percentage, value_counts, HeadlineMetrics};
use intake_pipeline::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use chrono::{DateTime, Datelike, Local, Utc};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::*;
use crate::intake::config_reader::*;
use crate::intake::io_common::{backup_file, is_spreadsheet, write_output, Backup};
use crate::intake::io_csv::{read_csv_table, table_to_csv};
use crate::intake::io_xlsx::read_xlsx_table;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum IntakeError {
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing CSV data for {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing {path}"))]
    OutputWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Spreadsheet {path} has no worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("Spreadsheet {path} has no worksheet named {name}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error reading {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error backing up {path} to {backup}"))]
    Backup {
        source: std::io::Error,
        path: String,
        backup: String,
    },
    #[snafu(display("Error reading the reference file {path}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(
        "No value for {name}: pass it on the command line or in the configuration file"
    ))]
    MissingSetting { name: &'static str },
    #[snafu(display("{source}"))]
    Pipeline { source: PipelineError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type IntakeResult<T> = Result<T, IntakeError>;

/// The dashboard sections reported by the stats command, in display order.
static STATS_SECTIONS: &[Field] = &[
    Field::AgeBracket,
    Field::Gender,
    Field::RaceGroup,
    Field::RaceSupergroup,
    Field::SexualOrientation,
    Field::City,
    Field::EmploymentStatus,
    Field::WorkTie,
    Field::FamilyIncome,
    Field::ReceivesBenefits,
    Field::HasInternet,
    Field::HousingCondition,
    Field::SchoolType,
    Field::InternetType,
    Field::HousingType,
    Field::HasChildren,
    Field::WorkMoneyUse,
    Field::CadUnico,
    Field::TransportMode,
    Field::HealthPlan,
    Field::InternetSignal,
    Field::BloodType,
    Field::Disability,
    Field::FamilyDisability,
    Field::Interviewer,
];

pub fn run(args: &Args) -> IntakeResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => IntakeConfig::default(),
    };
    debug!("run: config: {:?}", config);
    match &args.command {
        Command::Normalize(cmd) => run_normalize(&config, cmd),
        Command::Merge(cmd) => run_merge(&config, cmd),
        Command::Consolidate(cmd) => run_consolidate(&config, cmd),
        Command::Anonymize(cmd) => run_anonymize(&config, cmd),
        Command::Stats(cmd) => run_stats(&config, cmd),
    }
}

fn pipeline_options(config: &IntakeConfig, privacy: bool, year: Option<i32>) -> PipelineOptions {
    PipelineOptions {
        normalize: NormalizeOptions {
            reference_year: year
                .or(config.reference_year)
                .unwrap_or_else(|| Local::now().year()),
        },
        privacy: privacy || config.privacy_mode.unwrap_or(false),
    }
}

fn now() -> DateTime<Local> {
    Local::now()
}

fn report_backup(b: &Backup) {
    println!("backup: {} sha256: {}", b.path.display(), b.digest);
}

pub fn run_normalize(config: &IntakeConfig, cmd: &NormalizeArgs) -> IntakeResult<()> {
    let input = setting(&cmd.input, &config.main_csv, "input")?;
    let options = pipeline_options(config, cmd.privacy, cmd.reference_year);
    info!("run_normalize: reading {:?}", input);
    let raw = read_csv_table(&input)?;
    let output = run_pipeline(&raw, &options).context(PipelineSnafu {})?;
    info!(
        "run_normalize: {} records ({} incomplete dropped), generation {:?}",
        output.table.len(),
        output.dropped_incomplete,
        output.generation
    );

    let out = cmd.out.clone().or_else(|| config.output.clone());
    let out_name = out.clone().unwrap_or_else(|| "stdout".to_string());
    let csv_text = table_to_csv(&output.table, &out_name)?;
    write_output(out.as_deref(), &csv_text)?;

    if let Some(reference_p) = &cmd.reference {
        check_reference(reference_p, &csv_text)?;
    }
    Ok(())
}

/// Compares the produced text with the content of a reference file, and prints the
/// differences if any.
fn check_reference(reference_p: &str, produced: &str) -> IntakeResult<()> {
    let reference =
        fs::read_to_string(reference_p).context(OpeningReferenceSnafu { path: reference_p })?;
    let reference = reference.replace("\r\n", "\n");
    if reference.trim_end() != produced.trim_end() {
        warn!("Found differences with the reference file {:?}", reference_p);
        print_diff(reference.as_str(), produced, "\n");
        whatever!(
            "Difference detected between the produced table and the reference {}",
            reference_p
        )
    }
    info!("check_reference: output matches {:?}", reference_p);
    Ok(())
}

pub fn run_merge(config: &IntakeConfig, cmd: &MergeArgs) -> IntakeResult<()> {
    let main_p = setting(&cmd.main, &config.main_csv, "main")?;
    let new_p = setting(&cmd.new, &config.new_export, "new")?;
    let out_p = cmd
        .out
        .clone()
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| main_p.clone());
    let worksheet = cmd
        .excel_worksheet_name
        .clone()
        .or_else(|| config.excel_worksheet_name.clone());
    let backup_dir = cmd
        .backup_directory
        .clone()
        .or_else(|| config.backup_directory.clone());

    let main = read_csv_table(&main_p)?;
    let new_export = if is_spreadsheet(&new_p) {
        read_xlsx_table(&new_p, worksheet.as_deref())?
    } else {
        read_csv_table(&new_p)?
    };
    info!(
        "run_merge: {} records in {:?}, {} records in {:?}",
        main.len(),
        main_p,
        new_export.len(),
        new_p
    );

    let stamp = now();
    let outcome = merge::merge_exports(&main, &new_export, stamp.with_timezone(&Utc))
        .context(PipelineSnafu {})?;

    let backup = backup_file(
        Path::new(&main_p),
        backup_dir.as_deref().map(Path::new),
        &stamp.naive_local(),
    )?;
    let csv_text = table_to_csv(&outcome.table, &out_p)?;
    write_output(Some(out_p.as_str()), &csv_text)?;

    println!(
        "merge: {} records added (ids from {}), {} records written to {}",
        outcome.added,
        outcome.first_new_id,
        outcome.table.len(),
        out_p
    );
    report_backup(&backup);
    Ok(())
}

pub fn run_consolidate(config: &IntakeConfig, cmd: &ConsolidateArgs) -> IntakeResult<()> {
    let old_p = setting(&cmd.old, &config.old_export, "old")?;
    let new_p = setting(&cmd.new, &config.main_csv, "new")?;
    let out_p = setting(&cmd.out, &config.output, "out")?;
    let backup_dir = cmd
        .backup_directory
        .clone()
        .or_else(|| config.backup_directory.clone());

    let older = read_csv_table(&old_p)?;
    let newer = read_csv_table(&new_p)?;
    let outcome = consolidate::consolidate(&older, &newer).context(PipelineSnafu {})?;

    // Both inputs are saved before anything is written.
    let stamp = now().naive_local();
    let dir = backup_dir.as_deref().map(Path::new);
    let backups = vec![
        backup_file(Path::new(&old_p), dir, &stamp)?,
        backup_file(Path::new(&new_p), dir, &stamp)?,
    ];

    let csv_text = table_to_csv(&outcome.table, &out_p)?;
    write_output(Some(out_p.as_str()), &csv_text)?;

    for line in consolidation_summary(&outcome.report, &old_p, &out_p) {
        println!("{}", line);
    }
    for b in backups.iter() {
        report_backup(b);
    }
    Ok(())
}

/// The audit lines printed after a consolidation, one per recovered form at the end.
fn consolidation_summary(report: &ConsolidationReport, old_p: &str, out_p: &str) -> Vec<String> {
    let mut lines = vec![
        format!("consolidate: {} rows combined", report.initial_rows),
        format!("consolidate: {} duplicates removed", report.duplicates_removed),
        format!(
            "consolidate: {} unique rows written to {}",
            report.final_rows, out_p
        ),
        format!(
            "consolidate: {} forms recovered from {}",
            report.recovered.len(),
            old_p
        ),
    ];
    lines.extend(
        report
            .recovered
            .iter()
            .map(|u| format!("consolidate: recovered {}", u)),
    );
    lines
}

pub fn run_anonymize(config: &IntakeConfig, cmd: &AnonymizeArgs) -> IntakeResult<()> {
    let input = setting(&cmd.input, &config.main_csv, "input")?;
    let out = setting(&cmd.out, &config.output, "out")?;
    let table = read_csv_table(&input)?;
    let res = privacy::drop_identifying(&table);
    let csv_text = table_to_csv(&res, &out)?;
    write_output(Some(out.as_str()), &csv_text)
}

pub fn run_stats(config: &IntakeConfig, cmd: &StatsArgs) -> IntakeResult<()> {
    let input = setting(&cmd.input, &config.main_csv, "input")?;
    let options = pipeline_options(config, false, None);
    let raw = read_csv_table(&input)?;
    let table = run_pipeline(&raw, &options)
        .context(PipelineSnafu {})?
        .table;
    let js = build_stats_js(&table)?;
    let pretty = serde_json::to_string_pretty(&js).context(WritingJsonSnafu {})?;
    let out = cmd.out.clone().or_else(|| config.output.clone());
    write_output(out.as_deref(), &pretty)
}

fn build_stats_js(table: &Table) -> IntakeResult<JSValue> {
    let m = HeadlineMetrics::compute(table).context(PipelineSnafu {})?;
    let mut sections: JSMap<String, JSValue> = JSMap::new();
    for f in STATS_SECTIONS {
        if !table.has_column(f.name()) {
            debug!("build_stats_js: no column {:?}", f.name());
            continue;
        }
        let counts: Vec<JSValue> = value_counts(table, f.name())
            .context(PipelineSnafu {})?
            .into_iter()
            .map(|(value, count)| {
                json!({
                    "value": value,
                    "count": count,
                    "percentage": percentage(count, m.total)
                })
            })
            .collect();
        sections.insert(f.name().to_string(), json!(counts));
    }
    Ok(json!({
        "total": m.total,
        "negrosPct": m.negros_pct,
        "mulheresPct": m.mulheres_pct,
        "sections": sections
    }))
}
