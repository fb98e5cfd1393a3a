use clap::{Parser, Subcommand};

/// Normalization, merge and deduplication of the Educafro intake survey exports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the paths and options to use. Relative paths in this file
    /// are resolved against the directory of the file. Command line options take precedence over it.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Turns a raw export into the canonical table used by the dashboard.
    Normalize(NormalizeArgs),
    /// Appends the records of a spreadsheet-tool export to the main export.
    Merge(MergeArgs),
    /// Combines two snapshots of the main export, keeping the latest version of each form.
    Consolidate(ConsolidateArgs),
    /// Removes the identifying columns of an export.
    Anonymize(AnonymizeArgs),
    /// Computes the headline figures and the category counts of the dashboard, as JSON.
    Stats(StatsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// (file path) The raw CSV export. Overrides the mainCsv entry of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the canonical table. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// If passed, the identifying columns are removed before processing.
    #[clap(long, takes_value = false)]
    pub privacy: bool,

    /// (file path) A reference CSV file. If provided, the produced table must match it exactly.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default: the current year) The year the ages are computed against.
    #[clap(long, value_parser)]
    pub reference_year: Option<i32>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MergeArgs {
    /// (file path) The main CSV export. It is backed up, then overwritten unless --out is given.
    #[clap(long, value_parser)]
    pub main: Option<String>,

    /// (file path) The spreadsheet-tool export, as CSV or xlsx.
    #[clap(long, value_parser)]
    pub new: Option<String>,

    /// When the new export is an Excel file, the name of the worksheet to use. Defaults to the first one.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) Where to write the merged export.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory) Where to write the backups. Defaults to the directory of each backed up file.
    #[clap(long, value_parser)]
    pub backup_directory: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConsolidateArgs {
    /// (file path) The older snapshot of the main export.
    #[clap(long, value_parser)]
    pub old: Option<String>,

    /// (file path) The newer snapshot of the main export. Overrides the mainCsv entry of the configuration.
    #[clap(long, value_parser)]
    pub new: Option<String>,

    /// (file path) Where to write the consolidated export.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory) Where to write the backups. Defaults to the directory of each backed up file.
    #[clap(long, value_parser)]
    pub backup_directory: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnonymizeArgs {
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path or 'stdout') Where to write the table without the identifying columns.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatsArgs {
    /// (file path) A raw or already normalized CSV export.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the JSON summary. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,
}
