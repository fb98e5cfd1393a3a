use crate::intake::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The content of the JSON configuration file. Every entry is optional and may be
/// overridden on the command line.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// The main export of the intake form.
    #[serde(rename = "mainCsv")]
    pub main_csv: Option<String>,
    /// The export of the spreadsheet tool, merged into the main export.
    #[serde(rename = "newExport")]
    pub new_export: Option<String>,
    /// An older snapshot of the main export, for consolidation.
    #[serde(rename = "oldExport")]
    pub old_export: Option<String>,
    pub output: Option<String>,
    #[serde(rename = "backupDirectory")]
    pub backup_directory: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "privacyMode")]
    pub privacy_mode: Option<bool>,
    #[serde(rename = "referenceYear")]
    pub reference_year: Option<i32>,
}

/// Reads a configuration file. The relative paths it contains are resolved against
/// the directory of the file.
pub fn read_config(path: &str) -> IntakeResult<IntakeConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: IntakeConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    let root = Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    debug!("read_config: {:?} root: {:?}", path, root);
    Ok(config.resolved(&root))
}

impl IntakeConfig {
    fn resolved(self, root: &Path) -> IntakeConfig {
        IntakeConfig {
            main_csv: resolve_path(root, self.main_csv),
            new_export: resolve_path(root, self.new_export),
            old_export: resolve_path(root, self.old_export),
            output: resolve_path(root, self.output),
            backup_directory: resolve_path(root, self.backup_directory),
            ..self
        }
    }
}

fn resolve_path(root: &Path, p: Option<String>) -> Option<String> {
    match p {
        Some(s) if s == "stdout" || Path::new(&s).is_absolute() => Some(s),
        Some(s) => {
            let full: PathBuf = root.join(s);
            Some(full.display().to_string())
        }
        None => None,
    }
}

/// The value given on the command line, else the one of the configuration file.
pub fn setting(
    cli: &Option<String>,
    config: &Option<String>,
    name: &'static str,
) -> IntakeResult<String> {
    cli.clone()
        .or_else(|| config.clone())
        .context(MissingSettingSnafu { name })
}
