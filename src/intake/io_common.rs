use std::io::Write;
use std::path::PathBuf;
use chrono::NaiveDateTime;

use crate::intake::*;

/// A copy of a file taken before it is overwritten.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Backup {
    pub path: PathBuf,
    /// The SHA-256 digest of the content, in hexadecimal.
    pub digest: String,
}

/// The name of a file without its directory and extension.
pub fn simplify_file_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export")
        .to_string()
}

pub fn is_spreadsheet(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("xlsx"))
}

/// `<stem>_backup_<YYYYmmdd_HHMMSS>.csv`, in `directory` or else next to the source.
pub fn backup_path(source: &Path, directory: Option<&Path>, now: &NaiveDateTime) -> PathBuf {
    let dir: PathBuf = match directory {
        Some(d) => d.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let base = format!(
        "{}_backup_{}",
        simplify_file_name(source),
        now.format("%Y%m%d_%H%M%S")
    );
    let mut res = dir.join(format!("{}.csv", base));
    // Two sources with the same name can be saved in the same second.
    let mut n = 1;
    while res.exists() {
        res = dir.join(format!("{}_{}.csv", base, n));
        n += 1;
    }
    res
}

/// Copies a file to its backup location and computes the digest of the copy.
pub fn backup_file(
    source: &Path,
    directory: Option<&Path>,
    now: &NaiveDateTime,
) -> IntakeResult<Backup> {
    let path = backup_path(source, directory, now);
    let context = BackupSnafu {
        path: source.display().to_string(),
        backup: path.display().to_string(),
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).context(context.clone())?;
    }
    fs::copy(source, &path).context(context.clone())?;
    let contents = fs::read_to_string(&path).context(context)?;
    let digest = sha256::digest(contents.as_str());
    info!(
        "backup_file: {:?} -> {:?} sha256: {}",
        source, path, digest
    );
    Ok(Backup { path, digest })
}

/// Writes the content to a file, or to the standard output when the destination is
/// empty or `stdout`.
pub fn write_output(dest: Option<&str>, contents: &str) -> IntakeResult<()> {
    match dest {
        None | Some("stdout") => {
            let mut out = std::io::stdout();
            out.write_all(contents.as_bytes())
                .context(OutputWriteSnafu { path: "stdout" })?;
            out.flush().context(OutputWriteSnafu { path: "stdout" })
        }
        Some(p) => {
            fs::write(p, contents).context(OutputWriteSnafu { path: p })?;
            info!("write_output: wrote {} bytes to {:?}", contents.len(), p);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 24)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    #[test]
    fn backup_names() {
        let p = backup_path(Path::new("/data/exports/main.csv"), None, &stamp());
        assert_eq!(
            p,
            PathBuf::from("/data/exports/main_backup_20260224_090507.csv")
        );
        let p = backup_path(
            Path::new("/data/exports/main.csv"),
            Some(Path::new("/backups")),
            &stamp(),
        );
        assert_eq!(p, PathBuf::from("/backups/main_backup_20260224_090507.csv"));
    }

    #[test]
    fn backup_keeps_content_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.csv");
        fs::write(&source, "id\n1\n").unwrap();
        let backups = dir.path().join("backups");

        let b = backup_file(&source, Some(&backups), &stamp()).unwrap();
        assert_eq!(fs::read_to_string(&b.path).unwrap(), "id\n1\n");
        assert_eq!(b.digest, sha256::digest("id\n1\n"));
        assert_eq!(b.digest.len(), 64);

        // The first backup is not overwritten.
        let b2 = backup_file(&source, Some(&backups), &stamp()).unwrap();
        assert_ne!(b.path, b2.path);
        assert!(b.path.exists());
    }

    #[test]
    fn spreadsheet_extension() {
        assert!(is_spreadsheet("respostas.XLSX"));
        assert!(!is_spreadsheet("respostas.csv"));
        assert!(!is_spreadsheet("respostas"));
    }
}
