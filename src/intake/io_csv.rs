// Primitives for reading and writing CSV files.

use crate::intake::*;

/// Reads a CSV export with a header row.
///
/// Header names are trimmed. Empty cells are read as nulls. Rows may be shorter or
/// longer than the header: they are padded with nulls or truncated.
pub fn read_csv_table(path: &str) -> IntakeResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let columns: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { path, lineno: 1usize })?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    debug!("read_csv_table: {:?} header: {:?}", path, columns);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        if line.len() != columns.len() {
            debug!(
                "read_csv_table: line {} has {} fields, expected {}",
                lineno,
                line.len(),
                columns.len()
            );
        }
        rows.push(
            line.iter()
                .map(|s| if s.is_empty() { None } else { Some(s.to_string()) })
                .collect(),
        );
    }
    info!("read_csv_table: {:?}: {} records", path, rows.len());
    Ok(Table::from_rows(columns, rows))
}

/// Renders a table as CSV text. Nulls are written as empty cells. `path` is only used
/// for reporting errors.
pub fn table_to_csv(table: &Table, path: &str) -> IntakeResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(table.columns())
        .context(CsvWriteSnafu { path })?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
            .context(CsvWriteSnafu { path })?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(OutputWriteSnafu { path })?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => whatever!("Invalid UTF-8 in the output for {}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_and_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("export.csv");
        fs::write(
            &p,
            "\u{feff} id , Nome Completo ,cidade\n1,Ana,\n2,\"Silva, Bruno\"\n3,Carla,Santos,extra\n",
        )
        .unwrap();
        let t = read_csv_table(&p.display().to_string()).unwrap();
        assert_eq!(
            t.columns(),
            &[
                "id".to_string(),
                "Nome Completo".to_string(),
                "cidade".to_string()
            ]
        );
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "cidade"), None);
        assert_eq!(t.get(1, "Nome Completo"), Some("Silva, Bruno"));
        assert_eq!(t.get(1, "cidade"), None);
        assert_eq!(t.get(2, "cidade"), Some("Santos"));
    }

    #[test]
    fn written_text_reads_back() {
        let t = Table::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![cell("x, y"), None],
                vec![cell("Guarujá"), cell("2")],
            ],
        );
        let text = table_to_csv(&t, "test").unwrap();
        assert_eq!(text, "a,b\n\"x, y\",\nGuarujá,2\n");

        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.csv");
        fs::write(&p, &text).unwrap();
        assert_eq!(read_csv_table(&p.display().to_string()).unwrap(), t);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_csv_table("/nonexistent/export.csv"),
            Err(IntakeError::CsvOpen { .. })
        ));
    }
}
