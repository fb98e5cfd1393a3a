use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::intake::*;

/// Reads a worksheet of an Excel workbook as a table. The first row is the header.
///
/// When no worksheet name is given, the first worksheet is used.
pub fn read_xlsx_table(path: &str, worksheet_name: Option<&str>) -> IntakeResult<Table> {
    let wrange = get_range(path, worksheet_name)?;
    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path })?;
    let columns: Vec<String> = header
        .iter()
        .map(|c| read_cell(c).unwrap_or_default().trim().to_string())
        .collect();
    debug!("read_xlsx_table: header: {:?}", columns);

    let rows: Vec<Vec<Cell>> = iter.map(|row| row.iter().map(read_cell).collect()).collect();
    info!("read_xlsx_table: {:?}: {} records", path, rows.len());
    Ok(Table::from_rows(columns, rows))
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> IntakeResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}

/// The text of a cell. Numbers without a fractional part are written as integers, so
/// that ids and ages read the same as in the CSV exports.
fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => None,
        DataType::String(s) if s.is_empty() => None,
        DataType::String(s) => Some(s.clone()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Some((*f as i64).to_string())
        }
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        // Serial day number, as stored by Excel.
        DataType::DateTime(f) => Some(f.to_string()),
        DataType::Error(e) => {
            warn!("read_cell: error cell {:?}", e);
            None
        }
    }
}
