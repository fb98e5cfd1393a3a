use log::warn;
use polars::prelude::*;

/// A single cell. `None` is a null (an empty CSV field).
pub type Cell = Option<String>;

/// An in-memory table of survey records, stored as a polars `DataFrame` of text columns.
///
/// Columns are addressed by name and every column is of type `Utf8`.
/// All the transformations return a new table and leave the receiver untouched.
#[derive(Debug, Clone, Default)]
pub struct Table {
    frame: DataFrame,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Table {
        let series = unique_names(columns)
            .iter()
            .map(|c| Series::new_empty(c, &DataType::Utf8))
            .collect();
        Table {
            frame: DataFrame::new_no_checks(series),
        }
    }

    /// Builds a table from raw rows. Short rows are padded with nulls and long rows
    /// are truncated to the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Table {
        let columns = unique_names(columns);
        let mut values: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for mut r in rows {
            r.resize(columns.len(), None);
            for (col, v) in values.iter_mut().zip(r) {
                col.push(v);
            }
        }
        let series = columns
            .iter()
            .zip(values)
            .map(|(c, v)| Series::new(c, v))
            .collect();
        Table {
            frame: DataFrame::new_no_checks(series),
        }
    }

    /// Builds a table column by column. All the columns must have the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Cell>)>) -> Table {
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        assert!(
            columns.iter().all(|(_, v)| v.len() == height),
            "columns of different lengths"
        );
        let (names, values): (Vec<String>, Vec<Vec<Cell>>) = columns.into_iter().unzip();
        let series = unique_names(names)
            .iter()
            .zip(values)
            .map(|(c, v)| Series::new(c, v))
            .collect();
        Table {
            frame: DataFrame::new_no_checks(series),
        }
    }

    /// Wraps a data frame. Columns that are not text are cast to text.
    pub fn from_frame(frame: DataFrame) -> PolarsResult<Table> {
        let series = frame
            .get_columns()
            .iter()
            .map(|s| s.cast(&DataType::Utf8))
            .collect::<PolarsResult<Vec<Series>>>()?;
        Ok(Table {
            frame: DataFrame::new_no_checks(series),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// The cells, row by row.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        let columns: Vec<Vec<Cell>> = self
            .frame
            .get_column_names()
            .iter()
            .map(|c| self.column_values(c).unwrap_or_default())
            .collect();
        (0..self.len())
            .map(|i| columns.iter().map(|c| c.get(i).cloned().flatten()).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.frame.get_column_names().iter().position(|c| *c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn text(&self, column: &str) -> Option<&Utf8Chunked> {
        self.frame.column(column).ok()?.utf8().ok()
    }

    /// The value of a cell, if both the row and the column exist and the cell is not null.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        if row >= self.len() {
            return None;
        }
        self.text(column)?.get(row)
    }

    /// All the cells of a column, or `None` when the column is absent.
    pub fn column_values(&self, column: &str) -> Option<Vec<Cell>> {
        let ca = self.text(column)?;
        Some(ca.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Replaces the content of a column, or appends it if it does not exist yet.
    pub fn with_column(&self, name: &str, values: Vec<Cell>) -> Table {
        assert!(
            self.frame.width() == 0 || values.len() == self.len(),
            "column {} does not match the number of rows",
            name
        );
        let series = Series::new(name, values);
        let mut columns = self.frame.get_columns().to_vec();
        match self.column_index(name) {
            Some(idx) => columns[idx] = series,
            None => columns.push(series),
        }
        Table {
            frame: DataFrame::new_no_checks(columns),
        }
    }

    /// Drops columns. Unknown names are ignored.
    pub fn without_columns(&self, names: &[&str]) -> Table {
        Table {
            frame: self.frame.drop_many(names),
        }
    }

    /// Renames a column. Does nothing if the column is absent.
    pub fn renamed(&self, from: &str, to: &str) -> PolarsResult<Table> {
        let mut frame = self.frame.clone();
        if self.has_column(from) {
            frame.rename(from, to)?;
        }
        Ok(Table { frame })
    }

    /// Projects the table on the given columns, in the given order.
    /// Unknown names are skipped.
    pub fn select(&self, names: &[String]) -> PolarsResult<Table> {
        let known: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| self.has_column(n))
            .collect();
        Ok(Table {
            frame: self.frame.select(known)?,
        })
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> PolarsResult<Table>
    where
        F: FnMut(&Row) -> bool,
    {
        let mask: Vec<bool> = self.iter_rows().map(|r| keep(&r)).collect();
        let frame = self.frame.filter(&BooleanChunked::new("keep", mask.as_slice()))?;
        Ok(Table { frame })
    }

    /// Stacks the rows of `other` below the rows of this table.
    ///
    /// The columns of this table come first, followed by the columns only present in
    /// `other`. Cells missing on either side are null.
    pub fn append(&self, other: &Table) -> PolarsResult<Table> {
        let mut columns = self.columns();
        for c in other.columns() {
            if !columns.contains(&c) {
                columns.push(c);
            }
        }
        let top = self.padded(&columns)?;
        let bottom = other.padded(&columns)?;
        let mut frame = top.vstack(&bottom)?;
        frame.align_chunks();
        Ok(Table { frame })
    }

    /// The frame with null columns added for the missing names, in the given order.
    fn padded(&self, columns: &[String]) -> PolarsResult<DataFrame> {
        let mut frame = self.frame.clone();
        for c in columns {
            if !self.has_column(c) {
                frame.with_column(Series::new(c, vec![None::<&str>; self.len()]))?;
            }
        }
        frame.select(columns)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.len()).map(move |index| Row { table: self, index })
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Table) -> bool {
        self.columns() == other.columns() && self.rows() == other.rows()
    }
}

impl Eq for Table {}

/// Renames repeated header names to `<name>_duplicated_<n>`.
fn unique_names(columns: Vec<String>) -> Vec<String> {
    let mut res: Vec<String> = Vec::with_capacity(columns.len());
    for c in columns {
        if !res.contains(&c) {
            res.push(c);
            continue;
        }
        let renamed = (0..)
            .map(|n| format!("{}_duplicated_{}", c, n))
            .find(|r| !res.contains(r))
            .unwrap_or_default();
        warn!("unique_names: repeated column {:?} renamed to {:?}", c, renamed);
        res.push(renamed);
    }
    res
}

/// A borrowed view on one row of a table.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table.get(self.index, column)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Convenience for tests and literal tables.
pub fn cell(s: &str) -> Cell {
    Some(s.to_string())
}
