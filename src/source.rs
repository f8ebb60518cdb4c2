//! File ingestion: delimited text through the polars CSV reader, spreadsheets
//! (first sheet only) through calamine.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tabplot_cli::FileFormat;

use crate::error_display::{user_message_from_report, user_message_from_spreadsheet};
use crate::table::{Table, TableSet};

/// CSV reader knobs, from the `[loading]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows scanned to infer column types; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    /// Unparsable cells become missing instead of failing the file.
    pub ignore_errors: bool,
    /// Read every file as this format instead of going by its extension.
    pub format: Option<FileFormat>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: Some(100),
            ignore_errors: false,
            format: None,
        }
    }
}

/// Load one file. The table is named after the file name.
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Table> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_bytes(&name, bytes, options)
}

/// Load a file held in memory. An unknown extension is tried as CSV first,
/// then as a spreadsheet.
pub fn load_bytes(name: &str, bytes: Vec<u8>, options: &LoadOptions) -> Result<Table> {
    let format = options
        .format
        .or_else(|| FileFormat::from_path(Path::new(name)));
    let df = match format {
        Some(FileFormat::Csv) => read_delimited(bytes, b',', options)?,
        Some(FileFormat::Tsv) => read_delimited(bytes, b'\t', options)?,
        Some(FileFormat::Excel) => read_spreadsheet(bytes)?,
        None => match read_delimited(bytes.clone(), b',', options) {
            Ok(df) => df,
            Err(csv_err) => {
                log::debug!("'{}' is not CSV ({}), trying spreadsheet", name, csv_err);
                read_spreadsheet(bytes).map_err(|_| csv_err)?
            }
        },
    };
    log::debug!("'{}': {} rows, {} columns", name, df.height(), df.width());
    Ok(Table::new(name, df))
}

fn read_delimited(bytes: Vec<u8>, separator: u8, options: &LoadOptions) -> Result<DataFrame> {
    let read_options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(options.infer_schema_length)
        .with_ignore_errors(options.ignore_errors)
        .map_parse_options(|opts| opts.with_separator(separator));
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    Ok(df)
}

fn read_spreadsheet(bytes: Vec<u8>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| eyre!("{}", user_message_from_spreadsheet(&e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| eyre!("Spreadsheet has no worksheets"))?
        .map_err(|e| eyre!("{}", user_message_from_spreadsheet(&e)))?;
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };

    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, cell) in header.iter().enumerate() {
        let raw = calamine::DataType::as_string(cell).unwrap_or_else(|| cell.to_string());
        let raw = raw.trim();
        let mut name = if raw.is_empty() {
            format!("column_{}", i + 1)
        } else {
            raw.to_string()
        };
        if names.contains(&name) {
            name = format!("{}_{}", name, i + 1);
        }
        names.push(name);
    }

    let columns = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(i)).collect();
            column_from_cells(name, &cells).into()
        })
        .collect::<Vec<Column>>();
    Ok(DataFrame::new(columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellType {
    Int,
    Float,
    Bool,
    Text,
}

/// Whole numbers read as integers, other numbers as floats, all-boolean columns
/// as booleans. Anything mixed with text is text.
fn infer_cell_type(cells: &[Option<&Data>]) -> CellType {
    use calamine::DataType;

    let (mut numbers, mut whole, mut bools) = (0usize, true, 0usize);
    for cell in cells.iter().flatten() {
        if cell.is_empty() {
            continue;
        }
        if cell.is_string() {
            return CellType::Text;
        }
        if cell.is_bool() {
            bools += 1;
        } else if cell.is_int() {
            numbers += 1;
        } else if let Some(f) = cell.as_f64() {
            numbers += 1;
            whole &= f.is_finite() && f.fract() == 0.0;
        } else {
            return CellType::Text;
        }
    }
    match (numbers, bools) {
        (0, 0) => CellType::Text,
        (0, _) => CellType::Bool,
        (_, 0) if whole => CellType::Int,
        (_, 0) => CellType::Float,
        _ => CellType::Text,
    }
}

fn column_from_cells(name: &str, cells: &[Option<&Data>]) -> Series {
    use calamine::DataType;

    fn present<'a>(c: &Option<&'a Data>) -> Option<&'a Data> {
        c.filter(|cell| !cell.is_empty())
    }
    match infer_cell_type(cells) {
        CellType::Int => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| present(c).and_then(|cell| cell.as_f64()).map(|f| f as i64))
                .collect();
            Series::new(name.into(), v)
        }
        CellType::Float => {
            let v: Vec<Option<f64>> = cells
                .iter()
                .map(|c| present(c).and_then(|cell| cell.as_f64()))
                .collect();
            Series::new(name.into(), v)
        }
        CellType::Bool => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| present(c).and_then(|cell| cell.get_bool()))
                .collect();
            Series::new(name.into(), v)
        }
        CellType::Text => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| present(c).and_then(|cell| cell.as_string()))
                .collect();
            Series::new(name.into(), v)
        }
    }
}

/// Tables that loaded, plus a user-facing message for each file that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub tables: TableSet,
    pub failures: Vec<(PathBuf, String)>,
}

/// Load every path. A failing file is reported and skipped; the rest still load.
pub fn load_all(paths: &[PathBuf], options: &LoadOptions) -> LoadReport {
    let mut report = LoadReport::default();
    for path in paths {
        match load_path(path, options) {
            Ok(table) => {
                let (rows, cols) = (table.height(), table.df.width());
                let name = report.tables.push(table);
                log::info!("loaded '{}' ({} rows, {} columns)", name, rows, cols);
            }
            Err(e) => {
                let msg = user_message_from_report(&e, Some(path));
                log::warn!("{}", msg);
                report.failures.push((path.clone(), msg));
            }
        }
    }
    report
}
