//! Loaded tables, `source||column` references, row windows and the working
//! [`Frame`] that the cleaning stages operate on.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::fmt;
use std::ops::Range;

/// Separator between the source name and the column name in a column reference.
pub const REF_SEPARATOR: &str = "||";

/// One ingested file. Immutable after loading.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub df: DataFrame,
}

impl Table {
    pub fn new(name: impl Into<String>, df: DataFrame) -> Self {
        Self {
            name: name.into(),
            df,
        }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.df.get_column_index(column).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// True when the column exists and has a numeric dtype.
    pub fn is_numeric(&self, column: &str) -> bool {
        self.df
            .column(column)
            .map(|c| c.dtype().is_numeric())
            .unwrap_or(false)
    }
}

/// All tables of one load, in load order. The first table is the primary table.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, renaming it with a ` (n)` suffix if the name is already taken.
    /// Returns the name the table was stored under.
    pub fn push(&mut self, mut table: Table) -> String {
        if self.get(&table.name).is_some() {
            let base = table.name.clone();
            let mut n = 2;
            while self.get(&format!("{} ({})", base, n)).is_some() {
                n += 1;
            }
            table.name = format!("{} ({})", base, n);
        }
        let name = table.name.clone();
        self.tables.push(table);
        name
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn primary(&self) -> Option<&Table> {
        self.tables.first()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Every column of every table as a `source||column` reference, in load order.
    pub fn all_refs(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|t| {
                t.column_names()
                    .into_iter()
                    .map(move |c| format!("{}{}{}", t.name, REF_SEPARATOR, c))
            })
            .collect()
    }

    /// Resolve a reference to its table. A reference without a source names the primary table.
    pub fn resolve(&self, column_ref: &ColumnRef) -> Result<&Table> {
        match &column_ref.source {
            Some(source) => self
                .get(source)
                .ok_or_else(|| eyre!("No loaded file named '{}'", source)),
            None => self
                .primary()
                .ok_or_else(|| eyre!("No files are loaded")),
        }
    }
}

/// A `(table, column)` pair, written `source||column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub source: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// Split at the first `||`. Text without a separator is a column of the primary table.
    pub fn parse(text: &str) -> Self {
        match text.split_once(REF_SEPARATOR) {
            Some((source, column)) => Self {
                source: Some(source.to_string()),
                column: column.to_string(),
            },
            None => Self {
                source: None,
                column: text.to_string(),
            },
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}{}{}", source, REF_SEPARATOR, self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// Half-open row range `[start, end)`. `end = None` means "to the end of the table".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowWindow {
    pub start: usize,
    pub end: Option<usize>,
}

impl RowWindow {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Clamp to a table of `height` rows. An inverted window is empty.
    pub fn resolve(&self, height: usize) -> Range<usize> {
        let end = self.end.unwrap_or(height).min(height);
        let start = self.start.min(end);
        start..end
    }
}

/// A windowed copy of some columns of a table, together with the original
/// row labels of the rows that are still alive.
#[derive(Debug, Clone)]
pub struct Frame {
    df: DataFrame,
    index: Vec<usize>,
}

impl Frame {
    pub fn new(df: DataFrame, index: Vec<usize>) -> Result<Self> {
        if df.width() > 0 && df.height() != index.len() {
            return Err(eyre!(
                "Row labels ({}) do not match frame height ({})",
                index.len(),
                df.height()
            ));
        }
        Ok(Self { df, index })
    }

    /// Slice `window` out of `table`, keeping only the requested columns that exist.
    pub fn from_table(table: &Table, columns: &[&str], window: RowWindow) -> Result<Self> {
        let range = window.resolve(table.height());
        let present: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| table.has_column(c))
            .collect();
        let mut seen = Vec::with_capacity(present.len());
        for c in present {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        let df = table
            .df
            .select(seen)?
            .slice(range.start as i64, range.len());
        Ok(Self {
            df,
            index: range.collect(),
        })
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Original row labels of the surviving rows.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.df.get_column_index(column).is_some()
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.df
            .column(column)
            .map(|c| c.dtype().is_numeric())
            .unwrap_or(false)
    }

    /// The requested columns that exist in the frame, deduplicated, in request order.
    pub fn present<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        let mut out: Vec<&'a str> = Vec::new();
        for &c in columns {
            if self.has_column(c) && !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    /// The requested columns that exist and are numeric.
    pub fn numeric_subset<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        self.present(columns)
            .into_iter()
            .filter(|c| self.is_numeric(c))
            .collect()
    }

    /// Values of a numeric column as `f64`. Null and NaN both read as `None`.
    pub fn numeric(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let series = self
            .df
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series
            .f64()?
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Values of any column as text. Null reads as `None`.
    pub fn text(&self, column: &str) -> Result<Vec<Option<String>>> {
        let series = self
            .df
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        Ok(series
            .str()?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Numeric view of any column: numeric columns as-is, text parsed as a number
    /// after trimming. Unparsable and missing cells are `None`.
    pub fn coerced(&self, column: &str) -> Result<Vec<Option<f64>>> {
        if self.is_numeric(column) {
            return self.numeric(column);
        }
        Ok(self
            .text(column)?
            .into_iter()
            .map(|v| {
                v.and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|x| !x.is_nan())
            })
            .collect())
    }

    /// Per-row missing flags: null, or NaN for numeric columns.
    pub fn missing_mask(&self, column: &str) -> Result<Vec<bool>> {
        if self.is_numeric(column) {
            Ok(self.numeric(column)?.iter().map(Option::is_none).collect())
        } else {
            let col = self.df.column(column)?;
            Ok(col
                .as_materialized_series()
                .is_null()
                .iter()
                .map(|v| v.unwrap_or(true))
                .collect())
        }
    }

    pub fn set_numeric(&mut self, column: &str, values: Vec<Option<f64>>) -> Result<()> {
        self.df.with_column(Series::new(column.into(), values))?;
        Ok(())
    }

    pub fn set_text(&mut self, column: &str, values: Vec<Option<String>>) -> Result<()> {
        self.df.with_column(Series::new(column.into(), values))?;
        Ok(())
    }

    /// Keep the rows whose flag is `true`; the row labels follow.
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<()> {
        if keep.len() != self.index.len() {
            return Err(eyre!(
                "Row mask length {} does not match frame height {}",
                keep.len(),
                self.index.len()
            ));
        }
        if keep.iter().all(|k| *k) {
            return Ok(());
        }
        if self.df.width() > 0 {
            let mask = BooleanChunked::from_slice("keep".into(), keep);
            self.df = self.df.filter(&mask)?;
        }
        self.index = self
            .index
            .iter()
            .zip(keep)
            .filter_map(|(i, k)| k.then_some(*i))
            .collect();
        Ok(())
    }
}
