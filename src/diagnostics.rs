//! Read-only data checks reported before cleaning.

use color_eyre::Result;
use std::fmt;

use crate::table::{ColumnRef, Frame, RowWindow, TableSet};

/// Result of [`check_missing_and_mismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnosis {
    /// Any requested column has at least one missing cell.
    pub has_missing: bool,
    /// The requested columns holding missing cells, in request order.
    pub missing_columns: Vec<String>,
    /// The requested columns do not all have the same number of valid cells.
    pub count_mismatch: bool,
    /// Valid (non-missing) cell count per requested column, in request order.
    pub valid_counts: Vec<(String, usize)>,
}

impl Diagnosis {
    pub fn warnings(&self) -> Vec<Warning> {
        let mut out = Vec::new();
        if self.has_missing {
            out.push(Warning::MissingValues(self.missing_columns.clone()));
        }
        if self.count_mismatch {
            out.push(Warning::CountMismatch(self.valid_counts.clone()));
        }
        out
    }
}

/// Look for missing cells and unequal valid counts across `columns`.
/// Columns absent from the frame are skipped.
pub fn check_missing_and_mismatch(frame: &Frame, columns: &[&str]) -> Result<Diagnosis> {
    let mut diagnosis = Diagnosis::default();
    for column in frame.present(columns) {
        let mask = frame.missing_mask(column)?;
        let missing = mask.iter().filter(|m| **m).count();
        if missing > 0 {
            diagnosis.has_missing = true;
            diagnosis.missing_columns.push(column.to_string());
        }
        diagnosis
            .valid_counts
            .push((column.to_string(), mask.len() - missing));
    }
    if let Some((_, first)) = diagnosis.valid_counts.first() {
        diagnosis.count_mismatch = diagnosis.valid_counts.iter().any(|(_, n)| n != first);
    }
    Ok(diagnosis)
}

/// The references whose windowed slice holds at least one missing cell.
/// References to unknown tables or columns are skipped.
pub fn missing_in_refs(tables: &TableSet, refs: &[String], window: RowWindow) -> Result<Vec<String>> {
    let mut flagged = Vec::new();
    for text in refs {
        let column_ref = ColumnRef::parse(text);
        let Ok(table) = tables.resolve(&column_ref) else {
            continue;
        };
        if !table.has_column(&column_ref.column) {
            continue;
        }
        let frame = Frame::from_table(table, &[column_ref.column.as_str()], window)?;
        if frame.missing_mask(&column_ref.column)?.iter().any(|m| *m) {
            flagged.push(text.clone());
        }
    }
    Ok(flagged)
}

/// Advisory findings raised while preparing a chart. None of these stop a render
/// except where the chart itself cannot be drawn, in which case the warning says so.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    MissingValues(Vec<String>),
    CountMismatch(Vec<(String, usize)>),
    /// Column references in a multi-series chart that contain missing cells.
    MissingInSeries(Vec<String>),
    NotNumeric { column: String, chart: String },
    NoData { chart: String },
    ColumnNotFound(String),
    NegativeValues(String),
    TooFewValues { column: String, needed: usize },
    InvalidColor(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingValues(columns) => {
                write!(f, "The selected columns contain missing values: {}", columns.join(", "))
            }
            Warning::CountMismatch(counts) => {
                let parts: Vec<String> = counts
                    .iter()
                    .map(|(c, n)| format!("{} ({})", c, n))
                    .collect();
                write!(
                    f,
                    "The selected columns have different numbers of valid values: {}",
                    parts.join(", ")
                )
            }
            Warning::MissingInSeries(refs) => {
                write!(f, "Some chosen columns contain missing values: {}", refs.join(", "))
            }
            Warning::NotNumeric { column, chart } => write!(
                f,
                "Column '{}' is not numeric; a {} needs numeric data. Choose another column.",
                column, chart
            ),
            Warning::NoData { chart } => write!(
                f,
                "No data left to draw the {} after cleaning. Adjust the row window or cleaning options.",
                chart
            ),
            Warning::ColumnNotFound(column) => write!(f, "Column not found: {}", column),
            Warning::NegativeValues(column) => write!(
                f,
                "Column '{}' has negative values; a pie chart needs non-negative values.",
                column
            ),
            Warning::TooFewValues { column, needed } => write!(
                f,
                "Column '{}' needs at least {} distinct values for this chart.",
                column, needed
            ),
            Warning::InvalidColor(value) => {
                write!(f, "Could not parse color '{}'; using the named color instead.", value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use polars::prelude::*;

    fn frame() -> Frame {
        let df = df! {
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some(1.0), Some(2.0), Some(3.0)],
            "c" => [Some("x"), None, None],
        }
        .unwrap();
        Frame::from_table(&Table::new("t", df), &["a", "b", "c"], RowWindow::default()).unwrap()
    }

    #[test]
    fn test_reports_missing_and_mismatch() {
        let d = check_missing_and_mismatch(&frame(), &["a", "b", "zzz"]).unwrap();
        assert!(d.has_missing);
        assert!(d.count_mismatch);
        assert_eq!(
            d.valid_counts,
            vec![("a".to_string(), 2), ("b".to_string(), 3)]
        );
        assert_eq!(d.warnings().len(), 2);
        assert_eq!(d.warnings()[0], Warning::MissingValues(vec!["a".to_string()]));
    }

    #[test]
    fn test_missing_values_warning_names_only_gappy_columns() {
        let d = check_missing_and_mismatch(&frame(), &["b", "c", "a"]).unwrap();
        assert_eq!(d.missing_columns, vec!["c".to_string(), "a".to_string()]);
        assert!(d
            .warnings()
            .contains(&Warning::MissingValues(vec!["c".to_string(), "a".to_string()])));
    }

    #[test]
    fn test_clean_columns_have_no_findings() {
        let d = check_missing_and_mismatch(&frame(), &["b"]).unwrap();
        assert!(!d.has_missing);
        assert!(!d.count_mismatch);
        assert!(d.warnings().is_empty());
    }

    #[test]
    fn test_missing_in_refs_respects_window() {
        let mut tables = TableSet::new();
        tables.push(Table::new(
            "t",
            df! { "a" => [Some(1.0), None, Some(3.0)] }.unwrap(),
        ));
        let refs = vec!["t||a".to_string(), "t||nope".to_string(), "x||a".to_string()];
        assert_eq!(
            missing_in_refs(&tables, &refs, RowWindow::default()).unwrap(),
            vec!["t||a".to_string()]
        );
        assert!(missing_in_refs(&tables, &refs, RowWindow::new(2, None))
            .unwrap()
            .is_empty());
    }
}
