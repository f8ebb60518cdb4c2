//! Window, clean, scale and align the series of one chart.
//!
//! Every series is prepared on its own: the row window is sliced out of its
//! table, the missing-value policy runs, then the outlier policy, then the X
//! scale is applied to the surviving row labels and the Y scale to the values.
//! Only labels that survive on both axes are plotted. Error columns and moving
//! averages go through the same stages and are intersected afterwards.

use color_eyre::Result;

use crate::missing::{handle_missing, MissingPolicy};
use crate::outliers::{handle_outliers, OutlierPolicy};
use crate::scale::{intersect, transform, transform_labels, PlotSeries, Scale};
use crate::table::{ColumnRef, Frame, RowWindow, Table, TableSet};

/// The cleaning stages shared by every series of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cleaning {
    pub window: RowWindow,
    pub missing: MissingPolicy,
    pub outliers: OutlierPolicy,
}

impl Cleaning {
    pub fn new(window: RowWindow, missing: MissingPolicy, outliers: OutlierPolicy) -> Self {
        Self {
            window,
            missing,
            outliers,
        }
    }
}

/// Window, missing-value policy and outlier policy, in that order. `carried`
/// columns ride along (rows dropped from `columns` are dropped from them too)
/// but no policy runs on them.
pub fn prepare_frame(
    table: &Table,
    columns: &[&str],
    carried: &[&str],
    cleaning: Cleaning,
) -> Result<Frame> {
    let mut all: Vec<&str> = columns.to_vec();
    all.extend(carried.iter().copied().filter(|c| !columns.contains(c)));
    let frame = Frame::from_table(table, &all, cleaning.window)?;
    log::debug!(
        "'{}' window {:?}: {} rows",
        table.name,
        cleaning.window,
        frame.height()
    );
    let frame = handle_missing(&frame, columns, cleaning.missing)?;
    handle_outliers(&frame, columns, cleaning.outliers)
}

/// Trailing rolling mean with a minimum of one observation. Missing values are
/// skipped inside a window; a window with nothing in it stays missing.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}

/// Where an error bar's size comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSource {
    /// The same size at every point.
    Constant(f64),
    /// Sizes read from another column, cleaned like the parent series.
    Column(ColumnRef),
}

/// One series to align.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub column: ColumnRef,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub xerr: Option<ErrorSource>,
    pub yerr: Option<ErrorSource>,
    /// Moving-average window, when one is requested.
    pub moving_average: Option<usize>,
}

impl SeriesRequest {
    pub fn new(column: ColumnRef, x_scale: Scale, y_scale: Scale) -> Self {
        Self {
            column,
            x_scale,
            y_scale,
            xerr: None,
            yerr: None,
            moving_average: None,
        }
    }
}

/// Plot-ready coordinates of one series. `x`, `y` and the error series share
/// the same labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedSeries {
    pub x: PlotSeries,
    pub y: PlotSeries,
    pub xerr: Option<PlotSeries>,
    pub yerr: Option<PlotSeries>,
    /// Moving average as `(x, y)`, aligned against X on its own.
    pub moving_average: Option<(PlotSeries, PlotSeries)>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn labels(&self) -> &[usize] {
        &self.y.index
    }
}

/// Values of one referenced column after window, cleaning and `scale`.
/// `None` when the table or column does not exist.
pub fn clean_column(
    tables: &TableSet,
    column_ref: &ColumnRef,
    cleaning: Cleaning,
    scale: Scale,
) -> Result<Option<(Frame, PlotSeries)>> {
    let Some(table) = lookup(tables, column_ref) else {
        return Ok(None);
    };
    let column = column_ref.column.as_str();
    let frame = prepare_frame(table, &[column], &[], cleaning)?;
    let values = frame.coerced(column)?;
    let series = transform(frame.index(), &values, scale);
    Ok(Some((frame, series)))
}

fn lookup<'a>(tables: &'a TableSet, column_ref: &ColumnRef) -> Option<&'a Table> {
    match tables.resolve(column_ref) {
        Ok(table) if table.has_column(&column_ref.column) => Some(table),
        _ => {
            log::warn!("column '{}' not found, skipping", column_ref);
            None
        }
    }
}

/// Run the whole pipeline for one series. `None` when its column does not exist.
pub fn align_series(
    tables: &TableSet,
    request: &SeriesRequest,
    cleaning: Cleaning,
) -> Result<Option<AlignedSeries>> {
    let Some((frame, y)) = clean_column(tables, &request.column, cleaning, request.y_scale)? else {
        return Ok(None);
    };
    let x = transform_labels(frame.index(), request.x_scale);
    let mut common = intersect(&x.index, &y.index);

    let yerr = match &request.yerr {
        Some(source) => error_series(tables, source, cleaning, request.y_scale, &mut common)?,
        None => None,
    };
    let xerr = match &request.xerr {
        Some(source) => error_series(tables, source, cleaning, request.x_scale, &mut common)?,
        None => None,
    };

    let moving_average = match request.moving_average {
        Some(window) => {
            let raw = frame.coerced(&request.column.column)?;
            let averaged = moving_average(&raw, window);
            let ma = transform(frame.index(), &averaged, request.y_scale);
            let ma_labels = intersect(&x.index, &ma.index);
            Some((x.restrict(&ma_labels), ma.restrict(&ma_labels)))
        }
        None => None,
    };

    let aligned = AlignedSeries {
        x: x.restrict(&common),
        y: y.restrict(&common),
        xerr: xerr.map(|e| e.restrict(&common)),
        yerr: yerr.map(|e| e.restrict(&common)),
        moving_average,
    };
    log::debug!(
        "series '{}': {} of {} cleaned rows plotted",
        request.column,
        aligned.len(),
        frame.height()
    );
    Ok(Some(aligned))
}

/// Build one error series and narrow `common` to the labels it covers.
/// Constant errors only apply when positive and never narrow the labels.
fn error_series(
    tables: &TableSet,
    source: &ErrorSource,
    cleaning: Cleaning,
    scale: Scale,
    common: &mut Vec<usize>,
) -> Result<Option<PlotSeries>> {
    match source {
        ErrorSource::Constant(size) if *size > 0.0 => Ok(Some(PlotSeries {
            index: common.clone(),
            values: vec![*size; common.len()],
        })),
        ErrorSource::Constant(_) => Ok(None),
        ErrorSource::Column(column_ref) => {
            let Some((_, series)) = clean_column(tables, column_ref, cleaning, scale)? else {
                return Ok(None);
            };
            let series = series.map(f64::abs);
            *common = intersect(common, &series.index);
            Ok(Some(series))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn tables() -> TableSet {
        let mut set = TableSet::new();
        set.push(Table::new(
            "a.csv",
            df! {
                "v" => [Some(1.0), Some(2.0), None, Some(4.0), Some(8.0)],
                "err" => [Some(0.5), None, Some(-0.5), Some(0.25), None],
                "s" => ["1", "x", "3", " 4 ", ""],
            }
            .unwrap(),
        ));
        set
    }

    #[test]
    fn test_moving_average_shrinks_at_start() {
        let values = [Some(1.0), Some(3.0), None, Some(5.0)];
        assert_eq!(
            moving_average(&values, 2),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0)]
        );
        assert_eq!(moving_average(&[None, None], 3), vec![None, None]);
    }

    #[test]
    fn test_align_drops_missing_labels() {
        let request = SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Linear);
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.labels(), &[0, 1, 3, 4]);
        assert_eq!(out.x.values, vec![0.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_log_x_drops_label_zero() {
        let request = SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Log10, Scale::Linear);
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.labels(), &[1, 3, 4]);
    }

    #[test]
    fn test_text_values_are_coerced() {
        let request = SeriesRequest::new(ColumnRef::parse("s"), Scale::Linear, Scale::Linear);
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.labels(), &[0, 2, 3]);
        assert_eq!(out.y.values, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_error_column_narrows_and_is_absolute() {
        let mut request =
            SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Linear);
        request.yerr = Some(ErrorSource::Column(ColumnRef::parse("a.csv||err")));
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        assert_eq!(out.labels(), &[0, 3]);
        assert_eq!(out.yerr.unwrap().values, vec![0.5, 0.25]);
    }

    #[test]
    fn test_constant_error_needs_positive_size() {
        let mut request =
            SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Linear);
        request.yerr = Some(ErrorSource::Constant(0.0));
        request.xerr = Some(ErrorSource::Constant(0.3));
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        assert!(out.yerr.is_none());
        assert_eq!(out.xerr.unwrap().values, vec![0.3; 4]);
    }

    #[test]
    fn test_moving_average_aligned_on_its_own() {
        let mut request =
            SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Linear);
        request.moving_average = Some(2);
        let out = align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .unwrap();
        let (x, y) = out.moving_average.unwrap();
        // Row 2 is missing in the data but its window still holds row 1.
        assert_eq!(x.index, vec![0, 1, 2, 3, 4]);
        assert_eq!(y.values, vec![1.0, 1.5, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_unknown_column_is_none() {
        let request = SeriesRequest::new(ColumnRef::parse("a.csv||nope"), Scale::Linear, Scale::Linear);
        assert!(align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .is_none());
        let request = SeriesRequest::new(ColumnRef::parse("b.csv||v"), Scale::Linear, Scale::Linear);
        assert!(align_series(&tables(), &request, Cleaning::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_window_keeps_labels() {
        let request = SeriesRequest::new(ColumnRef::parse("v"), Scale::Linear, Scale::Linear);
        let cleaning = Cleaning::new(
            RowWindow::new(2, Some(5)),
            MissingPolicy::DropRows,
            OutlierPolicy::Ignore,
        );
        let out = align_series(&tables(), &request, cleaning).unwrap().unwrap();
        assert_eq!(out.labels(), &[3, 4]);
        assert_eq!(out.y.values, vec![4.0, 8.0]);
    }
}
