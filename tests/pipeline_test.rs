mod common;

use common::{approx_eq, table_set};
use polars::prelude::*;
use tabplot::missing::{handle_missing, MissingPolicy};
use tabplot::outliers::{handle_outliers, quantile, OutlierPolicy};
use tabplot::pipeline::{align_series, prepare_frame, Cleaning, ErrorSource, SeriesRequest};
use tabplot::scale::{transform, Scale};
use tabplot::table::Frame;
use tabplot::{ColumnRef, RowWindow, Table};

fn table(df: DataFrame) -> Table {
    Table::new("t.csv", df)
}

#[test]
fn test_fill_mean_then_cap_one_percent() {
    let t = table(df! { "v" => [Some(1.0), Some(2.0), None, Some(4.0), Some(100.0)] }.unwrap());
    let cleaning = Cleaning::new(RowWindow::default(), MissingPolicy::FillMean, OutlierPolicy::Cap1);
    let frame = prepare_frame(&t, &["v"], &[], cleaning).unwrap();

    let filled = [Some(1.0), Some(2.0), Some(26.75), Some(4.0), Some(100.0)];
    let lo = quantile(&filled, 0.01).unwrap();
    let hi = quantile(&filled, 0.99).unwrap();

    let values: Vec<f64> = frame.numeric("v").unwrap().into_iter().flatten().collect();
    assert_eq!(frame.height(), 5);
    assert_eq!(values.len(), 5);
    assert!(approx_eq(values[2], 26.75));
    assert!(values.iter().all(|v| *v >= lo && *v <= hi));
    assert!(values[0] > 1.0);
    assert!(values[4] < 100.0);
}

#[test]
fn test_log10_keeps_positive_values_only() {
    let values = [Some(-1.0), Some(0.0), Some(1.0), Some(10.0), Some(100.0)];
    let out = transform(&[0, 1, 2, 3, 4], &values, Scale::Log10);
    assert_eq!(out.values, vec![0.0, 1.0, 2.0]);
    assert_eq!(out.index, vec![2, 3, 4]);
}

#[test]
fn test_log10_through_the_pipeline() {
    let tables = table_set(&[("a.csv", "v\n-1\n0\n1\n10\n100\n")]);
    let request = SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Log10);
    let out = align_series(&tables, &request, Cleaning::default())
        .unwrap()
        .unwrap();
    assert_eq!(out.y.values, vec![0.0, 1.0, 2.0]);
    assert_eq!(out.x.values, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_error_column_intersection_yields_three_points() {
    let tables = table_set(&[(
        "a.csv",
        "v,err\n1,0.1\n2,\n3,0.2\n4,\n5,0.3\n",
    )]);
    let mut request = SeriesRequest::new(ColumnRef::parse("a.csv||v"), Scale::Linear, Scale::Linear);
    request.yerr = Some(ErrorSource::Column(ColumnRef::parse("a.csv||err")));
    let out = align_series(&tables, &request, Cleaning::default())
        .unwrap()
        .unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.labels(), &[0, 2, 4]);
    assert_eq!(out.yerr.unwrap().len(), 3);
}

#[test]
fn test_drop_rows_removes_exactly_the_incomplete_rows() {
    let t = table(
        df! {
            "x" => [Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
            "y" => [Some(1.0), None, Some(3.0), None, Some(5.0), Some(6.0)],
            "z" => [None, Some(1.0), None, Some(1.0), None, Some(1.0)],
        }
        .unwrap(),
    );
    let frame = Frame::from_table(&t, &["x", "y", "z"], RowWindow::default()).unwrap();
    let out = handle_missing(&frame, &["x", "y"], MissingPolicy::DropRows).unwrap();
    // Rows 1 and 3 miss x or y; z is out of scope.
    assert_eq!(out.height(), 6 - 2);
    assert_eq!(out.index(), &[0, 2, 4, 5]);
}

#[test]
fn test_iqr_filters_columns_in_sequence() {
    let t = table(
        df! {
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
            "b" => [100.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        }
        .unwrap(),
    );
    let frame = Frame::from_table(&t, &["a", "b"], RowWindow::default()).unwrap();
    let out = handle_outliers(&frame, &["a", "b"], OutlierPolicy::OutsideIqr).unwrap();
    assert_eq!(out.index(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    let a: Vec<f64> = out.numeric("a").unwrap().into_iter().flatten().collect();
    assert!(a.iter().all(|v| *v <= 14.5));
}

#[test]
fn test_window_applies_before_cleaning() {
    let t = table(df! { "v" => [Some(1000.0), Some(1.0), None, Some(3.0)] }.unwrap());
    let cleaning = Cleaning::new(
        RowWindow::new(1, None),
        MissingPolicy::FillMean,
        OutlierPolicy::Ignore,
    );
    let frame = prepare_frame(&t, &["v"], &[], cleaning).unwrap();
    // The mean comes from the window only.
    assert_eq!(frame.numeric("v").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(frame.index(), &[1, 2, 3]);
}

#[test]
fn test_carried_column_follows_dropped_rows() {
    let t = table(
        df! {
            "v" => [Some(1.0), None, Some(3.0)],
            "g" => ["a", "b", "c"],
        }
        .unwrap(),
    );
    let cleaning = Cleaning::new(RowWindow::default(), MissingPolicy::DropRows, OutlierPolicy::Ignore);
    let frame = prepare_frame(&t, &["v"], &["g"], cleaning).unwrap();
    assert_eq!(
        frame.text("g").unwrap(),
        vec![Some("a".to_string()), Some("c".to_string())]
    );
}
