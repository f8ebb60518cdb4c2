//! Outlier policies over the numeric columns of a frame.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::table::Frame;

/// |z| at or above this removes the row.
pub const Z_LIMIT: f64 = 3.0;
pub const IQR_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutlierPolicy {
    #[default]
    #[serde(rename = "Ignore")]
    Ignore,
    #[serde(rename = "Cap 0.1%")]
    Cap01,
    #[serde(rename = "Cap 1%")]
    Cap1,
    #[serde(rename = "Cap 5%")]
    Cap5,
    #[serde(rename = "Outside 1.5×IQR")]
    OutsideIqr,
    #[serde(rename = "Remove rows (|z-score|>3)")]
    ZScore,
}

impl OutlierPolicy {
    pub const ALL: [Self; 6] = [
        Self::Ignore,
        Self::Cap01,
        Self::Cap1,
        Self::Cap5,
        Self::OutsideIqr,
        Self::ZScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "Ignore",
            Self::Cap01 => "Cap 0.1%",
            Self::Cap1 => "Cap 1%",
            Self::Cap5 => "Cap 5%",
            Self::OutsideIqr => "Outside 1.5×IQR",
            Self::ZScore => "Remove rows (|z-score|>3)",
        }
    }

    /// Lower tail fraction for the capping policies.
    pub fn cap_fraction(self) -> Option<f64> {
        match self {
            Self::Cap01 => Some(0.001),
            Self::Cap1 => Some(0.01),
            Self::Cap5 => Some(0.05),
            _ => None,
        }
    }
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Quantile of the present values.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    quantile_sorted(&sorted, q)
}

/// Apply `policy` to the numeric subset of `columns` on a copy of `frame`.
pub fn handle_outliers(frame: &Frame, columns: &[&str], policy: OutlierPolicy) -> Result<Frame> {
    let numeric = frame.numeric_subset(columns);
    let mut out = frame.clone();
    if numeric.is_empty() {
        return Ok(out);
    }
    match policy {
        OutlierPolicy::Ignore => {}
        OutlierPolicy::Cap01 | OutlierPolicy::Cap1 | OutlierPolicy::Cap5 => {
            let p = policy.cap_fraction().unwrap_or_default();
            for column in numeric {
                let values = out.numeric(column)?;
                let (Some(lo), Some(hi)) = (quantile(&values, p), quantile(&values, 1.0 - p)) else {
                    continue;
                };
                let capped = values
                    .into_iter()
                    .map(|v| v.map(|x| x.clamp(lo, hi)))
                    .collect();
                out.set_numeric(column, capped)?;
            }
        }
        OutlierPolicy::OutsideIqr => {
            // Each column's fences come from the rows that survived the previous columns.
            for column in numeric {
                let values = out.numeric(column)?;
                let (Some(q1), Some(q3)) = (quantile(&values, 0.25), quantile(&values, 0.75)) else {
                    out.retain_rows(&vec![false; values.len()])?;
                    continue;
                };
                let iqr = q3 - q1;
                let (lo, hi) = (q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr);
                let keep: Vec<bool> = values
                    .iter()
                    .map(|v| v.is_some_and(|x| x >= lo && x <= hi))
                    .collect();
                out.retain_rows(&keep)?;
            }
        }
        OutlierPolicy::ZScore => {
            let mut keep = vec![true; out.height()];
            for column in numeric {
                let z = z_scores(&out.numeric(column)?);
                for (k, z) in keep.iter_mut().zip(z) {
                    *k &= z.is_some_and(|z| z.abs() < Z_LIMIT);
                }
            }
            out.retain_rows(&keep)?;
        }
    }
    log::debug!(
        "outlier policy '{}': {} -> {} rows",
        policy.as_str(),
        frame.height(),
        out.height()
    );
    Ok(out)
}

/// Population z-scores over the present values. A constant column has no
/// z-scores, so every row fails the |z| limit.
pub fn z_scores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return vec![None; values.len()];
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    values
        .iter()
        .map(|v| v.filter(|_| std > 0.0).map(|x| (x - mean) / std))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::quantile;
    use crate::table::{RowWindow, Table};
    use polars::prelude::*;

    fn frame(df: DataFrame) -> Frame {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        Frame::from_table(&Table::new("t", df.clone()), &refs, RowWindow::default()).unwrap()
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_cap_keeps_rows_and_bounds() {
        let values: Vec<f64> = (0..100).map(f64::from).chain([10_000.0]).collect();
        let f = frame(df! { "x" => values.clone() }.unwrap());
        let out = handle_outliers(&f, &["x"], OutlierPolicy::Cap1).unwrap();
        assert_eq!(out.height(), f.height());
        let hi = quantile(&values.iter().map(|v| Some(*v)).collect::<Vec<_>>(), 0.99).unwrap();
        let capped = out.numeric("x").unwrap();
        assert!(capped.iter().flatten().all(|v| *v <= hi + 1e-9));
    }

    #[test]
    fn test_cap_leaves_missing_alone() {
        let f = frame(df! { "x" => [Some(1.0), None, Some(3.0)] }.unwrap());
        let out = handle_outliers(&f, &["x"], OutlierPolicy::Cap5).unwrap();
        assert_eq!(out.numeric("x").unwrap()[1], None);
    }

    #[test]
    fn test_iqr_is_sequential() {
        // Column a removes the last row; b's quartiles are then computed on rows 0..=4 only,
        // which puts row 4 outside the fences. Over all six rows it would survive.
        let f = frame(
            df! {
                "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 1000.0],
                "b" => [0.0, 0.0, 0.0, 0.0, 4.0, 100.0],
            }
            .unwrap(),
        );
        let out = handle_outliers(&f, &["a", "b"], OutlierPolicy::OutsideIqr).unwrap();
        assert_eq!(out.index(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_iqr_drops_missing() {
        let f = frame(df! { "x" => [Some(1.0), None, Some(2.0), Some(3.0)] }.unwrap());
        let out = handle_outliers(&f, &["x"], OutlierPolicy::OutsideIqr).unwrap();
        assert_eq!(out.index(), &[0, 2, 3]);
    }

    #[test]
    fn test_zscore_removes_extreme_rows() {
        let mut values = vec![0.0; 20];
        values.push(100.0);
        let f = frame(df! { "x" => values }.unwrap());
        let out = handle_outliers(&f, &["x"], OutlierPolicy::ZScore).unwrap();
        assert_eq!(out.height(), 20);
        assert!(!out.index().contains(&20));
    }

    #[test]
    fn test_zscore_constant_column_drops_every_row() {
        let f = frame(
            df! {
                "c" => [2.0, 2.0, 2.0, 2.0],
                "v" => [1.0, 2.0, 3.0, 4.0],
            }
            .unwrap(),
        );
        assert_eq!(z_scores(&f.numeric("c").unwrap()), vec![None; 4]);
        let out = handle_outliers(&f, &["c", "v"], OutlierPolicy::ZScore).unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_text_only_is_identity() {
        let f = frame(df! { "s" => ["a", "b"] }.unwrap());
        let out = handle_outliers(&f, &["s"], OutlierPolicy::ZScore).unwrap();
        assert_eq!(out.height(), 2);
    }
}
