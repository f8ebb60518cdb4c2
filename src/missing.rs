//! Missing-value policies.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::table::Frame;

/// Neighbour count for [`MissingPolicy::KnnImpute`].
pub const KNN_NEIGHBOURS: usize = 4;

/// How missing cells in the selected columns are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    #[default]
    #[serde(rename = "Ignore")]
    Ignore,
    #[serde(rename = "Drop rows")]
    DropRows,
    #[serde(rename = "Fill with mean")]
    FillMean,
    #[serde(rename = "Fill with most common value")]
    FillMode,
    #[serde(rename = "Replace with 0")]
    FillZero,
    #[serde(rename = "Interpolate")]
    Interpolate,
    #[serde(rename = "KNN (nearest 4 points)")]
    KnnImpute,
    #[serde(rename = "Replace with nearest point")]
    FillNearest,
}

impl MissingPolicy {
    pub const ALL: [Self; 8] = [
        Self::Ignore,
        Self::DropRows,
        Self::FillMean,
        Self::FillMode,
        Self::FillZero,
        Self::Interpolate,
        Self::KnnImpute,
        Self::FillNearest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "Ignore",
            Self::DropRows => "Drop rows",
            Self::FillMean => "Fill with mean",
            Self::FillMode => "Fill with most common value",
            Self::FillZero => "Replace with 0",
            Self::Interpolate => "Interpolate",
            Self::KnnImpute => "KNN (nearest 4 points)",
            Self::FillNearest => "Replace with nearest point",
        }
    }
}

/// Apply `policy` to the present `columns` of a copy of `frame`.
pub fn handle_missing(frame: &Frame, columns: &[&str], policy: MissingPolicy) -> Result<Frame> {
    let mut out = frame.clone();
    let present = frame.present(columns);
    match policy {
        MissingPolicy::Ignore => {}
        MissingPolicy::DropRows => {
            let mut keep = vec![true; out.height()];
            for column in &present {
                for (k, missing) in keep.iter_mut().zip(out.missing_mask(column)?) {
                    *k &= !missing;
                }
            }
            out.retain_rows(&keep)?;
        }
        MissingPolicy::FillMean => {
            for column in frame.numeric_subset(columns) {
                let values = out.numeric(column)?;
                if let Some(m) = mean(&values) {
                    out.set_numeric(column, fill_with(values, m))?;
                }
            }
        }
        MissingPolicy::FillMode => {
            for column in present {
                if out.is_numeric(column) {
                    let values = out.numeric(column)?;
                    if let Some(m) = numeric_mode(&values) {
                        out.set_numeric(column, fill_with(values, m))?;
                    }
                } else {
                    let values = out.text(column)?;
                    if let Some(m) = text_mode(&values) {
                        out.set_text(column, fill_with(values, m))?;
                    }
                }
            }
        }
        MissingPolicy::FillZero => {
            for column in present {
                if out.is_numeric(column) {
                    let values = out.numeric(column)?;
                    out.set_numeric(column, fill_with(values, 0.0))?;
                } else {
                    let values = out.text(column)?;
                    out.set_text(column, fill_with(values, "0".to_string()))?;
                }
            }
        }
        MissingPolicy::Interpolate => {
            for column in frame.numeric_subset(columns) {
                let values = out.numeric(column)?;
                out.set_numeric(column, interpolate_linear(&values))?;
            }
        }
        MissingPolicy::KnnImpute => {
            let subset = frame.numeric_subset(columns);
            if !subset.is_empty() {
                let matrix = subset
                    .iter()
                    .map(|c| out.numeric(c))
                    .collect::<Result<Vec<_>>>()?;
                let imputed = knn_impute(&matrix, KNN_NEIGHBOURS);
                for (column, values) in subset.into_iter().zip(imputed) {
                    out.set_numeric(column, values)?;
                }
            }
        }
        MissingPolicy::FillNearest => {
            for column in present {
                if out.is_numeric(column) {
                    let values = out.numeric(column)?;
                    out.set_numeric(column, interpolate_nearest(&values))?;
                } else {
                    let values = out.text(column)?;
                    out.set_text(column, forward_then_backward_fill(values))?;
                }
            }
        }
    }
    log::debug!(
        "missing policy '{}': {} -> {} rows",
        policy.as_str(),
        frame.height(),
        out.height()
    );
    Ok(out)
}

fn fill_with<T: Clone>(values: Vec<Option<T>>, fill: T) -> Vec<Option<T>> {
    values
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill.clone())))
        .collect()
}

pub(crate) fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Most frequent value; ties go to the smallest.
fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let run = j - i;
        if best.map_or(true, |(_, n)| run > n) {
            best = Some((sorted[i], run));
        }
        i = j;
    }
    best.map(|(v, _)| v)
}

fn text_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (v, n) in counts {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((v, n));
        }
    }
    best.map(|(v, _)| v.to_string())
}

/// Positions of the valid values bracketing each interior gap.
fn gaps(values: &[Option<f64>]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let valid: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    (0..valid.len().saturating_sub(1))
        .map(move |k| (valid[k], valid[k + 1]))
        .filter(|(lo, hi)| hi - lo > 1)
}

/// Linear in row order. Leading and trailing gaps stay missing.
pub(crate) fn interpolate_linear(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    for (lo, hi) in gaps(values) {
        let (a, b) = (values[lo].unwrap_or_default(), values[hi].unwrap_or_default());
        let span = (hi - lo) as f64;
        for (i, slot) in out.iter_mut().enumerate().take(hi).skip(lo + 1) {
            *slot = Some(a + (b - a) * (i - lo) as f64 / span);
        }
    }
    out
}

/// Nearest valid row by position; the earlier row wins a tie. Leading and trailing gaps stay missing.
pub(crate) fn interpolate_nearest(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    for (lo, hi) in gaps(values) {
        for (i, slot) in out.iter_mut().enumerate().take(hi).skip(lo + 1) {
            *slot = if i - lo <= hi - i { values[lo] } else { values[hi] };
        }
    }
    out
}

fn forward_then_backward_fill(values: Vec<Option<String>>) -> Vec<Option<String>> {
    let mut out = Vec::with_capacity(values.len());
    let mut last: Option<String> = None;
    for v in values {
        if v.is_some() {
            last = v.clone();
        }
        out.push(v.or_else(|| last.clone()));
    }
    if let Some(first) = out.iter().flatten().next().cloned() {
        for slot in out.iter_mut() {
            if slot.is_some() {
                break;
            }
            *slot = Some(first.clone());
        }
    }
    out
}

/// Fill each missing cell from the mean of the `k` nearest rows that have that column.
///
/// `columns[c][r]` is the value of column `c` in row `r`. Distance between two rows is
/// Euclidean over the coordinates both rows have, scaled by `n_columns / n_shared`.
/// Rows with no shared coordinate are never neighbours. When a cell has no neighbour
/// at all the column mean is used. Only original values are used as donors.
pub fn knn_impute(columns: &[Vec<Option<f64>>], k: usize) -> Vec<Vec<Option<f64>>> {
    let n_cols = columns.len();
    let n_rows = columns.first().map_or(0, Vec::len);
    let means: Vec<Option<f64>> = columns.iter().map(|c| mean(c)).collect();
    let mut out = columns.to_vec();

    let distance = |r: usize, s: usize| -> Option<f64> {
        let mut sum = 0.0;
        let mut shared = 0usize;
        for col in columns {
            if let (Some(a), Some(b)) = (col[r], col[s]) {
                sum += (a - b) * (a - b);
                shared += 1;
            }
        }
        (shared > 0).then(|| (sum * n_cols as f64 / shared as f64).sqrt())
    };

    for r in 0..n_rows {
        if columns.iter().all(|col| col[r].is_some()) {
            continue;
        }
        let neighbours: Vec<(usize, f64)> = (0..n_rows)
            .filter(|&s| s != r)
            .filter_map(|s| distance(r, s).map(|d| (s, d)))
            .collect();
        for (c, col) in columns.iter().enumerate() {
            if col[r].is_some() {
                continue;
            }
            let Some(column_mean) = means[c] else {
                continue;
            };
            let mut donors: Vec<(usize, f64)> = neighbours
                .iter()
                .copied()
                .filter(|(s, _)| col[*s].is_some())
                .collect();
            donors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
            donors.truncate(k);
            out[c][r] = if donors.is_empty() {
                Some(column_mean)
            } else {
                let total: f64 = donors.iter().filter_map(|(s, _)| col[*s]).sum();
                Some(total / donors.len() as f64)
            };
        }
    }
    out
}
