//! Axis scale transforms and labelled plot series.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    #[serde(rename = "Linear")]
    Linear,
    #[serde(rename = "Exponential")]
    Exponential,
    #[serde(rename = "Log10")]
    Log10,
    #[serde(rename = "Log2")]
    Log2,
    #[serde(rename = "Natural Log (ln)")]
    Ln,
    #[serde(rename = "^2")]
    Square,
    #[serde(rename = "sqrt")]
    Sqrt,
}

impl Scale {
    pub const ALL: [Self; 7] = [
        Self::Linear,
        Self::Exponential,
        Self::Log10,
        Self::Log2,
        Self::Ln,
        Self::Square,
        Self::Sqrt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Exponential => "Exponential",
            Self::Log10 => "Log10",
            Self::Log2 => "Log2",
            Self::Ln => "Natural Log (ln)",
            Self::Square => "^2",
            Self::Sqrt => "sqrt",
        }
    }

    /// Transform one value. `None` when `x` is outside the scale's domain.
    pub fn apply(self, x: f64) -> Option<f64> {
        let y = match self {
            Self::Linear => x,
            Self::Exponential => x.exp(),
            Self::Log10 | Self::Log2 | Self::Ln if x <= 0.0 => return None,
            Self::Log10 => x.log10(),
            Self::Log2 => x.log2(),
            Self::Ln => x.ln(),
            Self::Square => x * x,
            Self::Sqrt if x < 0.0 => return None,
            Self::Sqrt => x.sqrt(),
        };
        if !y.is_finite() {
            log::debug!("{}({}) is not finite, dropping the point", self.as_str(), x);
            return None;
        }
        Some(y)
    }
}

/// Values keyed by original row label, labels ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotSeries {
    pub index: Vec<usize>,
    pub values: Vec<f64>,
}

impl PlotSeries {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, label: usize) -> Option<f64> {
        self.index
            .binary_search(&label)
            .ok()
            .map(|i| self.values[i])
    }

    /// Keep only the labels in `labels` (ascending).
    pub fn restrict(&self, labels: &[usize]) -> PlotSeries {
        let mut out = PlotSeries::default();
        for &label in labels {
            if let Some(v) = self.get(label) {
                out.index.push(label);
                out.values.push(v);
            }
        }
        out
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> PlotSeries {
        PlotSeries {
            index: self.index.clone(),
            values: self.values.iter().map(|v| f(*v)).collect(),
        }
    }
}

/// Apply `scale` to labelled values. Missing values and values outside the scale's
/// domain are dropped; the surviving labels keep their input order.
pub fn transform(labels: &[usize], values: &[Option<f64>], scale: Scale) -> PlotSeries {
    let mut out = PlotSeries::default();
    for (label, value) in labels.iter().zip(values) {
        if let Some(y) = value.and_then(|x| scale.apply(x)) {
            out.index.push(*label);
            out.values.push(y);
        }
    }
    out
}

/// Row labels used as X values, transformed by `scale`.
pub fn transform_labels(labels: &[usize], scale: Scale) -> PlotSeries {
    let values: Vec<Option<f64>> = labels.iter().map(|l| Some(*l as f64)).collect();
    transform(labels, &values, scale)
}

/// Labels present in both ascending label lists.
pub fn intersect(a: &[usize], b: &[usize]) -> Vec<usize> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log10_drops_non_positive() {
        let values = [Some(-1.0), Some(0.0), Some(1.0), Some(10.0), Some(100.0)];
        let s = transform(&[0, 1, 2, 3, 4], &values, Scale::Log10);
        assert_eq!(s.index, vec![2, 3, 4]);
        assert_eq!(s.values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_sqrt_keeps_zero() {
        let s = transform(&[0, 1, 2], &[Some(-4.0), Some(0.0), Some(9.0)], Scale::Sqrt);
        assert_eq!(s.index, vec![1, 2]);
        assert_eq!(s.values, vec![0.0, 3.0]);
    }

    #[test]
    fn test_exponential_drops_overflow() {
        let s = transform(&[0, 1], &[Some(1.0), Some(1e6)], Scale::Exponential);
        assert_eq!(s.index, vec![0]);
        assert!(Scale::Exponential.apply(709.0).is_some());
        assert_eq!(Scale::Exponential.apply(710.0), None);
        assert_eq!(Scale::Exponential.apply(-1e6), Some(0.0));
    }

    #[test]
    fn test_missing_values_are_dropped() {
        let s = transform(&[5, 6], &[None, Some(2.0)], Scale::Square);
        assert_eq!(s.index, vec![6]);
        assert_eq!(s.values, vec![4.0]);
    }

    #[test]
    fn test_label_transform_uses_row_labels() {
        let s = transform_labels(&[0, 1, 2], Scale::Log2);
        assert_eq!(s.index, vec![1, 2]);
        assert_eq!(s.values, vec![0.0, 1.0]);
    }

    #[test]
    fn test_intersect_and_restrict() {
        let common = intersect(&[1, 2, 4, 7], &[0, 2, 3, 4, 8]);
        assert_eq!(common, vec![2, 4]);
        let s = PlotSeries {
            index: vec![1, 2, 4],
            values: vec![10.0, 20.0, 40.0],
        };
        assert_eq!(s.restrict(&common).values, vec![20.0, 40.0]);
    }

    #[test]
    fn test_scale_names_match_serialized_form() {
        for scale in Scale::ALL {
            assert_eq!(
                serde_json::to_string(&scale).unwrap(),
                format!("\"{}\"", scale.as_str())
            );
        }
    }
}
