//! Chart geometry: the drawable description of each chart kind and the
//! statistics behind it (histogram bins, category counts, kernel density
//! estimates, box and violin shapes).

use plotters::style::RGBColor;
use std::cmp::Ordering;

use crate::chart_settings::{BarOrder, ChartKind, Orientation, PieLabels, ViolinScale};
use crate::outliers::{quantile_sorted, IQR_FACTOR};

/// Points on a density curve.
pub const DENSITY_POINTS: usize = 200;
const VIOLIN_POINTS: usize = 100;
/// Density curves extend this many bandwidths past the data.
const DENSITY_CUT: f64 = 3.0;
const VIOLIN_CUT: f64 = 2.0;
/// Half of the slot a violin or box may fill.
pub const HALF_SLOT: f64 = 0.4;
const MAX_AUTO_BINS: usize = 1000;
/// Label for missing values in category counts.
pub const MISSING_CATEGORY: &str = "nan";

/// A fully prepared chart, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub show_grid: bool,
    pub body: ChartBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Histogram {
        bins: Vec<Bin>,
        color: RGBColor,
        label: String,
    },
    Scatter(Vec<ScatterTrace>),
    Line {
        traces: Vec<LineTrace>,
        markers: bool,
        legend: bool,
    },
    Bars {
        bars: Vec<BarItem>,
        /// Bars sit at category slots `0..n` rather than at row labels.
        categorical: bool,
        color: RGBColor,
        /// Font size of the value labels, when shown.
        value_font: Option<u32>,
    },
    Pie {
        slices: Vec<PieSlice>,
        start_angle: f64,
        labels: PieLabels,
    },
    Density {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        fill: bool,
        label: String,
    },
    Boxes {
        groups: Vec<BoxGroup>,
        orientation: Orientation,
    },
    Violins {
        groups: Vec<ViolinGroup>,
        half: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterTrace {
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    /// Marker area in square points.
    pub size: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBars {
    pub xerr: Option<Vec<f64>>,
    pub yerr: Option<Vec<f64>>,
    pub color: RGBColor,
    pub width: f64,
    pub capsize: u32,
    pub capthick: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineTrace {
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub width: f64,
    pub label: String,
    pub dashed: bool,
    pub errors: Option<ErrorBars>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarItem {
    pub label: String,
    pub position: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub color: RGBColor,
    pub stats: BoxStats,
    pub fliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinGroup {
    pub label: String,
    pub color: RGBColor,
    /// Value axis positions.
    pub ys: Vec<f64>,
    /// Half width at each position, in slot units.
    pub half_widths: Vec<f64>,
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Sample standard deviation (n - 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Freedman-Diaconis bin count over sorted values. One bin when the IQR is zero.
pub fn freedman_diaconis_bins(sorted: &[f64]) -> usize {
    let (Some(q1), Some(q3), Some(min), Some(max)) = (
        quantile_sorted(sorted, 0.25),
        quantile_sorted(sorted, 0.75),
        sorted.first(),
        sorted.last(),
    ) else {
        return 1;
    };
    let width = 2.0 * (q3 - q1) / (sorted.len() as f64).cbrt();
    if width <= 0.0 || !width.is_finite() {
        return 1;
    }
    (((max - min) / width).ceil() as usize).clamp(1, MAX_AUTO_BINS)
}

/// Equal-width bins over `[min, max]`. `bins = 0` picks the Freedman-Diaconis count.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let sorted = sorted(values);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let n = if bins == 0 {
        freedman_diaconis_bins(&sorted)
    } else {
        bins
    };
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / n as f64;
    let mut out: Vec<Bin> = (0..n)
        .map(|i| Bin {
            lo: lo + width * i as f64,
            hi: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in sorted {
        let i = (((v - lo) / width).floor() as usize).min(n - 1);
        out[i].count += 1;
    }
    out
}

/// Category counts with missing values counted as [`MISSING_CATEGORY`].
/// Categories start in descending count order (ties by first appearance) and
/// are then reordered by `order`.
pub fn value_counts(values: &[Option<String>], order: BarOrder) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for v in values {
        let key = v.as_deref().unwrap_or(MISSING_CATEGORY);
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    match order {
        BarOrder::NoSorting | BarOrder::Descending => {}
        BarOrder::Ascending => counts.sort_by(|a, b| a.1.cmp(&b.1)),
        BarOrder::AlphabeticalAsc => counts.sort_by(|a, b| a.0.cmp(&b.0)),
        BarOrder::AlphabeticalDesc => counts.sort_by(|a, b| b.0.cmp(&a.0)),
    }
    counts
}

/// Gaussian kernel density of `values` with kernel standard deviation `bw`, at `at`.
pub fn gaussian_kde(values: &[f64], bw: f64, at: &[f64]) -> Vec<f64> {
    let norm = 1.0 / (values.len() as f64 * bw * (2.0 * std::f64::consts::PI).sqrt());
    at.iter()
        .map(|x| {
            values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// Scott's rule kernel width: `σ · n^(-1/5)`.
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let std = sample_std(values)?;
    let bw = std * (values.len() as f64).powf(-0.2);
    (bw > 0.0 && bw.is_finite()).then_some(bw)
}

fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

/// Density curve with Scott's bandwidth. `None` without two distinct values.
pub fn density_curve(values: &[f64]) -> Option<Vec<(f64, f64)>> {
    let sorted = sorted(values);
    let bw = scott_bandwidth(&sorted)?;
    let (min, max) = (*sorted.first()?, *sorted.last()?);
    let xs = grid(min - DENSITY_CUT * bw, max + DENSITY_CUT * bw, DENSITY_POINTS);
    let ys = gaussian_kde(&sorted, bw, &xs);
    Some(xs.into_iter().zip(ys).collect())
}

/// Quartiles and whiskers. Whiskers reach the most extreme values inside 1.5·IQR;
/// everything beyond is returned as fliers.
pub fn box_stats(values: &[f64]) -> Option<(BoxStats, Vec<f64>)> {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let median = quantile_sorted(&sorted, 0.5)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr);
    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= lo_fence && *v <= hi_fence)
        .collect();
    let fliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lo_fence || *v > hi_fence)
        .collect();
    let stats = BoxStats {
        q1,
        median,
        q3,
        whisker_lo: inside.first().copied().unwrap_or(q1),
        whisker_hi: inside.last().copied().unwrap_or(q3),
    };
    Some((stats, fliers))
}

/// Raw violin outline: value positions and densities.
/// The kernel width is `sample σ / sensitivity`, extended two kernel widths past the data.
/// A constant group collapses to a single position.
pub fn violin_density(values: &[f64], sensitivity: f64) -> Option<(Vec<f64>, Vec<f64>)> {
    let sorted = sorted(values);
    let (min, max) = (*sorted.first()?, *sorted.last()?);
    let bw = sample_std(&sorted).map(|s| s / sensitivity).unwrap_or(0.0);
    if bw <= 0.0 || !bw.is_finite() {
        return Some((vec![min], vec![1.0]));
    }
    let ys = grid(min - VIOLIN_CUT * bw, max + VIOLIN_CUT * bw, VIOLIN_POINTS);
    let density = gaussian_kde(&sorted, bw, &ys);
    Some((ys, density))
}

/// Turn densities into half widths. `counts` are the group sizes.
pub fn scale_violins(densities: &[Vec<f64>], counts: &[usize], scale: ViolinScale) -> Vec<Vec<f64>> {
    let peak = |d: &Vec<f64>| d.iter().copied().fold(0.0, f64::max);
    let global_peak = densities.iter().map(peak).fold(0.0, f64::max);
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    densities
        .iter()
        .zip(counts)
        .map(|(d, n)| {
            let factor = match scale {
                ViolinScale::Area => safe_div(HALF_SLOT, global_peak),
                ViolinScale::Count => safe_div(HALF_SLOT, peak(d)) * (*n as f64 / max_count),
                ViolinScale::Width => safe_div(HALF_SLOT, peak(d)),
            };
            d.iter().map(|v| v * factor).collect()
        })
        .collect()
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a / b
    } else {
        0.0
    }
}

/// Group present values by key, groups in order of first appearance.
/// Rows with a missing key or value are dropped.
pub fn group_values(keys: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, Vec<f64>)> {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for (key, value) in keys.iter().zip(values) {
        let (Some(key), Some(value)) = (key, value) else {
            continue;
        };
        match groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, vs)) => vs.push(*value),
            None => groups.push((key.clone(), vec![*value])),
        }
    }
    groups
}

/// Data extent of a chart body as `(x_min, x_max, y_min, y_max)`, or `None`
/// for bodies without cartesian axes.
pub fn extent(body: &ChartBody) -> Option<(f64, f64, f64, f64)> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    match body {
        ChartBody::Histogram { bins, .. } => {
            for b in bins {
                points.push((b.lo, 0.0));
                points.push((b.hi, b.count as f64));
            }
        }
        ChartBody::Scatter(traces) => {
            points.extend(traces.iter().flat_map(|t| t.points.iter().copied()));
        }
        ChartBody::Line { traces, .. } => {
            for t in traces {
                for (i, (x, y)) in t.points.iter().enumerate() {
                    let err = |e: &Option<Vec<f64>>| {
                        e.as_ref().and_then(|v| v.get(i).copied()).unwrap_or(0.0)
                    };
                    let (dx, dy) = t
                        .errors
                        .as_ref()
                        .map(|e| (err(&e.xerr), err(&e.yerr)))
                        .unwrap_or((0.0, 0.0));
                    points.push((x - dx, y - dy));
                    points.push((x + dx, y + dy));
                }
            }
        }
        ChartBody::Bars { bars, .. } => {
            for b in bars {
                points.push((b.position - HALF_SLOT, 0.0));
                points.push((b.position + HALF_SLOT, b.value));
            }
        }
        ChartBody::Pie { .. } => return None,
        ChartBody::Density { points: p, .. } => {
            points.extend(p.iter().copied());
            points.push((p.first()?.0, 0.0));
        }
        ChartBody::Boxes {
            groups,
            orientation,
        } => {
            for (i, g) in groups.iter().enumerate() {
                let slot = i as f64;
                let lo = g.fliers.iter().copied().fold(g.stats.whisker_lo, f64::min);
                let hi = g.fliers.iter().copied().fold(g.stats.whisker_hi, f64::max);
                let pair = |v: f64, s: f64| match orientation {
                    Orientation::Vertical => (s, v),
                    Orientation::Horizontal => (v, s),
                };
                points.push(pair(lo, slot - 0.5));
                points.push(pair(hi, slot + 0.5));
            }
        }
        ChartBody::Violins { groups, .. } => {
            for (i, g) in groups.iter().enumerate() {
                for y in &g.ys {
                    points.push((i as f64 - 0.5, *y));
                    points.push((i as f64 + 0.5, *y));
                }
            }
        }
    }
    let mut it = points.into_iter().filter(|(x, y)| x.is_finite() && y.is_finite());
    let (x0, y0) = it.next()?;
    Some(it.fold((x0, x0, y0, y0), |(a, b, c, d), (x, y)| {
        (a.min(x), b.max(x), c.min(y), d.max(y))
    }))
}
