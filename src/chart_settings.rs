//! Typed settings for each chart kind, plus the lenient JSON merge used when
//! loading presets and applying `key=value` overrides.
//!
//! Field names and defaults match the keys stored in the preset file, so a
//! preset written by one version can always be read by another: unknown keys
//! are ignored and a value of the wrong type falls back to the default.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::colors::resolve_color_name;
use crate::missing::MissingPolicy;
use crate::outliers::OutlierPolicy;
use crate::scale::Scale;

pub const MAX_SERIES: usize = 5;

/// Value stored in `hue_col` when no grouping column is chosen.
pub const NO_HUE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Histogram,
    Scatter,
    Line,
    Bar,
    Pie,
    Distribution,
    Boxplot,
    Violin,
}

impl ChartKind {
    pub const ALL: [Self; 8] = [
        Self::Histogram,
        Self::Scatter,
        Self::Line,
        Self::Bar,
        Self::Pie,
        Self::Distribution,
        Self::Boxplot,
        Self::Violin,
    ];

    /// Display name, also the key of this kind in the preset file.
    pub fn name(self) -> &'static str {
        match self {
            Self::Histogram => "Histogram",
            Self::Scatter => "Scatter",
            Self::Line => "Line",
            Self::Bar => "Bar",
            Self::Pie => "Pie",
            Self::Distribution => "Distribution",
            Self::Boxplot => "Boxplot",
            Self::Violin => "Violin Plot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Scatter and Line read `source||column` references from any table;
    /// every other kind reads only the primary table.
    pub fn is_multi_series(self) -> bool {
        matches!(self, Self::Scatter | Self::Line)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BarOrder {
    #[default]
    #[serde(rename = "No sorting")]
    NoSorting,
    #[serde(rename = "Smallest→largest")]
    Ascending,
    #[serde(rename = "Largest→smallest")]
    Descending,
    #[serde(rename = "Alphabetical (A→Z)")]
    AlphabeticalAsc,
    #[serde(rename = "Alphabetical (Z→A)")]
    AlphabeticalDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PieLabels {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "no decimals")]
    NoDecimals,
    #[default]
    #[serde(rename = "1 decimal")]
    OneDecimal,
    #[serde(rename = "2 decimals")]
    TwoDecimals,
}

impl PieLabels {
    /// Format a share in percent, or `None` when labels are off.
    pub fn format(self, percent: f64) -> Option<String> {
        match self {
            Self::None => None,
            Self::NoDecimals => Some(format!("{:.0}%", percent)),
            Self::OneDecimal => Some(format!("{:.1}%", percent)),
            Self::TwoDecimals => Some(format!("{:.2}%", percent)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViolinSides {
    #[default]
    #[serde(rename = "1-sided")]
    OneSided,
    #[serde(rename = "2-sided")]
    TwoSided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViolinScale {
    #[default]
    #[serde(rename = "Proportional area")]
    Area,
    #[serde(rename = "Proportional length")]
    Count,
    #[serde(rename = "Fixed width")]
    Width,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorMode {
    #[serde(rename = "None")]
    None,
    #[default]
    #[serde(rename = "Use global numeric")]
    GlobalNumeric,
    #[serde(rename = "Column-based")]
    ColumnBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Colormap {
    #[default]
    None,
    #[serde(rename = "viridis")]
    Viridis,
    #[serde(rename = "plasma")]
    Plasma,
    #[serde(rename = "inferno")]
    Inferno,
    #[serde(rename = "magma")]
    Magma,
    #[serde(rename = "cividis")]
    Cividis,
    Pastel1,
    Set3,
}

fn default_color() -> String {
    "blue".to_string()
}

fn default_ma_color() -> String {
    "red".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramSettings {
    pub col: String,
    /// Number of bins; 0 picks the Freedman-Diaconis width.
    pub bins_val: u32,
    pub color_named: String,
    pub color_custom: String,
    pub show_grid: bool,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            col: String::new(),
            bins_val: 0,
            color_named: default_color(),
            color_custom: String::new(),
            show_grid: false,
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterSeries {
    pub col_choice: String,
    pub color_named: String,
    pub color_custom: String,
    pub marker_size: u32,
    pub legend_name: String,
}

impl Default for ScatterSeries {
    fn default() -> Self {
        Self {
            col_choice: String::new(),
            color_named: default_color(),
            color_custom: String::new(),
            marker_size: 20,
            legend_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterSettings {
    pub series_count: usize,
    pub show_grid: bool,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub series_params: Vec<ScatterSeries>,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for ScatterSettings {
    fn default() -> Self {
        Self {
            series_count: 1,
            show_grid: false,
            x_scale: Scale::Linear,
            y_scale: Scale::Linear,
            series_params: vec![ScatterSeries::default()],
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSeries {
    pub column: String,
    /// Resolved line color, rewritten from `color_named`/`color_custom` on load.
    pub color: String,
    pub color_named: String,
    pub color_custom: String,
    pub linewidth: f64,
    pub label: String,
    pub plot_ma: bool,
    pub ma_window: usize,
    /// Resolved moving-average color.
    pub ma_color: String,
    pub ma_color_named: String,
    pub ma_color_custom: String,
    pub ma_label: String,
    pub error_mode: ErrorMode,
    pub yerr_column: String,
    pub xerr_column: String,
}

impl Default for LineSeries {
    fn default() -> Self {
        Self {
            column: String::new(),
            color: default_color(),
            color_named: default_color(),
            color_custom: String::new(),
            linewidth: 2.0,
            label: String::new(),
            plot_ma: false,
            ma_window: 5,
            ma_color: default_ma_color(),
            ma_color_named: default_ma_color(),
            ma_color_custom: String::new(),
            ma_label: "Moving Avg".to_string(),
            error_mode: ErrorMode::GlobalNumeric,
            yerr_column: String::new(),
            xerr_column: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    pub series_count: usize,
    pub show_grid: bool,
    pub add_marker: bool,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub line_params: Vec<LineSeries>,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
    pub add_error_bars: bool,
    pub yerr_val: f64,
    pub xerr_val: f64,
    pub ecolor_named: String,
    pub ecolor_custom: String,
    pub elinewidth_val: f64,
    pub capsize_val: u32,
    pub capthick_val: f64,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            series_count: 1,
            show_grid: false,
            add_marker: false,
            x_scale: Scale::Linear,
            y_scale: Scale::Linear,
            line_params: vec![LineSeries::default()],
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
            add_error_bars: false,
            yerr_val: 0.1,
            xerr_val: 0.0,
            ecolor_named: default_color(),
            ecolor_custom: String::new(),
            elinewidth_val: 1.0,
            capsize_val: 3,
            capthick_val: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarSettings {
    pub col: String,
    pub color_named: String,
    pub color_custom: String,
    pub order_opt: BarOrder,
    pub show_grid: bool,
    pub show_vals: bool,
    pub vals_font: u32,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for BarSettings {
    fn default() -> Self {
        Self {
            col: String::new(),
            color_named: default_color(),
            color_custom: String::new(),
            order_opt: BarOrder::NoSorting,
            show_grid: false,
            show_vals: false,
            vals_font: 10,
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PieSettings {
    pub col: String,
    pub autopct_choice: PieLabels,
    /// Start angle in degrees, counter-clockwise from the positive x axis.
    pub angle: u32,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    pub col: String,
    pub color_named: String,
    pub color_custom: String,
    pub fill_val: bool,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            col: String::new(),
            color_named: default_color(),
            color_custom: String::new(),
            fill_val: true,
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxplotSettings {
    pub ycol: String,
    pub hue_col: String,
    pub orientation: Orientation,
    pub cmap_choice: Colormap,
    pub color_named: String,
    pub color_custom: String,
    pub show_grid: bool,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for BoxplotSettings {
    fn default() -> Self {
        Self {
            ycol: String::new(),
            hue_col: NO_HUE.to_string(),
            orientation: Orientation::Vertical,
            cmap_choice: Colormap::None,
            color_named: default_color(),
            color_custom: String::new(),
            show_grid: false,
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolinSettings {
    pub ycol: String,
    pub hue_col: String,
    pub side_choice: ViolinSides,
    pub scale_ui: ViolinScale,
    /// Larger values give a narrower kernel (bandwidth factor `1 / sensitivity`).
    pub sensitivity: f64,
    pub cmap_choice: Colormap,
    pub color_named: String,
    pub color_custom: String,
    pub show_grid: bool,
    pub nan_method: MissingPolicy,
    pub outlier_method: OutlierPolicy,
}

impl Default for ViolinSettings {
    fn default() -> Self {
        Self {
            ycol: String::new(),
            hue_col: NO_HUE.to_string(),
            side_choice: ViolinSides::OneSided,
            scale_ui: ViolinScale::Area,
            sensitivity: 1.0,
            cmap_choice: Colormap::None,
            color_named: default_color(),
            color_custom: String::new(),
            show_grid: false,
            nan_method: MissingPolicy::Ignore,
            outlier_method: OutlierPolicy::Ignore,
        }
    }
}

/// Hooks that run around the generic merge.
trait Preset: Serialize + DeserializeOwned + Default + Clone {
    /// Merge nested list items with their own defaults before the top-level merge.
    fn prepare(_stored: &mut Value) {}
    /// Clamp ranges and fix up derived fields after a merge.
    fn normalize(&mut self) {}
}

impl Preset for HistogramSettings {
    fn normalize(&mut self) {
        self.bins_val = self.bins_val.min(50);
    }
}

impl Preset for ScatterSettings {
    fn prepare(stored: &mut Value) {
        merge_list::<ScatterSeries>(stored, "series_params");
    }

    fn normalize(&mut self) {
        self.series_count = self.series_count.clamp(1, MAX_SERIES);
        self.series_params
            .resize_with(self.series_count, ScatterSeries::default);
        for s in &mut self.series_params {
            s.marker_size = s.marker_size.clamp(1, 200);
        }
    }
}

impl Preset for LineSettings {
    fn prepare(stored: &mut Value) {
        merge_list::<LineSeries>(stored, "line_params");
    }

    fn normalize(&mut self) {
        self.series_count = self.series_count.clamp(1, MAX_SERIES);
        self.line_params
            .resize_with(self.series_count, LineSeries::default);
        for s in &mut self.line_params {
            s.linewidth = s.linewidth.clamp(0.1, 10.0);
            s.ma_window = s.ma_window.clamp(1, 200);
            s.color = resolve_color_name(&s.color_named, &s.color_custom);
            s.ma_color = resolve_color_name(&s.ma_color_named, &s.ma_color_custom);
        }
        self.yerr_val = self.yerr_val.max(0.0);
        self.xerr_val = self.xerr_val.max(0.0);
        self.elinewidth_val = self.elinewidth_val.clamp(0.1, 5.0);
        self.capsize_val = self.capsize_val.min(10);
        self.capthick_val = self.capthick_val.clamp(0.1, 5.0);
    }
}

impl Preset for BarSettings {
    fn normalize(&mut self) {
        self.vals_font = self.vals_font.clamp(6, 30);
    }
}

impl Preset for PieSettings {
    fn normalize(&mut self) {
        self.angle = self.angle.min(360);
    }
}

impl Preset for DistributionSettings {}

impl Preset for BoxplotSettings {}

impl Preset for ViolinSettings {
    fn normalize(&mut self) {
        if !self.sensitivity.is_finite() || self.sensitivity <= 0.0 {
            self.sensitivity = 1.0;
        }
        self.sensitivity = self.sensitivity.clamp(0.2, 5.0);
    }
}

/// Overlay the known keys of `stored` onto `base`, one key at a time.
/// A key whose value does not deserialize keeps the base value.
fn overlay<T: Serialize + DeserializeOwned + Clone>(base: &T, stored: &Value) -> T {
    let (Ok(mut current), Some(stored)) = (serde_json::to_value(base), stored.as_object()) else {
        return base.clone();
    };
    for (key, value) in stored {
        let Some(map) = current.as_object_mut() else {
            break;
        };
        let Some(previous) = map.insert(key.clone(), value.clone()) else {
            // Not a field of T.
            map.remove(key);
            continue;
        };
        if serde_json::from_value::<T>(current.clone()).is_err() {
            log::warn!("ignoring preset value for '{}': {}", key, value);
            if let Some(map) = current.as_object_mut() {
                map.insert(key.clone(), previous);
            }
        }
    }
    serde_json::from_value(current).unwrap_or_else(|_| base.clone())
}

fn merge_list<P: Serialize + DeserializeOwned + Default + Clone>(stored: &mut Value, key: &str) {
    if let Some(items) = stored.get_mut(key).and_then(Value::as_array_mut) {
        for item in items.iter_mut() {
            let merged: P = overlay(&P::default(), item);
            if let Ok(v) = serde_json::to_value(merged) {
                *item = v;
            }
        }
    }
}

fn load<T: Preset>(stored: &Value) -> T {
    let mut stored = stored.clone();
    T::prepare(&mut stored);
    let mut out: T = overlay(&T::default(), &stored);
    out.normalize();
    out
}

/// Set one dotted path (`key`, or `list.N.key`) inside a settings object and
/// re-read it. Unknown paths and values of the wrong type are errors.
fn set_path<T: Preset>(settings: &T, path: &str, value: Value) -> Result<T> {
    let mut root = serde_json::to_value(settings)?;
    let mut parts = path.split('.').peekable();
    let mut node = &mut root;
    while let Some(part) = parts.next() {
        let last = parts.peek().is_none();
        node = match node {
            Value::Object(map) => {
                let Some(slot) = map.get_mut(part) else {
                    return Err(eyre!("Unknown setting '{}'", path));
                };
                slot
            }
            Value::Array(items) => {
                let idx: usize = part
                    .parse()
                    .map_err(|_| eyre!("Expected a list position in '{}', got '{}'", path, part))?;
                let len = items.len();
                items.get_mut(idx).ok_or_else(|| {
                    eyre!(
                        "'{}' is out of range: only {} entries (raise series_count first)",
                        path,
                        len
                    )
                })?
            }
            _ => return Err(eyre!("Unknown setting '{}'", path)),
        };
        if last {
            *node = value.clone();
        }
    }
    let mut out: T = serde_json::from_value(root)
        .map_err(|e| eyre!("Invalid value {} for '{}': {}", value, path, e))?;
    out.normalize();
    Ok(out)
}

/// Settings of any chart kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSettings {
    Histogram(HistogramSettings),
    Scatter(ScatterSettings),
    Line(LineSettings),
    Bar(BarSettings),
    Pie(PieSettings),
    Distribution(DistributionSettings),
    Boxplot(BoxplotSettings),
    Violin(ViolinSettings),
}

impl ChartSettings {
    pub fn default_for(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Histogram => Self::Histogram(Default::default()),
            ChartKind::Scatter => Self::Scatter(Default::default()),
            ChartKind::Line => Self::Line(Default::default()),
            ChartKind::Bar => Self::Bar(Default::default()),
            ChartKind::Pie => Self::Pie(Default::default()),
            ChartKind::Distribution => Self::Distribution(Default::default()),
            ChartKind::Boxplot => Self::Boxplot(Default::default()),
            ChartKind::Violin => Self::Violin(Default::default()),
        }
    }

    /// Build settings from a stored preset object, merging with the defaults.
    pub fn from_value(kind: ChartKind, stored: &Value) -> Self {
        match kind {
            ChartKind::Histogram => Self::Histogram(load(stored)),
            ChartKind::Scatter => Self::Scatter(load(stored)),
            ChartKind::Line => Self::Line(load(stored)),
            ChartKind::Bar => Self::Bar(load(stored)),
            ChartKind::Pie => Self::Pie(load(stored)),
            ChartKind::Distribution => Self::Distribution(load(stored)),
            ChartKind::Boxplot => Self::Boxplot(load(stored)),
            ChartKind::Violin => Self::Violin(load(stored)),
        }
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Histogram(_) => ChartKind::Histogram,
            Self::Scatter(_) => ChartKind::Scatter,
            Self::Line(_) => ChartKind::Line,
            Self::Bar(_) => ChartKind::Bar,
            Self::Pie(_) => ChartKind::Pie,
            Self::Distribution(_) => ChartKind::Distribution,
            Self::Boxplot(_) => ChartKind::Boxplot,
            Self::Violin(_) => ChartKind::Violin,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Histogram(s) => serde_json::to_value(s)?,
            Self::Scatter(s) => serde_json::to_value(s)?,
            Self::Line(s) => serde_json::to_value(s)?,
            Self::Bar(s) => serde_json::to_value(s)?,
            Self::Pie(s) => serde_json::to_value(s)?,
            Self::Distribution(s) => serde_json::to_value(s)?,
            Self::Boxplot(s) => serde_json::to_value(s)?,
            Self::Violin(s) => serde_json::to_value(s)?,
        })
    }

    /// Set one setting from text. The text is read as JSON when it parses,
    /// otherwise as a plain string (`col=price` and `col="price"` are the same).
    pub fn set(&mut self, path: &str, raw: &str) -> Result<()> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let path = path.trim();
        *self = match self {
            Self::Histogram(s) => Self::Histogram(set_path(s, path, value)?),
            Self::Scatter(s) => Self::Scatter(set_path(s, path, value)?),
            Self::Line(s) => Self::Line(set_path(s, path, value)?),
            Self::Bar(s) => Self::Bar(set_path(s, path, value)?),
            Self::Pie(s) => Self::Pie(set_path(s, path, value)?),
            Self::Distribution(s) => Self::Distribution(set_path(s, path, value)?),
            Self::Boxplot(s) => Self::Boxplot(set_path(s, path, value)?),
            Self::Violin(s) => Self::Violin(set_path(s, path, value)?),
        };
        Ok(())
    }

    /// Apply `KEY=VALUE` pairs in order.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, pairs: &[S]) -> Result<()> {
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| eyre!("Expected KEY=VALUE, got '{}'", pair))?;
            self.set(key, value)
                .map_err(|e| eyre!("{} setting: {}", self.kind(), e))?;
        }
        Ok(())
    }

    pub fn nan_method(&self) -> MissingPolicy {
        match self {
            Self::Histogram(s) => s.nan_method,
            Self::Scatter(s) => s.nan_method,
            Self::Line(s) => s.nan_method,
            Self::Bar(s) => s.nan_method,
            Self::Pie(s) => s.nan_method,
            Self::Distribution(s) => s.nan_method,
            Self::Boxplot(s) => s.nan_method,
            Self::Violin(s) => s.nan_method,
        }
    }

    pub fn outlier_method(&self) -> OutlierPolicy {
        match self {
            Self::Histogram(s) => s.outlier_method,
            Self::Scatter(s) => s.outlier_method,
            Self::Line(s) => s.outlier_method,
            Self::Bar(s) => s.outlier_method,
            Self::Pie(s) => s.outlier_method,
            Self::Distribution(s) => s.outlier_method,
            Self::Boxplot(s) => s.outlier_method,
            Self::Violin(s) => s.outlier_method,
        }
    }

    /// Setting keys accepted by [`ChartSettings::set`] at the top level.
    pub fn keys(&self) -> Vec<String> {
        match self.to_value() {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}
