//! Statistical charts from tabular files.
//!
//! Files are loaded into a [`TableSet`]; a [`Session`] windows, cleans and
//! scales the selected columns according to the [`ChartSettings`] of one chart
//! kind and renders the result to PNG. Settings can be saved as named presets
//! in a [`PresetStore`].

pub mod chart_data;
pub mod chart_export;
pub mod chart_settings;
pub mod colors;
pub mod config;
pub mod diagnostics;
pub mod error_display;
pub mod missing;
pub mod outliers;
pub mod pipeline;
pub mod preset;
pub mod scale;
pub mod session;
pub mod source;
pub mod table;

pub use chart_export::FigureStyle;
pub use chart_settings::{ChartKind, ChartSettings};
pub use config::{AppConfig, ConfigManager};
pub use diagnostics::Warning;
pub use preset::PresetStore;
pub use session::{RenderOutcome, Session};
pub use source::{load_all, LoadOptions, LoadReport};
pub use table::{ColumnRef, RowWindow, Table, TableSet};
pub use tabplot_cli::{Args, ChartArg, FileFormat};

/// Application name used for the config directory
pub const APP_NAME: &str = "tabplot";

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Histogram => ChartKind::Histogram,
            ChartArg::Scatter => ChartKind::Scatter,
            ChartArg::Line => ChartKind::Line,
            ChartArg::Bar => ChartKind::Bar,
            ChartArg::Pie => ChartKind::Pie,
            ChartArg::Distribution => ChartKind::Distribution,
            ChartArg::Boxplot => ChartKind::Boxplot,
            ChartArg::Violin => ChartKind::Violin,
        }
    }
}

impl AppConfig {
    /// Layer the command-line figure and font flags over this config.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.figure.width = width;
        }
        if let Some(height) = args.height {
            self.figure.height = height;
        }
        if let Some(dpi) = args.dpi {
            self.figure.dpi = dpi;
        }
        if let Some(size) = args.title_size {
            self.fonts.title = size;
        }
        if let Some(size) = args.label_size {
            self.fonts.label = size;
        }
        if let Some(size) = args.tick_size {
            self.fonts.tick = size;
        }
        if let Some(size) = args.legend_size {
            self.fonts.legend = size;
        }
    }
}

impl FigureStyle {
    /// Take the title and axis label overrides from the command line.
    pub fn with_labels(mut self, args: &Args) -> Self {
        self.title = args.title.clone().unwrap_or_default();
        self.x_label = args.xlabel.clone().unwrap_or_default();
        self.y_label = args.ylabel.clone().unwrap_or_default();
        self
    }
}
