//! One render: the loaded tables, the row window, the figure style and the
//! settings of the selected chart, turned into a [`RenderedChart`] plus the
//! warnings raised on the way.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::style::RGBColor;
use std::path::Path;

use crate::chart_data::{
    box_stats, density_curve, group_values, histogram, scale_violins, value_counts,
    violin_density, BarItem, BoxGroup, ChartBody, ErrorBars, LineTrace, PieSlice, RenderedChart,
    ScatterTrace, ViolinGroup,
};
use crate::chart_export::{pie_colors, write_chart_png, FigureStyle};
use crate::chart_settings::{
    BarOrder, BarSettings, BoxplotSettings, ChartKind, ChartSettings, Colormap, DistributionSettings,
    ErrorMode, HistogramSettings, LineSettings, Orientation, PieSettings, ScatterSettings,
    ViolinSettings, ViolinSides, NO_HUE,
};
use crate::colors::{palette, resolve_color};
use crate::diagnostics::{check_missing_and_mismatch, missing_in_refs, Warning};
use crate::pipeline::{align_series, prepare_frame, Cleaning, ErrorSource, SeriesRequest};
use crate::table::{ColumnRef, Frame, RowWindow, TableSet};

/// The result of one render. `chart` is `None` when nothing could be drawn;
/// the warnings then say why.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderOutcome {
    pub chart: Option<RenderedChart>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub tables: TableSet,
    pub window: RowWindow,
    pub style: FigureStyle,
    pub settings: ChartSettings,
}

impl Session {
    pub fn new(tables: TableSet, settings: ChartSettings) -> Self {
        Self {
            tables,
            window: RowWindow::default(),
            style: FigureStyle::default(),
            settings,
        }
    }

    /// Swap in a new set of tables. The window is reset; settings are kept.
    pub fn replace_tables(&mut self, tables: TableSet) {
        self.tables = tables;
        self.window = RowWindow::default();
    }

    pub fn cleaning(&self) -> Cleaning {
        Cleaning::new(
            self.window,
            self.settings.nan_method(),
            self.settings.outlier_method(),
        )
    }

    pub fn render(&self) -> Result<RenderOutcome> {
        if self.tables.is_empty() {
            return Err(eyre!("No files are loaded"));
        }
        let mut renderer = Renderer {
            tables: &self.tables,
            cleaning: self.cleaning(),
            warnings: Vec::new(),
        };
        let chart = match &self.settings {
            ChartSettings::Histogram(s) => renderer.histogram(s)?,
            ChartSettings::Scatter(s) => renderer.scatter(s)?,
            ChartSettings::Line(s) => renderer.line(s)?,
            ChartSettings::Bar(s) => renderer.bar(s)?,
            ChartSettings::Pie(s) => renderer.pie(s)?,
            ChartSettings::Distribution(s) => renderer.distribution(s)?,
            ChartSettings::Boxplot(s) => renderer.boxplot(s)?,
            ChartSettings::Violin(s) => renderer.violin(s)?,
        };
        log::info!(
            "{} render: {} ({} warnings)",
            self.settings.kind(),
            if chart.is_some() { "drawn" } else { "nothing drawn" },
            renderer.warnings.len()
        );
        Ok(RenderOutcome {
            chart,
            warnings: renderer.warnings,
        })
    }

    /// Render and, when there is a chart, write it to `path` as PNG.
    pub fn render_to(&self, path: &Path) -> Result<RenderOutcome> {
        let outcome = self.render()?;
        if let Some(chart) = &outcome.chart {
            write_chart_png(path, chart, &self.style)?;
            log::info!("wrote {}", path.display());
        }
        Ok(outcome)
    }
}

struct Renderer<'a> {
    tables: &'a TableSet,
    cleaning: Cleaning,
    warnings: Vec<Warning>,
}

/// A hue column of `"None"` or blank means no grouping.
fn hue_of(hue: &str) -> Option<&str> {
    let hue = hue.trim();
    (!hue.is_empty() && hue != NO_HUE).then_some(hue)
}

fn chart(kind: ChartKind, title: String, x: &str, y: &str, grid: bool, body: ChartBody) -> RenderedChart {
    RenderedChart {
        kind,
        title,
        x_label: x.to_string(),
        y_label: y.to_string(),
        show_grid: grid,
        body,
    }
}

impl Renderer<'_> {
    fn color(&mut self, named: &str, custom: &str) -> RGBColor {
        let (color, bad) = resolve_color(named, custom);
        if let Some(bad) = bad {
            self.warnings.push(Warning::InvalidColor(bad));
        }
        color
    }

    fn no_data(&mut self, kind: ChartKind) -> Option<RenderedChart> {
        self.warnings.push(Warning::NoData {
            chart: kind.to_string(),
        });
        None
    }

    /// The chosen column of the primary table, or its first column when blank.
    fn primary_column(&self, chosen: &str, numeric_first: bool) -> Option<String> {
        let chosen = chosen.trim();
        if !chosen.is_empty() {
            return Some(chosen.to_string());
        }
        let table = self.tables.primary()?;
        let names = table.column_names();
        if numeric_first {
            if let Some(c) = names.iter().find(|c| table.is_numeric(c)) {
                return Some(c.clone());
            }
        }
        names.into_iter().next()
    }

    /// The chosen reference, or the first reference across all tables when blank.
    fn series_ref(&self, chosen: &str) -> Option<String> {
        let chosen = chosen.trim();
        if !chosen.is_empty() {
            return Some(chosen.to_string());
        }
        self.tables.all_refs().into_iter().next()
    }

    /// Diagnose the windowed column, then window and clean it (carrying
    /// `carried` along). `None` when the column does not exist.
    fn primary_frame(&mut self, column: &str, carried: &[&str]) -> Result<Option<Frame>> {
        let Some(table) = self.tables.primary() else {
            return Ok(None);
        };
        if !table.has_column(column) {
            self.warnings.push(Warning::ColumnNotFound(column.to_string()));
            return Ok(None);
        }
        let windowed = Frame::from_table(table, &[column], self.cleaning.window)?;
        self.warnings
            .extend(check_missing_and_mismatch(&windowed, &[column])?.warnings());
        Ok(Some(prepare_frame(table, &[column], carried, self.cleaning)?))
    }

    /// Present numeric values of `column`, or a NotNumeric warning.
    fn numeric_values(&mut self, frame: &Frame, column: &str, kind: ChartKind) -> Result<Option<Vec<f64>>> {
        if !frame.is_numeric(column) {
            self.warnings.push(Warning::NotNumeric {
                column: column.to_string(),
                chart: kind.to_string(),
            });
            return Ok(None);
        }
        Ok(Some(frame.numeric(column)?.into_iter().flatten().collect()))
    }

    fn histogram(&mut self, s: &HistogramSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Histogram;
        let Some(col) = self.primary_column(&s.col, false) else {
            return Ok(self.no_data(kind));
        };
        let Some(frame) = self.primary_frame(&col, &[])? else {
            return Ok(None);
        };
        let Some(values) = self.numeric_values(&frame, &col, kind)? else {
            return Ok(None);
        };
        if values.is_empty() {
            return Ok(self.no_data(kind));
        }
        let color = self.color(&s.color_named, &s.color_custom);
        Ok(Some(chart(
            kind,
            format!("Histogram of {}", col),
            &col,
            "Frequency",
            s.show_grid,
            ChartBody::Histogram {
                bins: histogram(&values, s.bins_val as usize),
                color,
                label: col.clone(),
            },
        )))
    }

    fn scatter(&mut self, s: &ScatterSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Scatter;
        let params: Vec<_> = s.series_params.iter().take(s.series_count.max(1)).collect();
        let refs: Vec<String> = params
            .iter()
            .filter_map(|p| self.series_ref(&p.col_choice))
            .collect();
        self.check_series_refs(&refs)?;

        let mut traces = Vec::new();
        for (param, column) in params.iter().zip(&refs) {
            let request = SeriesRequest::new(ColumnRef::parse(column), s.x_scale, s.y_scale);
            let Some(aligned) = align_series(self.tables, &request, self.cleaning)? else {
                continue;
            };
            let color = self.color(&param.color_named, &param.color_custom);
            let label = if param.legend_name.trim().is_empty() {
                column.clone()
            } else {
                param.legend_name.clone()
            };
            traces.push(ScatterTrace {
                points: aligned.x.values.into_iter().zip(aligned.y.values).collect(),
                color,
                size: param.marker_size,
                label,
            });
        }
        if traces.iter().all(|t| t.points.is_empty()) {
            return Ok(self.no_data(kind));
        }
        let (title, y_label) = series_titles(&refs);
        Ok(Some(chart(
            kind,
            title,
            "index",
            &y_label,
            s.show_grid,
            ChartBody::Scatter(traces),
        )))
    }

    fn check_series_refs(&mut self, refs: &[String]) -> Result<()> {
        let missing = missing_in_refs(self.tables, refs, self.cleaning.window)?;
        if !missing.is_empty() {
            self.warnings.push(Warning::MissingInSeries(missing));
        }
        Ok(())
    }

    fn line(&mut self, s: &LineSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Line;
        let params: Vec<_> = s.line_params.iter().take(s.series_count.max(1)).collect();
        let refs: Vec<String> = params
            .iter()
            .filter_map(|p| self.series_ref(&p.column))
            .collect();

        let mut checked = refs.clone();
        if s.add_error_bars {
            for p in params.iter().filter(|p| p.error_mode == ErrorMode::ColumnBased) {
                for c in [&p.yerr_column, &p.xerr_column] {
                    if !c.trim().is_empty() {
                        checked.push(c.trim().to_string());
                    }
                }
            }
        }
        self.check_series_refs(&checked)?;

        let ecolor = self.color(&s.ecolor_named, &s.ecolor_custom);
        let mut traces = Vec::new();
        for (param, column) in params.iter().zip(&refs) {
            let mut request = SeriesRequest::new(ColumnRef::parse(column), s.x_scale, s.y_scale);
            if s.add_error_bars {
                let source = |text: &str| {
                    let text = text.trim();
                    (!text.is_empty()).then(|| ErrorSource::Column(ColumnRef::parse(text)))
                };
                match param.error_mode {
                    ErrorMode::None => {}
                    ErrorMode::GlobalNumeric => {
                        request.xerr = Some(ErrorSource::Constant(s.xerr_val));
                        request.yerr = Some(ErrorSource::Constant(s.yerr_val));
                    }
                    ErrorMode::ColumnBased => {
                        request.xerr = source(&param.xerr_column);
                        request.yerr = source(&param.yerr_column);
                    }
                }
            }
            if param.plot_ma {
                request.moving_average = Some(param.ma_window);
            }

            let Some(aligned) = align_series(self.tables, &request, self.cleaning)? else {
                continue;
            };
            let color = self.color(&param.color_named, &param.color_custom);
            let errors = (aligned.xerr.is_some() || aligned.yerr.is_some()).then(|| ErrorBars {
                xerr: aligned.xerr.as_ref().map(|e| e.values.clone()),
                yerr: aligned.yerr.as_ref().map(|e| e.values.clone()),
                color: ecolor,
                width: s.elinewidth_val,
                capsize: s.capsize_val,
                capthick: s.capthick_val,
            });
            traces.push(LineTrace {
                points: aligned.x.values.iter().copied().zip(aligned.y.values.iter().copied()).collect(),
                color,
                width: param.linewidth,
                label: param.label.trim().to_string(),
                dashed: false,
                errors,
            });

            if let Some((ma_x, ma_y)) = aligned.moving_average {
                let ma_color = self.color(&param.ma_color_named, &param.ma_color_custom);
                let label = if param.ma_label.trim().is_empty() {
                    format!("{} (MA)", column)
                } else {
                    param.ma_label.clone()
                };
                traces.push(LineTrace {
                    points: ma_x.values.into_iter().zip(ma_y.values).collect(),
                    color: ma_color,
                    width: param.linewidth,
                    label,
                    dashed: true,
                    errors: None,
                });
            }
        }
        if traces.iter().all(|t| t.points.is_empty()) {
            return Ok(self.no_data(kind));
        }
        let legend = s.series_count > 1 || traces.iter().any(|t| !t.label.is_empty());
        let (title, y_label) = series_titles(&refs);
        Ok(Some(chart(
            kind,
            title,
            "index",
            &y_label,
            s.show_grid,
            ChartBody::Line {
                traces,
                markers: s.add_marker,
                legend,
            },
        )))
    }

    fn bar(&mut self, s: &BarSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Bar;
        let Some(col) = self.primary_column(&s.col, false) else {
            return Ok(self.no_data(kind));
        };
        let Some(frame) = self.primary_frame(&col, &[])? else {
            return Ok(None);
        };
        let color = self.color(&s.color_named, &s.color_custom);
        let value_font = s.show_vals.then_some(s.vals_font);

        let (bars, categorical, title, x_label, y_label) = if frame.is_numeric(&col) {
            let bars: Vec<BarItem> = frame
                .index()
                .iter()
                .zip(frame.numeric(&col)?)
                .filter_map(|(&label, v)| {
                    v.map(|value| BarItem {
                        label: label.to_string(),
                        position: label as f64,
                        value,
                    })
                })
                .collect();
            (bars, false, format!("{} depending on index", col), "index".to_string(), col.clone())
        } else {
            let bars = value_counts(&frame.text(&col)?, s.order_opt)
                .into_iter()
                .enumerate()
                .map(|(i, (label, count))| BarItem {
                    label,
                    position: i as f64,
                    value: count as f64,
                })
                .collect();
            (bars, true, format!("Count of {}", col), col.clone(), "Count".to_string())
        };
        if bars.is_empty() {
            return Ok(self.no_data(kind));
        }
        Ok(Some(chart(
            kind,
            title,
            &x_label,
            &y_label,
            s.show_grid,
            ChartBody::Bars {
                bars,
                categorical,
                color,
                value_font,
            },
        )))
    }

    fn pie(&mut self, s: &PieSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Pie;
        let Some(col) = self.primary_column(&s.col, false) else {
            return Ok(self.no_data(kind));
        };
        let Some(frame) = self.primary_frame(&col, &[])? else {
            return Ok(None);
        };

        let entries: Vec<(String, f64)> = if frame.is_numeric(&col) {
            let entries: Vec<(String, f64)> = frame
                .index()
                .iter()
                .zip(frame.numeric(&col)?)
                .filter_map(|(label, v)| v.map(|v| (label.to_string(), v)))
                .collect();
            if entries.iter().any(|(_, v)| *v < 0.0) {
                self.warnings.push(Warning::NegativeValues(col));
                return Ok(None);
            }
            entries
        } else {
            value_counts(&frame.text(&col)?, BarOrder::NoSorting)
                .into_iter()
                .map(|(label, count)| (label, count as f64))
                .collect()
        };
        if entries.iter().map(|(_, v)| v).sum::<f64>() <= 0.0 {
            return Ok(self.no_data(kind));
        }
        let colors = pie_colors(entries.len());
        let slices = entries
            .into_iter()
            .zip(colors)
            .map(|((label, value), color)| PieSlice { label, value, color })
            .collect();
        Ok(Some(chart(
            kind,
            format!("Pie of {}", col),
            "",
            "",
            false,
            ChartBody::Pie {
                slices,
                start_angle: s.angle as f64,
                labels: s.autopct_choice,
            },
        )))
    }

    fn distribution(&mut self, s: &DistributionSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Distribution;
        let Some(col) = self.primary_column(&s.col, true) else {
            return Ok(self.no_data(kind));
        };
        let Some(frame) = self.primary_frame(&col, &[])? else {
            return Ok(None);
        };
        let Some(values) = self.numeric_values(&frame, &col, kind)? else {
            return Ok(None);
        };
        if values.is_empty() {
            return Ok(self.no_data(kind));
        }
        let Some(points) = density_curve(&values) else {
            self.warnings.push(Warning::TooFewValues {
                column: col,
                needed: 2,
            });
            return Ok(None);
        };
        let color = self.color(&s.color_named, &s.color_custom);
        Ok(Some(chart(
            kind,
            format!("Distribution of {}", col),
            &col,
            "Density",
            false,
            ChartBody::Density {
                points,
                color,
                fill: s.fill_val,
                label: col.clone(),
            },
        )))
    }

    /// Y values of `ycol`, split by `hue` when given, plus one color per group.
    fn grouped(
        &mut self,
        kind: ChartKind,
        ycol: &str,
        hue: Option<&str>,
        cmap: Colormap,
        color: RGBColor,
    ) -> Result<Option<Vec<(String, Vec<f64>, RGBColor)>>> {
        let hue = match hue {
            Some(h) if self.tables.primary().is_some_and(|t| t.has_column(h)) => Some(h),
            Some(h) => {
                self.warnings.push(Warning::ColumnNotFound(h.to_string()));
                None
            }
            None => None,
        };
        let carried: Vec<&str> = hue.into_iter().collect();
        let Some(frame) = self.primary_frame(ycol, &carried)? else {
            return Ok(None);
        };
        if !frame.is_numeric(ycol) {
            self.warnings.push(Warning::NotNumeric {
                column: ycol.to_string(),
                chart: kind.to_string(),
            });
            return Ok(None);
        }
        let values = frame.numeric(ycol)?;
        let groups = match hue {
            Some(h) => group_values(&frame.text(h)?, &values),
            None => {
                let all: Vec<f64> = values.into_iter().flatten().collect();
                if all.is_empty() {
                    Vec::new()
                } else {
                    vec![(String::new(), all)]
                }
            }
        };
        if groups.is_empty() {
            self.no_data(kind);
            return Ok(None);
        }
        let colors = hue.and(palette(cmap)).unwrap_or_else(|| vec![color]);
        Ok(Some(
            groups
                .into_iter()
                .enumerate()
                .map(|(i, (label, vals))| (label, vals, colors[i % colors.len()]))
                .collect(),
        ))
    }

    fn boxplot(&mut self, s: &BoxplotSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Boxplot;
        let Some(ycol) = self.primary_column(&s.ycol, true) else {
            return Ok(self.no_data(kind));
        };
        let hue = hue_of(&s.hue_col);
        let color = self.color(&s.color_named, &s.color_custom);
        let Some(groups) = self.grouped(kind, &ycol, hue, s.cmap_choice, color)? else {
            return Ok(None);
        };
        let groups: Vec<BoxGroup> = groups
            .into_iter()
            .filter_map(|(label, values, color)| {
                box_stats(&values).map(|(stats, fliers)| BoxGroup {
                    label,
                    color,
                    stats,
                    fliers,
                })
            })
            .collect();
        if groups.is_empty() {
            return Ok(None);
        }
        let hue_label = hue.unwrap_or("");
        let (x_label, y_label) = match s.orientation {
            Orientation::Vertical => (hue_label, ycol.as_str()),
            Orientation::Horizontal => (ycol.as_str(), hue_label),
        };
        Ok(Some(chart(
            kind,
            format!("Boxplot of {}", ycol),
            x_label,
            y_label,
            s.show_grid,
            ChartBody::Boxes {
                groups,
                orientation: s.orientation,
            },
        )))
    }

    fn violin(&mut self, s: &ViolinSettings) -> Result<Option<RenderedChart>> {
        let kind = ChartKind::Violin;
        let Some(ycol) = self.primary_column(&s.ycol, true) else {
            return Ok(self.no_data(kind));
        };
        let hue = hue_of(&s.hue_col);
        let color = self.color(&s.color_named, &s.color_custom);
        let Some(groups) = self.grouped(kind, &ycol, hue, s.cmap_choice, color)? else {
            return Ok(None);
        };

        let mut kept = Vec::new();
        let mut densities = Vec::new();
        let mut counts = Vec::new();
        for (label, values, color) in groups {
            if let Some((ys, density)) = violin_density(&values, s.sensitivity) {
                counts.push(values.len());
                densities.push(density);
                kept.push((label, color, ys));
            }
        }
        if kept.is_empty() {
            return Ok(None);
        }
        let widths = scale_violins(&densities, &counts, s.scale_ui);
        let groups = kept
            .into_iter()
            .zip(widths)
            .map(|((label, color, ys), half_widths)| ViolinGroup {
                label,
                color,
                ys,
                half_widths,
            })
            .collect();
        let half = s.side_choice == ViolinSides::OneSided && hue.is_some();
        Ok(Some(chart(
            kind,
            format!("Violin plot of {}", ycol),
            hue.unwrap_or(""),
            &ycol,
            s.show_grid,
            ChartBody::Violins { groups, half },
        )))
    }
}

/// Title and Y label of a multi-series chart.
fn series_titles(refs: &[String]) -> (String, String) {
    match refs {
        [single] => (format!("{} depending on index", single), single.clone()),
        _ => (
            "Multiple columns across multiple files".to_string(),
            "values".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missing::MissingPolicy;
    use crate::table::Table;
    use polars::prelude::*;

    fn tables() -> TableSet {
        let mut set = TableSet::new();
        set.push(Table::new(
            "data.csv",
            df! {
                "v" => [Some(1.0), Some(2.0), None, Some(4.0), Some(100.0)],
                "neg" => [1.0, -2.0, 3.0, 4.0, 5.0],
                "cat" => [Some("a"), Some("b"), Some("a"), None, Some("a")],
                "grp" => ["x", "y", "x", "y", "x"],
            }
            .unwrap(),
        ));
        set
    }

    fn render(settings: ChartSettings) -> RenderOutcome {
        Session::new(tables(), settings).render().unwrap()
    }

    #[test]
    fn test_histogram_defaults_and_warnings() {
        let mut s = HistogramSettings::default();
        s.col = "v".to_string();
        s.bins_val = 3;
        let out = render(ChartSettings::Histogram(s));
        let chart = out.chart.unwrap();
        assert_eq!(chart.title, "Histogram of v");
        assert_eq!(chart.y_label, "Frequency");
        match chart.body {
            ChartBody::Histogram { bins, .. } => {
                assert_eq!(bins.len(), 3);
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MissingValues(_))));
    }

    #[test]
    fn test_histogram_of_text_column_warns() {
        let mut s = HistogramSettings::default();
        s.col = "cat".to_string();
        let out = render(ChartSettings::Histogram(s));
        assert!(out.chart.is_none());
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::NotNumeric { .. })));
    }

    #[test]
    fn test_unknown_column_warns() {
        let mut s = BarSettings::default();
        s.col = "nope".to_string();
        let out = render(ChartSettings::Bar(s));
        assert!(out.chart.is_none());
        assert_eq!(out.warnings, vec![Warning::ColumnNotFound("nope".to_string())]);
    }

    #[test]
    fn test_text_bar_counts_missing_category() {
        let mut s = BarSettings::default();
        s.col = "cat".to_string();
        s.order_opt = BarOrder::Descending;
        let chart = render(ChartSettings::Bar(s)).chart.unwrap();
        assert_eq!(chart.title, "Count of cat");
        match chart.body {
            ChartBody::Bars { bars, categorical, .. } => {
                assert!(categorical);
                assert_eq!(bars[0].label, "a");
                assert_eq!(bars[0].value, 3.0);
                assert!(bars.iter().any(|b| b.label == "nan"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_numeric_bar_sits_at_row_labels() {
        let mut s = BarSettings::default();
        s.col = "v".to_string();
        let chart = render(ChartSettings::Bar(s)).chart.unwrap();
        assert_eq!(chart.x_label, "index");
        match chart.body {
            ChartBody::Bars { bars, .. } => {
                let positions: Vec<f64> = bars.iter().map(|b| b.position).collect();
                assert_eq!(positions, vec![0.0, 1.0, 3.0, 4.0]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_pie_rejects_negative_values() {
        let mut s = PieSettings::default();
        s.col = "neg".to_string();
        let out = render(ChartSettings::Pie(s));
        assert!(out.chart.is_none());
        assert_eq!(out.warnings, vec![Warning::NegativeValues("neg".to_string())]);
    }

    #[test]
    fn test_line_with_moving_average_gets_legend() {
        let mut s = LineSettings::default();
        s.line_params[0].column = "data.csv||v".to_string();
        s.line_params[0].plot_ma = true;
        s.line_params[0].ma_window = 2;
        s.line_params[0].ma_label = String::new();
        let chart = render(ChartSettings::Line(s)).chart.unwrap();
        assert_eq!(chart.title, "data.csv||v depending on index");
        match chart.body {
            ChartBody::Line { traces, legend, .. } => {
                assert_eq!(traces.len(), 2);
                assert!(traces[1].dashed);
                assert_eq!(traces[1].label, "data.csv||v (MA)");
                assert!(legend);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_line_global_error_bars() {
        let mut s = LineSettings::default();
        s.line_params[0].column = "v".to_string();
        s.add_error_bars = true;
        s.yerr_val = 0.5;
        s.xerr_val = 0.0;
        s.nan_method = MissingPolicy::DropRows;
        let out = render(ChartSettings::Line(s));
        match out.chart.unwrap().body {
            ChartBody::Line { traces, .. } => {
                let errors = traces[0].errors.as_ref().unwrap();
                assert!(errors.xerr.is_none());
                assert_eq!(errors.yerr.as_ref().unwrap(), &vec![0.5; 4]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_scatter_multi_series_titles() {
        let mut s = ScatterSettings::default();
        s.series_count = 2;
        s.series_params = vec![Default::default(), Default::default()];
        s.series_params[0].col_choice = "v".to_string();
        s.series_params[1].col_choice = "neg".to_string();
        let out = render(ChartSettings::Scatter(s));
        let chart = out.chart.unwrap();
        assert_eq!(chart.title, "Multiple columns across multiple files");
        assert_eq!(chart.y_label, "values");
        assert_eq!(out.warnings, vec![Warning::MissingInSeries(vec!["v".to_string()])]);
    }

    #[test]
    fn test_boxplot_groups_by_hue_with_palette() {
        let mut s = BoxplotSettings::default();
        s.ycol = "neg".to_string();
        s.hue_col = "grp".to_string();
        s.cmap_choice = Colormap::Set3;
        s.orientation = Orientation::Horizontal;
        let chart = render(ChartSettings::Boxplot(s)).chart.unwrap();
        assert_eq!(chart.x_label, "neg");
        assert_eq!(chart.y_label, "grp");
        match chart.body {
            ChartBody::Boxes { groups, .. } => {
                assert_eq!(groups.len(), 2);
                assert_ne!(groups[0].color, groups[1].color);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_violin_without_hue_is_one_full_group() {
        let mut s = ViolinSettings::default();
        s.ycol = "neg".to_string();
        let chart = render(ChartSettings::Violin(s)).chart.unwrap();
        assert_eq!(chart.title, "Violin plot of neg");
        match chart.body {
            ChartBody::Violins { groups, half } => {
                assert_eq!(groups.len(), 1);
                assert!(!half);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_invalid_custom_color_warns() {
        let mut s = DistributionSettings::default();
        s.col = "neg".to_string();
        s.color_custom = "#zzz".to_string();
        let out = render(ChartSettings::Distribution(s));
        assert!(out.chart.is_some());
        assert_eq!(out.warnings, vec![Warning::InvalidColor("#zzz".to_string())]);
    }

    #[test]
    fn test_render_without_tables_errors() {
        let session = Session::new(TableSet::new(), ChartSettings::default_for(ChartKind::Pie));
        assert!(session.render().is_err());
    }
}
