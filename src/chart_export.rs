//! Chart export to PNG through the plotters bitmap backend.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::TRANSPARENT;
use std::path::Path;

use crate::chart_data::{
    extent, BoxGroup, ChartBody, LineTrace, PieSlice, RenderedChart, ViolinGroup, HALF_SLOT,
};
use crate::chart_settings::{Orientation, PieLabels};
use crate::colors::DEFAULT_CYCLE;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const FONT: &str = "sans-serif";
const POINTS_PER_INCH: f64 = 72.0;
const AXIS_WIDTH_PT: f64 = 1.2;
const DASH_PT: f64 = 6.0;
const GAP_PT: f64 = 3.0;

/// Figure size, fonts and the title/label overrides of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    /// Inches.
    pub width: f64,
    /// Inches.
    pub height: f64,
    pub dpi: u32,
    /// Font sizes in points.
    pub title_size: u32,
    pub label_size: u32,
    pub tick_size: u32,
    pub legend_size: u32,
    /// Overrides; blank means "use the chart's default".
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 5.0,
            dpi: 100,
            title_size: 12,
            label_size: 10,
            tick_size: 9,
            legend_size: 9,
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
        }
    }
}

impl FigureStyle {
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| ((inches * self.dpi as f64).round() as u32).max(1);
        (px(self.width), px(self.height))
    }

    /// Points to pixels at this figure's dpi.
    pub fn px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / POINTS_PER_INCH
    }

    fn font(&self, points: u32) -> f64 {
        self.px(points as f64)
    }

    /// Title and axis labels after applying the overrides.
    pub fn labels(&self, chart: &RenderedChart) -> (String, String, String) {
        let pick = |custom: &str, default: &str| {
            let custom = custom.trim();
            if custom.is_empty() {
                default.to_string()
            } else {
                custom.to_string()
            }
        };
        (
            pick(&self.title, &chart.title),
            pick(&self.x_label, &chart.x_label),
            pick(&self.y_label, &chart.y_label),
        )
    }
}

/// Format a tick value for display (compact: integer when whole, else 1-2 decimals).
fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if abs >= 1e5 || abs < 0.01 {
        format!("{:.1e}", v)
    } else if (v - v.round()).abs() < 1e-10 {
        format!("{:.0}", v)
    } else if abs >= 1.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Bar value labels: whole numbers without decimals, everything else as is.
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn category_label(v: f64, labels: &[String]) -> String {
    let slot = v.round();
    if (v - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

fn pad(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - span * 0.05, hi + span * 0.05)
    } else {
        let d = if lo == 0.0 { 0.5 } else { lo.abs() * 0.05 };
        (lo - d, hi + d)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CategoryAxis {
    X,
    Y,
}

/// Category names and the axis they label, for charts drawn at integer slots.
fn categories(body: &ChartBody) -> Option<(CategoryAxis, Vec<String>)> {
    match body {
        ChartBody::Bars {
            bars,
            categorical: true,
            ..
        } => Some((CategoryAxis::X, bars.iter().map(|b| b.label.clone()).collect())),
        ChartBody::Boxes {
            groups,
            orientation,
        } => {
            let axis = match orientation {
                Orientation::Vertical => CategoryAxis::X,
                Orientation::Horizontal => CategoryAxis::Y,
            };
            Some((axis, groups.iter().map(|g| g.label.clone()).collect()))
        }
        ChartBody::Violins { groups, .. } => Some((
            CategoryAxis::X,
            groups.iter().map(|g| g.label.clone()).collect(),
        )),
        _ => None,
    }
}

/// Write chart to PNG using plotters bitmap backend.
pub fn write_chart_png(path: &Path, chart: &RenderedChart, style: &FigureStyle) -> Result<()> {
    let (w, h) = style.pixel_size();
    let root = BitMapBackend::new(path, (w, h)).into_drawing_area();
    root.fill(&WHITE)?;

    match &chart.body {
        ChartBody::Pie {
            slices,
            start_angle,
            labels,
        } => {
            let (title, _, _) = style.labels(chart);
            if title.is_empty() {
                draw_pie(&root, style, slices, *start_angle, *labels)?;
            } else {
                let area = root.titled(&title, (FONT, style.font(style.title_size)))?;
                draw_pie(&area, style, slices, *start_angle, *labels)?;
            }
        }
        _ => draw_cartesian(&root, chart, style)?,
    }

    root.present()?;
    log::info!("wrote {}x{} px chart to {}", w, h, path.display());
    Ok(())
}

fn draw_cartesian(root: &Area, chart: &RenderedChart, style: &FigureStyle) -> Result<()> {
    let (x0, x1, y0, y1) = extent(&chart.body).ok_or_else(|| eyre!("No data to export"))?;
    let (x0, x1) = pad(x0, x1);
    let (y0, y1) = pad(y0, y1);
    let (title, x_label, y_label) = style.labels(chart);

    let tick_px = style.font(style.tick_size);
    let label_px = style.font(style.label_size);
    let mut builder = ChartBuilder::on(root);
    builder
        .margin(style.px(10.0) as u32)
        .x_label_area_size((label_px + tick_px * 2.5) as u32)
        .y_label_area_size((label_px + tick_px * 5.0) as u32);
    if !title.is_empty() {
        builder.caption(&title, (FONT, style.font(style.title_size)));
    }
    let mut cc = builder.build_cartesian_2d(x0..x1, y0..y1)?;

    let cats = categories(&chart.body);
    let x_cats = cats
        .as_ref()
        .filter(|(axis, _)| *axis == CategoryAxis::X)
        .map(|(_, l)| l.clone());
    let y_cats = cats
        .as_ref()
        .filter(|(axis, _)| *axis == CategoryAxis::Y)
        .map(|(_, l)| l.clone());
    let x_fmt = |v: &f64| match &x_cats {
        Some(labels) => category_label(*v, labels),
        None => format_tick(*v),
    };
    let y_fmt = |v: &f64| match &y_cats {
        Some(labels) => category_label(*v, labels),
        None => format_tick(*v),
    };

    {
        let mut mesh = cc.configure_mesh();
        mesh.x_desc(x_label.as_str())
            .y_desc(y_label.as_str())
            .axis_desc_style((FONT, label_px))
            .label_style((FONT, tick_px))
            .axis_style(TRANSPARENT)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt);
        if let Some(labels) = &x_cats {
            mesh.x_labels(labels.len() + 1);
        }
        if let Some(labels) = &y_cats {
            mesh.y_labels(labels.len() + 1);
        }
        if !chart.show_grid {
            mesh.disable_mesh();
        }
        mesh.draw()?;
    }

    let legend = match &chart.body {
        ChartBody::Histogram { bins, color, label } => {
            let color = *color;
            cc.draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], color.mix(0.75).filled())
            }))?
            .label(label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            cc.draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], WHITE.stroke_width(1))
            }))?;
            !label.is_empty()
        }
        ChartBody::Scatter(traces) => {
            for t in traces {
                let color = t.color;
                let radius = (style.px((t.size as f64).sqrt() / 2.0).round() as i32).max(1);
                cc.draw_series(
                    t.points
                        .iter()
                        .map(move |&p| Circle::new(p, radius, color.filled())),
                )?
                .label(t.label.clone())
                .legend(move |(x, y)| Circle::new((x, y), radius.min(6), color.filled()));
            }
            traces.iter().any(|t| !t.label.is_empty())
        }
        ChartBody::Line {
            traces,
            markers,
            legend,
        } => {
            for t in traces {
                draw_line_trace(root, &mut cc, style, t, *markers)?;
            }
            *legend
        }
        ChartBody::Bars {
            bars,
            color,
            value_font,
            ..
        } => {
            let color = *color;
            cc.draw_series(bars.iter().map(|b| {
                Rectangle::new(
                    [(b.position - HALF_SLOT, 0.0), (b.position + HALF_SLOT, b.value)],
                    color.filled(),
                )
            }))?;
            if let Some(font) = value_font {
                let text_style = (FONT, style.font(*font))
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Bottom));
                cc.draw_series(bars.iter().map(|b| {
                    Text::new(format_value(b.value), (b.position, b.value), text_style.clone())
                }))?;
            }
            false
        }
        ChartBody::Density {
            points,
            color,
            fill,
            label,
        } => {
            let line = color.stroke_width(style.px(1.5).round() as u32);
            let color = *color;
            if *fill {
                cc.draw_series(
                    AreaSeries::new(points.iter().copied(), 0.0, color.mix(0.25)).border_style(line),
                )?
                .label(label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            } else {
                cc.draw_series(LineSeries::new(points.iter().copied(), line))?
                    .label(label.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            !label.is_empty()
        }
        ChartBody::Boxes {
            groups,
            orientation,
        } => {
            for (slot, g) in groups.iter().enumerate() {
                draw_box(&mut cc, style, g, slot as f64, *orientation)?;
            }
            false
        }
        ChartBody::Violins { groups, half } => {
            for (slot, g) in groups.iter().enumerate() {
                draw_violin(&mut cc, g, slot as f64, *half)?;
            }
            false
        }
        ChartBody::Pie { .. } => false,
    };

    draw_axis_arrows(root, &cc, style, (x0, x1), (y0, y1))?;

    if legend {
        cc.configure_series_labels()
            .label_font((FONT, style.font(style.legend_size)))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// Axis lines along y = 0 and x = 0 (clamped into view), with arrow heads at the
/// positive ends. The surrounding frame is never drawn.
fn draw_axis_arrows(
    root: &Area,
    cc: &Chart,
    style: &FigureStyle,
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
) -> Result<()> {
    let line = BLACK.stroke_width(style.px(AXIS_WIDTH_PT).round().max(1.0) as u32);
    let head = style.px(6.0).round() as i32;
    let y_axis_at = 0.0_f64.clamp(y0, y1);
    let x_axis_at = 0.0_f64.clamp(x0, x1);

    let from = cc.backend_coord(&(x0, y_axis_at));
    let to = cc.backend_coord(&(x1, y_axis_at));
    root.draw(&PathElement::new(vec![from, to], line))?;
    root.draw(&Polygon::new(
        vec![to, (to.0 - head, to.1 - head / 2), (to.0 - head, to.1 + head / 2)],
        BLACK.filled(),
    ))?;

    let from = cc.backend_coord(&(x_axis_at, y0));
    let to = cc.backend_coord(&(x_axis_at, y1));
    root.draw(&PathElement::new(vec![from, to], line))?;
    root.draw(&Polygon::new(
        vec![to, (to.0 - head / 2, to.1 + head), (to.0 + head / 2, to.1 + head)],
        BLACK.filled(),
    ))?;
    Ok(())
}

/// Split a polyline into dashes of fixed on-screen length.
fn dashes(cc: &Chart, points: &[(f64, f64)], dash: f64, gap: f64) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let mut on = true;
    let mut left = dash;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (pa, pb) = (cc.backend_coord(&a), cc.backend_coord(&b));
        let len = ((pb.0 - pa.0) as f64).hypot((pb.1 - pa.1) as f64);
        let lerp = |t: f64| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
        let mut t = 0.0;
        if on && current.is_empty() {
            current.push(a);
        }
        while len > 0.0 && (1.0 - t) * len > left {
            t += left / len;
            if on {
                current.push(lerp(t));
                out.push(std::mem::take(&mut current));
                left = gap;
            } else {
                current.push(lerp(t));
                left = dash;
            }
            on = !on;
        }
        left -= (1.0 - t) * len;
        if on {
            current.push(b);
        }
    }
    if current.len() > 1 {
        out.push(current);
    }
    out
}

fn draw_line_trace(
    root: &Area,
    cc: &mut Chart,
    style: &FigureStyle,
    t: &LineTrace,
    markers: bool,
) -> Result<()> {
    let color = t.color;
    let line = color.stroke_width(style.px(t.width).round().max(1.0) as u32);

    if let Some(errors) = &t.errors {
        let elw = errors.color.stroke_width(style.px(errors.width).round().max(1.0) as u32);
        let cap = errors
            .color
            .stroke_width(style.px(errors.capthick).round().max(1.0) as u32);
        let half_cap = style.px(errors.capsize as f64).round() as i32;
        for (i, &(x, y)) in t.points.iter().enumerate() {
            if let Some(e) = errors.yerr.as_ref().and_then(|v| v.get(i)) {
                let lo = cc.backend_coord(&(x, y - e));
                let hi = cc.backend_coord(&(x, y + e));
                root.draw(&PathElement::new(vec![lo, hi], elw))?;
                if half_cap > 0 {
                    for p in [lo, hi] {
                        root.draw(&PathElement::new(
                            vec![(p.0 - half_cap, p.1), (p.0 + half_cap, p.1)],
                            cap,
                        ))?;
                    }
                }
            }
            if let Some(e) = errors.xerr.as_ref().and_then(|v| v.get(i)) {
                let lo = cc.backend_coord(&(x - e, y));
                let hi = cc.backend_coord(&(x + e, y));
                root.draw(&PathElement::new(vec![lo, hi], elw))?;
                if half_cap > 0 {
                    for p in [lo, hi] {
                        root.draw(&PathElement::new(
                            vec![(p.0, p.1 - half_cap), (p.0, p.1 + half_cap)],
                            cap,
                        ))?;
                    }
                }
            }
        }
    }

    let anno = if t.dashed {
        let segments = dashes(cc, &t.points, style.px(DASH_PT), style.px(GAP_PT));
        cc.draw_series(segments.into_iter().map(|s| PathElement::new(s, line)))?
    } else {
        cc.draw_series(LineSeries::new(t.points.iter().copied(), line))?
    };
    if !t.label.is_empty() {
        anno.label(t.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    if markers && !t.dashed {
        let radius = style.px(3.0).round() as i32;
        cc.draw_series(
            t.points
                .iter()
                .map(|&p| Circle::new(p, radius, color.filled())),
        )?;
    }
    Ok(())
}

fn draw_box(
    cc: &mut Chart,
    style: &FigureStyle,
    g: &BoxGroup,
    slot: f64,
    orientation: Orientation,
) -> Result<()> {
    let at = |value: f64, offset: f64| match orientation {
        Orientation::Vertical => (slot + offset, value),
        Orientation::Horizontal => (value, slot + offset),
    };
    let s = g.stats;
    let edge = BLACK.stroke_width(1);
    cc.draw_series(std::iter::once(Rectangle::new(
        [at(s.q1, -HALF_SLOT), at(s.q3, HALF_SLOT)],
        g.color.filled(),
    )))?;
    cc.draw_series(std::iter::once(Rectangle::new(
        [at(s.q1, -HALF_SLOT), at(s.q3, HALF_SLOT)],
        edge,
    )))?;
    let cap = HALF_SLOT / 2.0;
    cc.draw_series(
        [
            vec![at(s.median, -HALF_SLOT), at(s.median, HALF_SLOT)],
            vec![at(s.q1, 0.0), at(s.whisker_lo, 0.0)],
            vec![at(s.q3, 0.0), at(s.whisker_hi, 0.0)],
            vec![at(s.whisker_lo, -cap), at(s.whisker_lo, cap)],
            vec![at(s.whisker_hi, -cap), at(s.whisker_hi, cap)],
        ]
        .into_iter()
        .map(|path| PathElement::new(path, edge)),
    )?;
    let radius = style.px(3.0).round() as i32;
    cc.draw_series(
        g.fliers
            .iter()
            .map(|f| Circle::new(at(*f, 0.0), radius, edge)),
    )?;
    Ok(())
}

fn draw_violin(cc: &mut Chart, g: &ViolinGroup, slot: f64, half: bool) -> Result<()> {
    let edge = BLACK.stroke_width(1);
    if g.ys.len() < 2 {
        if let (Some(y), Some(w)) = (g.ys.first(), g.half_widths.first()) {
            let left = if half { slot } else { slot - w };
            cc.draw_series(std::iter::once(PathElement::new(
                vec![(left, *y), (slot + w, *y)],
                g.color.stroke_width(2),
            )))?;
        }
        return Ok(());
    }
    let mut outline: Vec<(f64, f64)> = g
        .ys
        .iter()
        .zip(&g.half_widths)
        .map(|(y, w)| (slot + w, *y))
        .collect();
    outline.extend(
        g.ys.iter()
            .zip(&g.half_widths)
            .rev()
            .map(|(y, w)| (if half { slot } else { slot - w }, *y)),
    );
    cc.draw_series(std::iter::once(Polygon::new(
        outline.clone(),
        g.color.mix(0.8).filled(),
    )))?;
    if let Some(first) = outline.first().copied() {
        outline.push(first);
    }
    cc.draw_series(std::iter::once(PathElement::new(outline, edge)))?;
    Ok(())
}

fn draw_pie(
    area: &Area,
    style: &FigureStyle,
    slices: &[PieSlice],
    start_angle: f64,
    labels: PieLabels,
) -> Result<()> {
    let total: f64 = slices.iter().map(|s| s.value).sum();
    if total <= 0.0 {
        return Err(eyre!("No data to export"));
    }
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.35;
    let point = |deg: f64, r: f64| {
        let rad = deg.to_radians();
        (
            (center.0 + r * rad.cos()).round() as i32,
            (center.1 - r * rad.sin()).round() as i32,
        )
    };
    let label_font = (FONT, style.font(style.tick_size)).into_font();
    let pct_font = (FONT, style.font(style.legend_size)).into_font();

    let mut angle = start_angle;
    for s in slices.iter().filter(|s| s.value > 0.0) {
        let sweep = 360.0 * s.value / total;
        let steps = (sweep / 2.0).ceil().max(1.0) as usize;
        let mut outline = vec![point(0.0, 0.0)];
        outline.extend((0..=steps).map(|i| point(angle + sweep * i as f64 / steps as f64, radius)));
        area.draw(&Polygon::new(outline.clone(), s.color.filled()))?;
        outline.push(point(0.0, 0.0));
        area.draw(&PathElement::new(outline, WHITE.stroke_width(1)))?;

        let mid = angle + sweep / 2.0;
        let hpos = if mid.to_radians().cos() >= 0.0 {
            HPos::Left
        } else {
            HPos::Right
        };
        area.draw(&Text::new(
            s.label.clone(),
            point(mid, radius * 1.1),
            label_font.color(&BLACK).pos(Pos::new(hpos, VPos::Center)),
        ))?;
        if let Some(pct) = labels.format(100.0 * s.value / total) {
            area.draw(&Text::new(
                pct,
                point(mid, radius * 0.6),
                pct_font.color(&BLACK).pos(Pos::new(HPos::Center, VPos::Center)),
            ))?;
        }
        angle += sweep;
    }
    Ok(())
}

/// Slice colors for `n` slices.
pub fn pie_colors(n: usize) -> Vec<RGBColor> {
    DEFAULT_CYCLE.iter().copied().cycle().take(n).collect()
}
