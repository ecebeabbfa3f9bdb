use std::{fmt::Debug, path::Path};

use plotters::{coord::types::RangedCoordf64, prelude::*};
use tracing::debug;

use crate::{
    error::{Error, Result},
    metric::MetricResult,
};

/// Turns a computed metric into an image at `path`
pub trait ChartRenderer {
    fn render(&self, result: &MetricResult, path: &Path) -> Result<()>;
}

const PALETTE: [RGBColor; 17] = [
    RGBColor(128, 0, 0),
    RGBColor(145, 30, 180),
    RGBColor(67, 99, 216),
    RGBColor(245, 130, 49),
    RGBColor(60, 180, 75),
    RGBColor(70, 240, 240),
    RGBColor(240, 50, 230),
    RGBColor(188, 246, 12),
    RGBColor(250, 190, 190),
    RGBColor(230, 190, 255),
    RGBColor(230, 25, 75),
    RGBColor(0, 0, 117),
    RGBColor(128, 0, 0),
    RGBColor(154, 99, 36),
    RGBColor(128, 128, 128),
    RGBColor(255, 255, 255),
    RGBColor(0, 0, 0),
];

/// Direction of the hatch lines inside a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hatch {
    /// `///`
    Forward,
    /// `\\\`
    Back,
}

impl Hatch {
    fn for_series(idx: usize) -> Self {
        if idx % 2 == 0 { Hatch::Forward } else { Hatch::Back }
    }
}

/// Grouped bar chart, one group per label and one bar per configuration
#[derive(Debug, Clone)]
pub struct BarChart {
    pub width: u32,
    pub height: u32,
    /// Width of a single bar, in units of the group spacing
    pub bar_width: f64,
    /// Pixel distance between hatch lines
    pub hatch_spacing: i32,
}

impl Default for BarChart {
    fn default() -> Self {
        Self {
            width: 1120,
            height: 352,
            bar_width: 0.18,
            hatch_spacing: 6,
        }
    }
}

fn render_err<E: Debug>(what: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Render(format!("{what}: {e:?}"))
}

/// Vertical extent of the chart: the metric's fixed range, or zero up to a
/// little above the largest value
pub fn y_range(result: &MetricResult) -> (f64, f64) {
    if let Some(range) = result.clamp() {
        return range;
    }
    let max = result
        .series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 { (0.0, max * 1.1) } else { (0.0, 1.0) }
}

/// Centre offset of bar `idx` out of `count` within its group
pub fn bar_offset(idx: usize, count: usize, bar_width: f64) -> f64 {
    (idx as f64 - (count / 2) as f64) * bar_width
}

/// Diagonal line segments filling the pixel rectangle spanned by `a` and `b`,
/// `spacing` pixels apart and clipped to the rectangle
pub fn hatch_segments(
    a: (i32, i32),
    b: (i32, i32),
    spacing: i32,
    hatch: Hatch,
) -> Vec<[(i32, i32); 2]> {
    let (left, right) = (a.0.min(b.0), a.0.max(b.0));
    let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
    let (w, h) = (right - left, bottom - top);
    if w <= 0 || h <= 0 || spacing <= 0 {
        return Vec::new();
    }

    // `u` runs along x from the anchor side, `k - u` up from the bottom edge
    let point = |k: i32, u: i32| match hatch {
        Hatch::Forward => (right - u, bottom - (k - u)),
        Hatch::Back => (left + u, bottom - (k - u)),
    };
    (spacing..w + h)
        .step_by(spacing as usize)
        .map(|k| [point(k, (k - h).max(0)), point(k, k.min(w))])
        .collect()
}

fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 0.3 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

impl ChartRenderer for BarChart {
    fn render(&self, result: &MetricResult, path: &Path) -> Result<()> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err("Fill background"))?;

        let n_labels = result.labels.len();
        let n_series = result.series.len();
        let (y_min, y_max) = y_range(result);
        debug!(
            "Rendering {} with {n_labels} groups of {n_series} bars to {path:?}",
            result.metric
        );

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(n_labels as f64 - 0.5), y_min..y_max)
            .map_err(render_err("Build chart"))?;

        let labels = &result.labels;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n_labels)
            .x_label_formatter(&|x: &f64| label_at(labels, *x))
            .x_desc("Benchmarks")
            .y_desc(result.axis_label())
            .label_style(("sans-serif", 14))
            .axis_desc_style(("sans-serif", 16))
            .draw()
            .map_err(render_err("Draw mesh"))?;

        for (idx, series) in result.series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            let offset = bar_offset(idx, n_series, self.bar_width);
            let bars: Vec<[(f64, f64); 2]> = series
                .values
                .iter()
                .enumerate()
                .map(|(pos, value)| {
                    let centre = pos as f64 + offset;
                    let top = value.clamp(y_min, y_max);
                    [
                        (centre - self.bar_width / 2.0, y_min),
                        (centre + self.bar_width / 2.0, top),
                    ]
                })
                .collect();

            self.draw_hatching(&root, &chart, &bars, color, Hatch::for_series(idx))?;
            chart
                .draw_series(
                    bars.iter()
                        .map(|corners| Rectangle::new(*corners, color.stroke_width(1))),
                )
                .map_err(render_err("Draw bars"))?
                .label(series.configuration.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.stroke_width(1)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 14))
            .draw()
            .map_err(render_err("Draw legend"))?;

        root.present().map_err(render_err("Write image"))?;
        Ok(())
    }
}

impl BarChart {
    fn draw_hatching<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        chart: &ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
        bars: &[[(f64, f64); 2]],
        color: RGBColor,
        hatch: Hatch,
    ) -> Result<()> {
        for [low, high] in bars {
            let a = chart.backend_coord(low);
            let b = chart.backend_coord(high);
            for segment in hatch_segments(a, b, self.hatch_spacing, hatch) {
                root.draw(&PathElement::new(segment.to_vec(), color.stroke_width(1)))
                    .map_err(render_err("Draw hatching"))?;
            }
        }
        Ok(())
    }
}
