//! Population trend chart drawn with Plotters inside a Ratatui buffer.
//!
//! Each category gets one colored line over the available years. Drawing goes
//! through `plotters-ratatui-backend`, so axis ticks come from Plotters.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::domain::TrendSeries;

/// Line colors, in category order. Mirrored by the legend in the TUI.
pub const PALETTE: [(u8, u8, u8); 6] = [
    (0, 255, 255),
    (255, 200, 0),
    (0, 255, 0),
    (255, 80, 80),
    (200, 120, 255),
    (255, 255, 255),
];

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct TrendChart<'a> {
    /// One line per category, points sorted by year.
    pub lines: &'a [Vec<(f64, f64)>],
    /// X bounds (years).
    pub x_bounds: [f64; 2],
    /// Y bounds (population).
    pub y_bounds: [f64; 2],
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for TrendChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(((x1 - x0) as usize + 1).min(8))
                .y_labels(5)
                .x_label_formatter(&|v| format!("{:.0}", v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            for (idx, line) in self.lines.iter().enumerate() {
                let (r, g, b) = PALETTE[idx % PALETTE.len()];
                let color = RGBColor(r, g, b);
                chart.draw_series(LineSeries::new(line.iter().copied(), &color))?;
                // Single-year series have no segment; mark the point.
                chart.draw_series(line.iter().map(|&(x, y)| Pixel::new((x, y), color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Lines for the `limit` largest categories, with x/y bounds.
pub fn trend_lines(trend: &TrendSeries, limit: usize) -> (Vec<Vec<String>>, Vec<Vec<(f64, f64)>>, [f64; 2], [f64; 2]) {
    let keys: Vec<Vec<String>> = trend.categories().into_iter().take(limit).collect();
    let lines: Vec<Vec<(f64, f64)>> = keys
        .iter()
        .map(|k| trend.line(k).into_iter().map(|(y, v)| (y as f64, v)).collect())
        .collect();

    let years = trend.years();
    let (first, last) = match (years.first(), years.last()) {
        (Some(&a), Some(&b)) => (a as f64, b as f64),
        _ => (0.0, 1.0),
    };
    // Pad so a lone year still spans the axis.
    let x_bounds = if last > first { [first, last] } else { [first - 1.0, last + 1.0] };

    let y_max = lines
        .iter()
        .flatten()
        .map(|&(_, v)| v)
        .fold(0.0_f64, f64::max);
    let y_bounds = [0.0, if y_max > 0.0 { y_max * 1.1 } else { 1.0 }];

    (keys, lines, x_bounds, y_bounds)
}
