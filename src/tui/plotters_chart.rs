//! Plotters-powered contribution chart widget for Ratatui.
//!
//! Horizontal bars, one per feature, top row first. Bars to the right of zero
//! push toward "bad" and are drawn red; bars to the left push toward "good"
//! and are drawn green. Feature names are drawn by the caller next to the
//! chart area, since Plotters text is hard to read at terminal resolution.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Half the bar height in row units.
const BAR_HALF_HEIGHT: f64 = 0.3;

/// A render-only chart description; all bounds are computed outside `render()`.
pub struct ContributionChart<'a> {
    /// Signed contribution per bar, top to bottom.
    pub values: &'a [f64],
    /// X bounds (log-odds), symmetric around zero.
    pub x_bounds: [f64; 2],
    pub fmt_x: fn(f64) -> String,
}

impl<'a> Widget for ContributionChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        if !(x0.is_finite() && x1.is_finite()) || x1 <= x0 || self.values.is_empty() {
            return;
        }
        let rows = self.values.len() as f64;

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, 0.0..rows)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .disable_y_axis()
                .x_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            let bad_color = RGBColor(255, 0, 0); // red
            let good_color = RGBColor(0, 255, 0); // green

            chart.draw_series(self.values.iter().enumerate().map(|(i, &v)| {
                let center = rows - i as f64 - 0.5;
                let color = if v > 0.0 { bad_color } else { good_color };
                Rectangle::new(
                    [(0.0, center - BAR_HALF_HEIGHT), (v, center + BAR_HALF_HEIGHT)],
                    color.filled(),
                )
            }))?;

            // Zero axis.
            chart.draw_series(LineSeries::new([(0.0, 0.0), (0.0, rows)], &WHITE))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(v: f64) -> String {
        format!("{v:+.1}")
    }

    fn text(buf: &Buffer) -> String {
        buf.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn bars_draw_into_the_buffer() {
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        ContributionChart {
            values: &[0.4, -0.2, 0.1],
            x_bounds: [-0.5, 0.5],
            fmt_x: fmt,
        }
        .render(area, &mut buf);
        assert_ne!(buf, Buffer::empty(area));
    }

    #[test]
    fn tiny_area_shows_a_resize_hint() {
        let area = Rect::new(0, 0, 19, 5);
        let mut buf = Buffer::empty(area);
        ContributionChart {
            values: &[0.4],
            x_bounds: [-0.5, 0.5],
            fmt_x: fmt,
        }
        .render(area, &mut buf);
        assert!(text(&buf).starts_with("Chart area"));
    }

    #[test]
    fn empty_values_leave_the_buffer_blank() {
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        ContributionChart {
            values: &[],
            x_bounds: [-0.5, 0.5],
            fmt_x: fmt,
        }
        .render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
