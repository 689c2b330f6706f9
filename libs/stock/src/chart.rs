use anyhow::{Error, ensure};
use charming::{
    Chart, ImageFormat, ImageRenderer,
    component::{Axis, Title},
    element::{AxisLabel, AxisType, LineStyle, SplitLine, Symbol, TextStyle},
    series::Line,
};

use crate::StockSnapshot;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 600;

const UP: &str = "#00d084";
const DOWN: &str = "#ff4d4f";

/// Intraday close line chart for one snapshot, as PNG bytes.
pub fn render_history(snapshot: &StockSnapshot, width: u32, height: u32) -> Result<Vec<u8>, Error> {
    let chart = history_chart(snapshot)?;

    let mut renderer = ImageRenderer::new(width, height);
    let png_bytes = renderer.render_format(ImageFormat::Png, &chart)?;
    Ok(png_bytes)
}

fn history_chart(snapshot: &StockSnapshot) -> Result<Chart, Error> {
    ensure!(
        !snapshot.history.is_empty(),
        "history is empty for {}",
        snapshot.symbol
    );

    let color = if snapshot.change_pct >= 0.0 { UP } else { DOWN };

    let chart = Chart::new()
        .background_color("#0b0c17")
        .title(
            Title::new()
                .text(format!(
                    "{} | ${:.2} ({:+.2}%)",
                    snapshot.symbol, snapshot.latest_close, snapshot.change_pct
                ))
                .left("center")
                .top("2%")
                .text_style(TextStyle::new().color("#ffffff").font_size(14)),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(snapshot.labels())
                .axis_label(AxisLabel::new().rotate(45).interval(11).color("#a0a0a0"))
                .split_line(SplitLine::new().line_style(LineStyle::new().color("#2d2f45"))),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .scale(true)
                .axis_label(AxisLabel::new().color("#a0a0a0"))
                .split_line(SplitLine::new().line_style(LineStyle::new().color("#2d2f45"))),
        )
        .series(
            Line::new()
                .name("Close")
                .data(snapshot.closes())
                .symbol(Symbol::None)
                .line_style(LineStyle::new().width(2).color(color)),
        );

    Ok(chart)
}
