use comfy_table::{Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{series::PriceSeries, window::Plan};

pub fn build_price_table(series: &PriceSeries) -> Table {
    #[allow(clippy::cast_precision_loss)]
    let average =
        series.samples().iter().map(|sample| sample.price.0).sum::<f64>() / series.len() as f64;

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec!["Hour", "Price"]);
    for sample in series.samples() {
        table.add_row(vec![
            Cell::new(format!("{:02}:00", sample.hour)),
            Cell::new(sample.price).set_alignment(CellAlignment::Right).fg(
                if sample.price.0 >= average { Color::Red } else { Color::Green },
            ),
        ]);
    }
    table
}

pub fn build_plan_table(plan: &Plan) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec!["Start", "Stop", "Minutes"]);
    for window in plan.iter() {
        table.add_row(vec![
            Cell::new(window.start.format("%H:%M")),
            Cell::new(window.stop.format("%H:%M")),
            Cell::new(window.duration().num_minutes()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
