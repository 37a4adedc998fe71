use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use heft_core::db::Database;
use heft_core::models::LabelFormat;
use heft_core::service::TrackerService;

/// Width of the inline bar column in characters.
const BAR_WIDTH: usize = 40;

pub(crate) fn cmd_chart(
    svc: &TrackerService<Database>,
    period: u32,
    format: Option<String>,
    json: bool,
) -> Result<()> {
    let format = format
        .as_deref()
        .map(str::parse::<LabelFormat>)
        .transpose()?;
    let points = svc.chart(period, format)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        eprintln!("No weight entries in the last {period} days.");
        return Ok(());
    }

    // Scale bars across the observed range; a flat series gets full bars.
    let min = points
        .iter()
        .map(|p| p.weight_lbs)
        .fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.weight_lbs)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    #[derive(Tabled)]
    struct ChartRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (lbs)")]
        weight: String,
        #[tabled(rename = "Trend")]
        bar: String,
    }

    let rows: Vec<ChartRow> = points
        .iter()
        .map(|p| {
            let filled = if span > 0.0 {
                let frac = (p.weight_lbs - min) / span;
                1 + ((BAR_WIDTH - 1) as f64 * frac).round() as usize
            } else {
                BAR_WIDTH
            };
            ChartRow {
                date: p.date.clone(),
                weight: if p.is_averaged {
                    format!("{:.1}*", p.weight_lbs)
                } else {
                    format!("{:.1}", p.weight_lbs)
                },
                bar: "\u{2589}".repeat(filled),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    if points.iter().any(|p| p.is_averaged) {
        println!("* average of multiple readings that day");
    }

    Ok(())
}
