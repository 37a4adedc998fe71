use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use heft_core::db::Database;
use heft_core::service::TrackerService;

use super::helpers::{
    confirm, format_change, format_timestamp, json_error, parse_date, parse_time, timestamp_for,
};

pub(crate) fn cmd_log(
    svc: &TrackerService<Database>,
    value: f64,
    date: Option<String>,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let recorded_at = if date.is_none() && time.is_none() {
        None
    } else {
        let date = parse_date(date)?;
        let time = time.as_deref().map(parse_time).transpose()?;
        Some(timestamp_for(date, time)?)
    };

    let entry = svc.log_weight(value, recorded_at)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Logged {:.1} lbs at {}",
            entry.weight_lbs,
            format_timestamp(entry.recorded_at)
        );
    }

    Ok(())
}

pub(crate) fn cmd_history(
    svc: &TrackerService<Database>,
    days: Option<u32>,
    raw: bool,
    json: bool,
) -> Result<()> {
    if raw {
        return cmd_history_raw(svc, json);
    }

    let entries = svc.daily_history(days.map(|d| d as usize))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `heft log` to record your weight.");
    } else {
        #[derive(Tabled)]
        struct DayRow {
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Weight (lbs)")]
            weight: String,
            #[tabled(rename = "Entries")]
            entries: String,
        }

        let rows: Vec<DayRow> = entries
            .iter()
            .map(|a| DayRow {
                date: a.day.format("%Y-%m-%d").to_string(),
                weight: format!("{:.1}", a.weight_lbs),
                entries: if a.is_averaged {
                    format!("{} (averaged)", a.original_entries)
                } else {
                    "1".to_string()
                },
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    Ok(())
}

/// Individual readings, one row per log entry, with ids for deletion.
fn cmd_history_raw(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let entries = svc.measurements()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `heft log` to record your weight.");
    } else {
        #[derive(Tabled)]
        struct EntryRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Recorded")]
            recorded: String,
            #[tabled(rename = "Weight (lbs)")]
            weight: String,
            #[tabled(rename = "Demo")]
            demo: String,
        }

        let rows: Vec<EntryRow> = entries
            .iter()
            .map(|m| EntryRow {
                id: m.id,
                recorded: format_timestamp(m.recorded_at),
                weight: format!("{:.1}", m.weight_lbs),
                demo: if m.is_demo { "yes" } else { "" }.to_string(),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_delete(svc: &TrackerService<Database>, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_measurement(id)?;

    if json {
        if deleted {
            println!("{}", serde_json::json!({ "deleted": id }));
        } else {
            println!("{}", json_error(&format!("No weight entry with id {id}")));
        }
    } else if deleted {
        println!("Deleted weight entry {id}");
    } else {
        eprintln!("No weight entry with id {id}");
    }

    Ok(())
}

pub(crate) fn cmd_stats(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let latest = svc.latest()?;
    let change = svc.stats()?;
    let goal = svc.goal()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "latest": latest,
                "change": change,
                "goal": goal,
            }))?
        );
        return Ok(());
    }

    let Some(latest) = latest else {
        eprintln!("No weight entries found. Use `heft log` to record your weight.");
        return Ok(());
    };

    println!(
        "Current: {:.1} lbs ({})",
        latest.weight_lbs,
        latest.day.format("%Y-%m-%d")
    );
    println!("Start:   {:.1} lbs", change.start);
    println!("Change:  {} lbs", format_change(change.change));
    if let Some(goal) = goal {
        let to_go = latest.weight_lbs - goal;
        println!("Goal:    {goal:.1} lbs ({} lbs to go)", format_change(to_go));
    }

    Ok(())
}

pub(crate) fn cmd_clear_all(svc: &TrackerService<Database>, yes: bool, json: bool) -> Result<()> {
    if !yes && !confirm("Delete ALL weight entries and your goal? This cannot be undone.")? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let removed = svc.clear_all_data()?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Removed {removed} weight entries and cleared the goal.");
    }

    Ok(())
}
