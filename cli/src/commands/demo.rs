use anyhow::Result;

use heft_core::db::Database;
use heft_core::service::TrackerService;

pub(crate) fn cmd_demo_load(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let summary = svc.load_demo_data()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Loaded {} demo entries ({} total).",
            summary.added, summary.total
        );
        if summary.goal_set {
            println!("Set a demo goal weight. `heft demo clear` removes it again.");
        }
    }

    Ok(())
}

pub(crate) fn cmd_demo_clear(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let summary = svc.clear_demo_data()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Removed {} demo entries; kept {} of yours.",
            summary.removed, summary.preserved
        );
        if summary.goal_cleared {
            println!("Cleared the demo goal weight.");
        }
    }

    Ok(())
}
