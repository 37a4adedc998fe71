use anyhow::Result;

use heft_core::db::Database;
use heft_core::service::TrackerService;

use super::helpers::format_change;

pub(crate) fn cmd_goal_set(svc: &TrackerService<Database>, lbs: f64, json: bool) -> Result<()> {
    svc.set_goal(lbs)?;

    if json {
        println!("{}", serde_json::json!({ "goal": lbs }));
    } else {
        println!("Goal set to {lbs:.1} lbs");
    }

    Ok(())
}

pub(crate) fn cmd_goal_show(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let goal = svc.goal()?;

    if json {
        println!("{}", serde_json::json!({ "goal": goal }));
        return Ok(());
    }

    match goal {
        None => eprintln!("No goal set. Use `heft goal set <lbs>`."),
        Some(goal) => {
            println!("Goal: {goal:.1} lbs");
            if let Some(latest) = svc.latest()? {
                let to_go = latest.weight_lbs - goal;
                println!(
                    "Current: {:.1} lbs ({} lbs to go)",
                    latest.weight_lbs,
                    format_change(to_go)
                );
            }
        }
    }

    Ok(())
}

pub(crate) fn cmd_goal_clear(svc: &TrackerService<Database>, json: bool) -> Result<()> {
    let cleared = svc.clear_goal()?;

    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared {
        println!("Goal cleared");
    } else {
        eprintln!("No goal was set");
    }

    Ok(())
}
