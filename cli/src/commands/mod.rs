mod backup;
mod chart;
mod demo;
mod goal;
mod helpers;
mod weight;

pub(crate) use backup::{cmd_backup_export, cmd_backup_import};
pub(crate) use chart::cmd_chart;
pub(crate) use demo::{cmd_demo_clear, cmd_demo_load};
pub(crate) use goal::{cmd_goal_clear, cmd_goal_set, cmd_goal_show};
pub(crate) use weight::{cmd_clear_all, cmd_delete, cmd_history, cmd_log, cmd_stats};
