mod commands;
mod config;
mod server;
mod tls;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_backup_export, cmd_backup_import, cmd_chart, cmd_clear_all, cmd_delete, cmd_demo_clear,
    cmd_demo_load, cmd_goal_clear, cmd_goal_set, cmd_goal_show, cmd_history, cmd_log, cmd_stats,
};
use crate::config::Config;
use heft_core::service::TrackerService;

#[derive(Parser)]
#[command(
    name = "heft",
    version,
    about = "A simple, local-first weight tracker",
    long_about = "\n\n  ██╗  ██╗███████╗███████╗████████╗
  ██║  ██║██╔════╝██╔════╝╚══██╔══╝
  ███████║█████╗  █████╗     ██║
  ██╔══██║██╔══╝  ██╔══╝     ██║
  ██║  ██║███████╗██║        ██║
  ╚═╝  ╚═╝╚══════╝╚═╝        ╚═╝
      know where you're heading.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a weight reading in pounds
    Log {
        /// Weight in lbs
        value: f64,
        /// Date to log for (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of the reading (HH:MM, 24-hour; default: noon when --date is given)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily weight history (one row per day, multi-reading days averaged)
    History {
        /// Limit to the most recent N tracked days
        #[arg(short, long)]
        days: Option<u32>,
        /// Show individual readings instead of daily averages
        #[arg(long)]
        raw: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a weight entry by ID (see `history --raw` for IDs)
    Delete {
        /// Entry ID to delete
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a trend chart for a trailing window of days
    Chart {
        /// Window length in days (7, 30, 90, or any positive number)
        #[arg(short, long, default_value = "30")]
        period: u32,
        /// Date label format: short, medium, full, iso (default depends on period)
        #[arg(long)]
        format: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current weight, total change, and goal progress
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage your goal weight
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Load or clear demo data
    Demo {
        #[command(subcommand)]
        command: DemoCommands,
    },
    /// Export or import a JSON backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Delete all data (entries and goal)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
        /// Enable TLS (HTTPS). Generates a self-signed certificate on first use.
        #[arg(long)]
        tls: bool,
        /// Path to TLS certificate file (PEM). Implies --tls.
        #[arg(long, value_name = "PATH")]
        tls_cert: Option<std::path::PathBuf>,
        /// Path to TLS private key file (PEM). Implies --tls.
        #[arg(long, value_name = "PATH")]
        tls_key: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Set your goal weight in lbs
    Set {
        /// Goal weight (lbs)
        lbs: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show your goal and progress toward it
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear your goal weight
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DemoCommands {
    /// Generate ~90 days of realistic demo entries
    Load {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove demo entries, keeping your own
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write all data to a JSON backup file
    Export {
        /// Destination file path
        file: std::path::PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore from a JSON backup file (replaces all current data)
    Import {
        /// Backup file path
        file: std::path::PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = TrackerService::open(&config.db_path)?;

    match cli.command {
        Commands::Log {
            value,
            date,
            time,
            json,
        } => cmd_log(&svc, value, date, time, json),
        Commands::History { days, raw, json } => cmd_history(&svc, days, raw, json),
        Commands::Delete { id, json } => cmd_delete(&svc, id, json),
        Commands::Chart {
            period,
            format,
            json,
        } => cmd_chart(&svc, period, format, json),
        Commands::Stats { json } => cmd_stats(&svc, json),
        Commands::Goal { command } => match command {
            GoalCommands::Set { lbs, json } => cmd_goal_set(&svc, lbs, json),
            GoalCommands::Show { json } => cmd_goal_show(&svc, json),
            GoalCommands::Clear { json } => cmd_goal_clear(&svc, json),
        },
        Commands::Demo { command } => match command {
            DemoCommands::Load { json } => cmd_demo_load(&svc, json),
            DemoCommands::Clear { json } => cmd_demo_clear(&svc, json),
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export { file, json } => cmd_backup_export(&svc, &file, json),
            BackupCommands::Import { file, yes, json } => {
                cmd_backup_import(&svc, &file, yes, json)
            }
        },
        Commands::Reset { yes, json } => cmd_clear_all(&svc, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
            tls,
            tls_cert,
            tls_key,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?)
            };
            let tls_config = if tls || tls_cert.is_some() || tls_key.is_some() {
                let cert_path = match tls_cert {
                    Some(path) => path,
                    None => config.tls_cert_path()?,
                };
                let key_path = match tls_key {
                    Some(path) => path,
                    None => config.tls_key_path()?,
                };
                Some(server::TlsConfig {
                    cert_path,
                    key_path,
                })
            } else {
                None
            };
            server::start_server(svc, port, &bind, api_key, tls_config).await
        }
    }
}
