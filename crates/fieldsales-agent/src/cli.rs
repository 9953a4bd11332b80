use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fieldsales_core::AttendanceStatus;

#[derive(Parser)]
#[command(
    name = "fieldsales-agent",
    about = "Geofenced attendance and location sync for field sales agents"
)]
pub struct Cli {
    /// Path to the agent config file
    #[arg(long, short, global = true, default_value = "fieldsales.toml")]
    pub config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mount an attendance session and keep syncing until interrupted
    Run {
        /// Go online right after mounting
        #[arg(long)]
        online: bool,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Distance from a position to the configured branch
    Distance {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },
    /// Set the attendance status
    Toggle {
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Push the current position once
    SyncNow,
    /// Show the sales profile and its standing
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Online,
    Offline,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Online => AttendanceStatus::Online,
            StatusArg::Offline => AttendanceStatus::Offline,
        }
    }
}
