use clap::{Parser, Subcommand};
use time::{macros::format_description, Date};

#[derive(Debug, Parser)]
#[command(name = "camp")]
#[command(about = "Terminal client for TimeCamp time tracking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the authenticated user
    Me,
    /// List time entries for a day (defaults to today)
    Entries {
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// List tasks as a tree
    Tasks,
    /// Show the running timer, if any
    Timer,
    /// Start a timer unless one is already running
    Start,
    /// Stop the running timer
    Stop,
    /// Edit an entry's date, times or task
    Edit {
        id: i64,
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
        /// Start time, HH:MM:SS
        #[arg(long)]
        start: Option<String>,
        /// End time, HH:MM:SS
        #[arg(long)]
        end: Option<String>,
        /// Task id, or the first letters of a top-level task name
        #[arg(long)]
        task: Option<String>,
    },
    /// Move an entry to another task
    Reassign {
        id: i64,
        /// Task id, or the first letters of a top-level task name
        task: String,
    },
    /// Delete an entry
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Load profile, entries, timers and tasks at once
    Overview {
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Print config path and create default file if missing
    ConfigPath,
}

pub fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("expected a date like 2024-05-01, got {:?}", value))
}
