//! Command line and environment configuration.
//!
//! Every flag falls back to an environment variable, which in turn may come
//! from a `.env` file loaded by `main` before parsing.

use std::net::SocketAddr;

use chrono::Duration;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "finance-tracker", version, about = "Personal finance tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Server,
    /// Run the terminal UI (default)
    Tui,
    /// Apply database migrations and exit
    Migrate,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://./finance_tracker.db",
        global = true
    )]
    pub database_url: String,

    #[arg(long, env = "FINANCE_BIND", default_value = "127.0.0.1:3000", global = true)]
    pub bind: SocketAddr,

    #[arg(long, env = "FINANCE_SESSION_TTL_HOURS", default_value_t = 168, global = true)]
    pub session_ttl_hours: i64,

    #[arg(long, env = "FINANCE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,
}

impl Config {
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours.max(1))
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Tui)
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            3 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
