use std::path::Path;

use clap::Parser;
use dotenvy::dotenv;
use finance_tracker::config::{Cli, Command};
use finance_tracker::{app_state, backend, cli, open_database, telemetry};

const TUI_LOG_FILE: &str = "finance_tracker.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Cli::parse();
    let config = args.config.clone();

    match args.command() {
        Command::Server => {
            telemetry::init_stderr(args.log_level())?;
            let pool = open_database(&config).await?;
            backend::run_server(app_state(pool, &config), config.bind).await?;
        }
        Command::Migrate => {
            telemetry::init_stderr(args.log_level())?;
            open_database(&config).await?;
            println!("Migrations applied to {}", config.database_url);
        }
        Command::Tui => {
            telemetry::init_file(args.log_level(), Path::new(TUI_LOG_FILE))?;
            let pool = open_database(&config).await?;
            cli::run(app_state(pool, &config)).await?;
        }
    }
    Ok(())
}
