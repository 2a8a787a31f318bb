use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

fn env_filter(level: tracing::Level) -> EnvFilter {
    // RUST_LOG wins over -v
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Log to stderr, used by the HTTP server and one-shot commands.
pub fn init_stderr(level: tracing::Level) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    let subscriber = Registry::default().with(fmt_layer).with(env_filter(level));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Log to a file; the terminal belongs to the TUI while it runs.
pub fn init_file(level: tracing::Level, path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::sync::Mutex::new(file));

    let subscriber = Registry::default().with(fmt_layer).with(env_filter(level));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
