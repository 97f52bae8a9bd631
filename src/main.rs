use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use adstar::{config::Config, export, pipeline};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "adstar",
    about = "Reshapes a flat advertising performance export into a star schema"
)]
struct Args {
    /// Configuration file; created interactively on first run.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_bootstrap(&args.config)?;
    init_logging(config.general.log_file.as_deref())?;
    info!(config = %args.config.display(), "startup");

    let output = pipeline::run(&config)?;
    export::append_tables(&config.database, &output.tables).await?;

    info!(
        rows = output.typed.n_rows(),
        tables = output.tables.len(),
        "run complete"
    );
    Ok(())
}

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) if !path.is_empty() => {
            let file =
                File::create(path).with_context(|| format!("creating log file {}", path))?;
            let file = Arc::new(file);
            fmt::Subscriber::builder()
                .with_env_filter(env)
                .with_ansi(false)
                .with_writer(move || Arc::clone(&file))
                .init();
        }
        _ => {
            fmt::Subscriber::builder()
                .with_env_filter(env)
                .with_span_events(fmt::format::FmtSpan::CLOSE)
                .init();
        }
    }
    Ok(())
}
