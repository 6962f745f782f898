//! feedstock-tick CLI
//!
//! Ticks every feedstock the user maintains: version bump, checksum
//! update, fork push, and re-render handoff.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use feedstock_tick::{Result, Ticker};

#[derive(Parser)]
#[command(name = "feedstock-tick")]
#[command(about = "Tick conda-forge feedstock versions and push updates", long_about = None)]
#[command(version)]
struct Cli {
    /// GitHub password or OAuth token
    #[arg(env = "GITHUB_TOKEN")]
    credential: String,

    /// GitHub username (can be omitted with an OAuth token)
    #[arg(long)]
    user: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let ticker = Ticker::new(cli.credential, cli.user)?;
    let report = ticker.run().await?;
    report.print();

    Ok(())
}
