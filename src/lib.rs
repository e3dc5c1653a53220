pub mod aggregator;
pub mod classifier;
pub mod cli;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod log_watch;
pub mod narrative;
pub mod settings;
pub mod sink;
pub mod stats;
pub mod timestamp;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

pub async fn run() -> Result<(), String> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let mut settings = settings::load_configured_settings(args.config.as_deref())
        .map_err(|error| error.to_string())?;
    args.apply_to(&mut settings);

    cli::execute(&args.command, &settings).await
}

// Logs go to stderr, the feed owns stdout.
fn init_logging(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
