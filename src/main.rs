use anyhow::Result;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gcp_sql_versions::app::run_inventory;
use gcp_sql_versions::cli::Cli;
use gcp_sql_versions::gcp::GcloudCredentials;
use gcp_sql_versions::progress::{BarProgress, NoopProgress, Progress};
use gcp_sql_versions::projects::GcloudProjectSource;
use gcp_sql_versions::report;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_normalized();
    init_tracing(cli.verbose);

    let config = cli.run_config();
    debug!(?config, "Parsed configuration");

    let progress: Arc<dyn Progress> = if config.show_progress && std::io::stderr().is_terminal() {
        Arc::new(BarProgress::new())
    } else {
        Arc::new(NoopProgress)
    };

    let summary =
        run_inventory(&GcloudProjectSource, &GcloudCredentials, &config, progress).await?;

    let cwd = std::env::current_dir()?;
    let today = chrono::Local::now().date_naive();
    let mut stdout = std::io::stdout().lock();
    report::report(
        config.output,
        summary.results.records(),
        &cwd,
        today,
        &mut stdout,
    )?;

    Ok(())
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over the -v flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "gcp_sql_versions=warn",
            1 => "gcp_sql_versions=info",
            2 => "gcp_sql_versions=debug",
            _ => "gcp_sql_versions=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
