//! backup-pruner
//!
//! Deletes all but the newest N backups of every boot volume and block
//! volume in an OCI compartment.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use blockstorage_sdk::{BlockstorageClient, ClientOptions, OciProfile, RetryPolicy};
use clap::Parser;
use common::Configuration;
use common::cli::{CommonArgs, utils};
use pruner::orchestrator::{EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};
use pruner::{ClassSelection, CleanupOrchestrator, CleanupPlan};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compartment OCID whose backups are pruned
    #[arg(short = 'c', long, required_unless_present = "print_config")]
    compartment_id: Option<String>,

    /// Backups to keep per volume (values below 1 keep one)
    #[arg(
        short = 'k',
        long,
        allow_negative_numbers = true,
        required_unless_present = "print_config"
    )]
    keep: Option<i64>,

    /// Only process boot volume backups
    #[arg(long)]
    boot_only: bool,

    /// Only process block volume backups
    #[arg(long)]
    block_only: bool,

    /// Show what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Seconds each worker waits after a successful delete (default 0.5)
    #[arg(long, value_name = "SECONDS")]
    sleep_between: Option<f64>,

    /// Number of concurrent delete workers (default 3)
    #[arg(long)]
    workers: Option<usize>,

    /// OCI config file (default ~/.oci/config)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Profile inside the OCI config file (default DEFAULT)
    #[arg(long)]
    profile: Option<String>,

    /// Region override, e.g. eu-frankfurt-1
    #[arg(long)]
    region: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

impl Cli {
    /// Layer command-line flags over the loaded settings.
    fn apply_overrides(&self, config: &mut Configuration) -> Result<()> {
        utils::apply_overrides(config, &self.common);

        if let Some(path) = &self.config {
            config.oci.config_file = path.clone();
        }
        if let Some(profile) = &self.profile {
            config.oci.profile = profile.clone();
        }
        if let Some(region) = &self.region {
            config.oci.region = Some(region.clone());
        }
        if let Some(workers) = self.workers {
            config.cleanup.workers = workers;
        }
        if let Some(secs) = self.sleep_between {
            config.cleanup.sleep_between = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid --sleep-between value {secs}"))?;
        }
        if self.dry_run {
            config.cleanup.dry_run = true;
        }

        Ok(())
    }
}

fn client_options(config: &Configuration) -> ClientOptions {
    ClientOptions {
        timeout: config.http.timeout,
        page_limit: config.http.page_limit,
        retry: RetryPolicy {
            max_attempts: config.retry.max_attempts,
            max_elapsed: config.retry.max_elapsed,
            initial_delay: config.retry.initial_delay,
            max_delay: config.retry.max_delay,
            backoff_multiplier: config.retry.backoff_multiplier,
        },
    }
}

/// Flip `shutdown` on the first Ctrl-C; exit immediately on the second.
fn spawn_interrupt_handler(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        warn!("Interrupt received, waiting for in-flight deletions to finish");
        let _ = shutdown.send(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt received, exiting without waiting");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}

async fn run(cli: Cli) -> Result<u8> {
    // Reject conflicting filters before touching settings or credentials.
    let classes = ClassSelection::from_flags(cli.boot_only, cli.block_only)?;

    let mut config = utils::load_config(cli.common.settings.as_ref())?;
    cli.apply_overrides(&mut config)?;
    config.validate().context("Invalid configuration")?;

    if cli.common.print_config {
        utils::display_config(&config)?;
        return Ok(EXIT_OK);
    }

    utils::init_logging(&config.logging.level, config.logging.file.as_deref())?;
    info!(
        "{}",
        utils::version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    );

    let compartment_id = cli
        .compartment_id
        .context("--compartment-id is required")?;
    let keep = cli.keep.context("--keep is required")?;

    let profile = OciProfile::load(Path::new(&config.oci.config_file), &config.oci.profile)
        .context("Failed to load OCI credentials")?;
    let profile = match &config.oci.region {
        Some(region) => profile.with_region(region.clone()),
        None => profile,
    };
    info!(
        profile = %profile.name,
        region = %profile.region,
        "Loaded OCI profile"
    );

    let client = BlockstorageClient::new(&profile, client_options(&config))
        .context("Failed to create Block Storage client")?;

    let plan = CleanupPlan {
        compartment_id,
        keep,
        classes,
        dry_run: config.cleanup.dry_run,
        concurrency: config.cleanup.workers,
        inter_item_delay: config.cleanup.sleep_between,
    };
    let orchestrator = CleanupOrchestrator::new(Arc::new(client), plan)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_interrupt_handler(shutdown_tx);

    let report = orchestrator.execute_until(shutdown_rx).await?;
    let exit_code = report.exit_code();
    info!(
        deleted = report.total_deleted(),
        errors = report.total_errors(),
        interrupted = report.interrupted,
        exit_code,
        "Cleanup finished"
    );

    Ok(exit_code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
