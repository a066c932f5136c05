//! BBS Archiver CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use bbs_archiver::{
    error::Result,
    models::Config,
    pipeline,
    services::StageContext,
    storage::ProductionBackends,
    utils::{http::HttpFetcher, shutdown},
};
use clap::{Parser, Subcommand};

/// bbs-archiver - Legacy BBS Archiver
#[derive(Parser, Debug)]
#[command(
    name = "bbs-archiver",
    version,
    about = "Archives boards, threads and posts of a legacy BBS"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register every board listed on the board index
    Boards,

    /// Harvest thread ids of the given boards
    Reids {
        /// Comma-separated board codes
        #[arg(short, long, value_delimiter = ',', required = true)]
        boards: Vec<String>,

        /// Worker count (defaults to config, then CPU count)
        #[arg(short = 't', long)]
        nthreads: Option<usize>,
    },

    /// Archive pending threads of the given boards
    Posts {
        /// Comma-separated board codes
        #[arg(short, long, value_delimiter = ',', required = true)]
        boards: Vec<String>,

        /// Harvest thread ids before archiving
        #[arg(short, long)]
        reid: bool,

        /// Worker count (defaults to config, then CPU count)
        #[arg(short = 't', long)]
        nthreads: Option<usize>,
    },

    /// Clear pending threads and mark boards for a fresh harvest
    Reset {
        /// Comma-separated board codes
        #[arg(short, long, value_delimiter = ',', required = true)]
        boards: Vec<String>,
    },

    /// Show status, pending and archived counts per board
    Info {
        /// Comma-separated board codes (default: every known board)
        #[arg(short, long, value_delimiter = ',')]
        boards: Vec<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    log::info!("Loaded configuration from {}", cli.config.display());
    if !matches!(cli.command, Command::Validate) {
        config.validate()?;
    }
    let config = Arc::new(config);

    let (trigger, shutdown) = shutdown::channel();
    shutdown::listen_for_ctrl_c(trigger);

    let fetcher = Arc::new(HttpFetcher::from_config(&config.crawler)?);
    let backends = Arc::new(ProductionBackends::from_config(&config.storage));
    let ctx = StageContext::new(Arc::clone(&config), fetcher, backends, shutdown);

    match cli.command {
        Command::Boards => {
            pipeline::run_boards(&ctx).await?;
        }

        Command::Reids { boards, nthreads } => {
            let ctx = ctx.with_workers(nthreads);
            pipeline::run_reids(&ctx, &boards).await?;
        }

        Command::Posts {
            boards,
            reid,
            nthreads,
        } => {
            let ctx = ctx.with_workers(nthreads);
            pipeline::run_posts(&ctx, &boards, reid).await?;
        }

        Command::Reset { boards } => {
            pipeline::run_reset(&ctx, &boards).await?;
        }

        Command::Info { boards } => {
            pipeline::run_info(&ctx, &boards).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}
