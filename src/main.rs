//! ticketdash - ticket dashboard from a CSV export
//!
//! Loads a tickets CSV once, filters it by organizational area and
//! aggregates it into the four dashboard charts, rendered as Markdown
//! or JSON chart descriptors.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, unreadable data, invalid weights, etc.)

mod analysis;
mod cli;
mod config;
mod dashboard;
mod dataset;
mod error;
mod models;
mod report;
mod session;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use dataset::LoadOptions;
use session::Session;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can enable verbose output
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("ticketdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ticketdash.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the data file, encoding, titles, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so reports on stdout can be piped.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the dataset and dispatch to the requested mode.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let options = LoadOptions {
        show_progress: !args.quiet,
    };
    let dataset = dataset::load_dataset(&config.data, &options)
        .with_context(|| format!("Failed to load {}", config.data.path.display()))?;

    if dataset.is_empty() {
        warn!("{} has a header but no tickets", config.data.path.display());
    }

    let session = Session::new(dataset, config, start_time.elapsed());

    if args.list_areas {
        print!("{}", session.area_listing());
        return Ok(());
    }

    if args.interactive {
        return run_interactive_mode(&session, &args).await;
    }

    run_report(&session, &args)
}

/// Render one report for `--area` (or all areas).
fn run_report(session: &Session, args: &Args) -> Result<()> {
    let selector = session.parse_selector(args.area.as_deref().unwrap_or(""));
    let report = session.build_report(&selector)?;
    let output = session.render(&report, args.format)?;

    match session.config().output_path() {
        Some(path) => {
            std::fs::write(&path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .context("Failed to write report to stdout")?;
            stdout.flush()?;
        }
    }

    if !args.quiet {
        eprintln!("\n📊 Dashboard Summary:");
        eprintln!("   Selection: {}", selector);
        eprintln!(
            "   Tickets: {} of {}",
            report.metadata.rows_selected, report.metadata.rows_total
        );
        if report.views.is_empty() {
            eprintln!("   (no tickets match this selection)");
        }
        eprintln!("   Projects: {}", report.views.by_label.len());
        eprintln!("   Categories: {}", report.views.by_category.len());
        eprintln!("   Duration: {:.3}s", report.metadata.duration_seconds);
    }

    Ok(())
}

/// Prompt for areas on stdin until EOF, `quit`, or Ctrl-C.
async fn run_interactive_mode(session: &Session, args: &Args) -> Result<()> {
    if session.config().output_path().is_some() {
        warn!("--output is ignored in interactive mode");
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary =
        session::run_interactive(session, stdin, &mut stdout, args.format, shutdown).await?;

    info!(
        "Interactive session ended{}: {} rendered, {} failed ({} tickets loaded)",
        if summary.interrupted { " by Ctrl-C" } else { "" },
        summary.rendered,
        summary.failed,
        session.dataset().len()
    );
    Ok(())
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    let mut config = if let Some(ref config_path) = args.config {
        Config::load(config_path)?
    } else {
        // Try default location
        match Config::load_default() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE_NAME, e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}
