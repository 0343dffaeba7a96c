//! sql2mongo CLI - copy relational table rows into MongoDB collections.

use clap::Parser;
use sql2mongo::{Config, LoadError, Orchestrator, SourceCatalog};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "sql2mongo")]
#[command(about = "Copy rows from a MySQL or PostgreSQL table into a MongoDB collection")]
#[command(version)]
struct Cli {
    /// Path to the job configuration file (YAML or JSON)
    #[arg(short, long, default_value = "sql2mongo.yaml")]
    config: PathBuf,

    /// Name of the job to run
    #[arg(short, long)]
    job: Option<String>,

    /// List enabled jobs and exit
    #[arg(long)]
    list: bool,

    /// Validate the configuration file and exit
    #[arg(long)]
    configtest: bool,

    /// Keep binary column values as binary instead of decoding them to text
    #[arg(long, alias = "dontconvertbytes")]
    dont_convert_bytes: bool,

    /// Keep the source `id` column instead of renaming it to `_id`
    #[arg(long, alias = "dontconvertid")]
    dont_convert_id: bool,

    /// Override the number of concurrent write workers
    #[arg(long)]
    workers: Option<usize>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Shorthand for --verbosity debug
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), LoadError> {
    let cli = Cli::parse();

    let verbosity = if cli.debug { "debug" } else { cli.verbosity.as_str() };
    setup_logging(verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;

    if cli.configtest {
        println!(
            "Configuration {} is valid ({} jobs, {} enabled)",
            cli.config.display(),
            config.jobs.len(),
            config.enabled_jobs().count()
        );
        return Ok(());
    }

    if cli.list {
        for job in config.enabled_jobs() {
            println!("{}: {}", job.name, job.description);
        }
        return Ok(());
    }

    let name = cli.job.as_deref().ok_or_else(|| {
        LoadError::Config("no job given; pass --job <name> or use --list".to_string())
    })?;
    let job = config.job(name)?;

    let mut settings = config.settings.clone();
    if let Some(workers) = cli.workers {
        if workers == 0 {
            return Err(LoadError::Config("--workers must be at least 1".to_string()));
        }
        settings.workers = workers;
    }

    info!(
        "Running job '{}': {} table {} into {}",
        job.name,
        job.source_type,
        job.source.display_target(),
        job.destination.display_target()
    );

    let catalog = SourceCatalog::with_builtins();
    let orchestrator = Orchestrator::connect(job, &catalog, &settings)
        .await?
        .with_conversions(!cli.dont_convert_bytes, !cli.dont_convert_id);

    let cancel_token = setup_signal_handler();
    let outcome = orchestrator.run(cancel_token).await?;

    if cli.output_json {
        println!("{}", outcome.to_json()?);
    } else {
        println!("Load completed with {} rows written", outcome);
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for --list and --output-json.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the run on SIGINT (Ctrl-C) or SIGTERM.
///
/// Rows already handed to the writer finish; the cursor is closed and the
/// partial tally is logged.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to install {} handler: {}", name, e);
                    return;
                }
            };
            stream.recv().await;
            eprintln!("\nReceived {}. Stopping the load...", name);
            token.cancel();
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
            return;
        }
        eprintln!("\nReceived Ctrl-C. Stopping the load...");
        token.cancel();
    });

    cancel_token
}
