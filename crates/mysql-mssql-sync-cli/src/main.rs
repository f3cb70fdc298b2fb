//! mysql-mssql-sync CLI - replicate a MySQL table into SQL Server.

use clap::{Parser, Subcommand};
use mysql_mssql_sync::error::{EXIT_CONNECTION_ERROR, EXIT_WRITE_ERROR};
use mysql_mssql_sync::{
    connect_primary, connect_secondary, Config, PageRequest, Record, ReplicationSource,
    Replicator, SyncError, SyncServer,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mysql-mssql-sync")]
#[command(about = "Replicate records from MySQL into SQL Server")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override server.bind (host:port)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the primary and secondary tables if missing
    InitSchema,

    /// Insert one record into the primary store
    Store {
        /// Primary key
        #[arg(long)]
        pk: i64,

        /// Payload (at most 1000 characters)
        #[arg(long)]
        payload: String,
    },

    /// List one page of the primary store
    ListPrimary {
        #[arg(long)]
        page: Option<i64>,

        #[arg(long)]
        page_size: Option<i64>,

        /// Substring filter on primary key or payload
        #[arg(long)]
        search: Option<String>,
    },

    /// List one page of the secondary store
    ListSecondary {
        #[arg(long)]
        page: Option<i64>,

        #[arg(long)]
        page_size: Option<i64>,

        /// Substring filter on primary key or payload
        #[arg(long)]
        search: Option<String>,
    },

    /// Copy records from the primary store into the secondary store
    Replicate {
        /// Replicate only this primary page
        #[arg(long, conflicts_with = "input")]
        page: Option<i64>,

        /// Page size used with --page
        #[arg(long, requires = "page")]
        page_size: Option<i64>,

        /// Replicate records read from a JSON file instead of the primary store
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Write every primary record to a JSON file
    Export {
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let page_request = |page: Option<i64>, page_size: Option<i64>, search: Option<&str>| {
        PageRequest::from_query(
            page,
            page_size,
            search,
            config.sync.default_page_size,
            config.sync.max_page_size,
        )
    };

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind.parse().map_err(|_| {
                SyncError::Config(format!("bind must be a socket address, got '{}'", bind))
            })?;

            let primary = connect_primary(&config).await?;
            let secondary = connect_secondary(&config).await?;
            let shutdown = setup_signal_handler()?;

            SyncServer::new(primary.clone(), secondary.clone(), &config.sync)
                .run(addr, shutdown)
                .await?;

            primary.close().await;
            secondary.close().await;
        }

        Commands::InitSchema => {
            let primary = connect_primary(&config).await?;
            let secondary = connect_secondary(&config).await?;
            primary.ensure_schema().await?;
            secondary.ensure_schema().await?;
            println!("Schema ready in {} and {}", primary.db_type(), secondary.db_type());
        }

        Commands::Store { pk, payload } => {
            let record = Record::new(pk, payload);
            record.validate()?;
            let primary = connect_primary(&config).await?;
            primary.insert(&record).await?;
            println!("Record {} stored in primary store", record.primary_key);
        }

        Commands::ListPrimary {
            page,
            page_size,
            search,
        } => {
            let request = page_request(page, page_size, search.as_deref())?;
            let primary = connect_primary(&config).await?;
            let page = primary.list(&request).await?;
            print_page(&page, cli.output_json)?;
        }

        Commands::ListSecondary {
            page,
            page_size,
            search,
        } => {
            let request = page_request(page, page_size, search.as_deref())?;
            let secondary = connect_secondary(&config).await?;
            let page = secondary.list(&request).await?;
            print_page(&page, cli.output_json)?;
        }

        Commands::Replicate {
            page,
            page_size,
            input,
        } => {
            let source = match (input, page) {
                (Some(path), _) => {
                    let content = std::fs::read_to_string(&path)?;
                    let records: Vec<Record> = serde_json::from_str(&content)?;
                    info!("Read {} records from {:?}", records.len(), path);
                    ReplicationSource::Records(records)
                }
                (None, Some(page)) => {
                    ReplicationSource::Page(page_request(Some(page), page_size, None)?)
                }
                (None, None) => ReplicationSource::All,
            };

            let primary = connect_primary(&config).await?;
            let secondary = connect_secondary(&config).await?;
            let summary = Replicator::new(primary, secondary)
                .with_read_batch_size(config.sync.read_batch_size)
                .replicate(source)
                .await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                let status_msg = if summary.is_success() {
                    "Replication completed!"
                } else {
                    "Replication stopped!"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", summary.run_id);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!(
                    "  Records: {}/{}",
                    summary.succeeded, summary.records_attempted
                );
                if let Some(pk) = summary.failed_primary_key {
                    println!("  Failed primary key: {}", pk);
                }
                if let Some(ref err) = summary.error {
                    println!("  Error: {}", err);
                }
            }

            if !summary.is_success() {
                return Ok(ExitCode::from(EXIT_WRITE_ERROR));
            }
        }

        Commands::Export { output } => {
            let primary = connect_primary(&config).await?;
            let records = primary.read_all(config.sync.read_batch_size).await?;
            std::fs::write(&output, serde_json::to_string_pretty(&records)?)?;
            println!("Exported {} records to {}", records.len(), output.display());
        }

        Commands::HealthCheck => {
            let primary = connect_primary(&config).await;
            let secondary = connect_secondary(&config).await;

            let primary_result = match &primary {
                Ok(store) => store.test_connection().await,
                Err(e) => Err(SyncError::connection(e, "connecting primary store")),
            };
            let secondary_result = match &secondary {
                Ok(store) => store.test_connection().await,
                Err(e) => Err(SyncError::connection(e, "connecting secondary store")),
            };
            let healthy = primary_result.is_ok() && secondary_result.is_ok();
            let primary_type = config.primary.r#type.as_str();
            let secondary_type = config.secondary.r#type.as_str();

            if cli.output_json {
                let result = serde_json::json!({
                    "healthy": healthy,
                    "primary": {
                        "type": primary_type,
                        "ok": primary_result.is_ok(),
                        "error": primary_result.as_ref().err().map(|e| e.to_string()),
                    },
                    "secondary": {
                        "type": secondary_type,
                        "ok": secondary_result.is_ok(),
                        "error": secondary_result.as_ref().err().map(|e| e.to_string()),
                    },
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Primary ({}): {}",
                    primary_type,
                    if primary_result.is_ok() { "OK" } else { "FAILED" }
                );
                if let Err(ref err) = primary_result {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Secondary ({}): {}",
                    secondary_type,
                    if secondary_result.is_ok() { "OK" } else { "FAILED" }
                );
                if let Err(ref err) = secondary_result {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !healthy {
                return Ok(ExitCode::from(EXIT_CONNECTION_ERROR));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_page(page: &mysql_mssql_sync::Page, output_json: bool) -> Result<(), SyncError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    println!(
        "Page {} of {} ({} records total, page size {})",
        page.page,
        page.total_pages().max(1),
        page.total_count,
        page.page_size
    );
    for record in &page.items {
        println!("  {:>10}  {}", record.primary_key, record.payload);
    }
    Ok(())
}

/// Logs go to stderr so stdout stays clean for `--output-json`.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token_int = cancel_token.clone();
    tokio::spawn(async move {
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Shutting down gracefully...");
        token_int.cancel();
    });

    let token_term = cancel_token.clone();
    tokio::spawn(async move {
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Shutting down gracefully...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
        }
        token.cancel();
    });

    Ok(cancel_token)
}
