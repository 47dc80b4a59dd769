//! profileprice-migrate CLI - copy PROFILEPRICE into MariaDB and ClickHouse.

use clap::{Parser, Subcommand};
use profileprice_migrate::{
    Config, MigrateError, MigrationOutcome, Orchestrator, StoreHealth,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "profileprice-migrate")]
#[command(about = "One-time PROFILEPRICE migration from MySQL into MariaDB and ClickHouse")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (environment variables are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to state file for resume capability
    #[arg(long)]
    state_file: Option<PathBuf>,

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
    /// Start a new migration
    Run,

    /// Resume a previously interrupted migration
    Resume,

    /// Validate row counts between source and targets
    Validate,

    /// Test database connections
    HealthCheck,
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

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let config = match cli.config {
        Some(ref path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let config = Config::from_env()?;
            info!("Loaded configuration from environment");
            config
        }
    };

    match cli.command {
        Commands::Run => {
            let mut orchestrator = Orchestrator::connect(config).await?;
            if let Some(ref path) = cli.state_file {
                orchestrator = orchestrator.with_state_file(path.clone());
            }

            let outcome = orchestrator.run().await?;
            print_outcome(&outcome, cli.output_json, "Migration completed!")?;
        }

        Commands::Resume => {
            let state_file = cli.state_file.ok_or_else(|| {
                MigrateError::Config("--state-file is required for resume".to_string())
            })?;

            let orchestrator = Orchestrator::connect(config)
                .await?
                .with_state_file(state_file)
                .resume()?;

            info!("Resuming from previous state");

            let outcome = orchestrator.run().await?;
            print_outcome(&outcome, cli.output_json, "Migration resumed and completed!")?;
        }

        Commands::Validate => {
            let orchestrator = Orchestrator::connect(config).await?;
            let report = orchestrator.validate().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Validation Results ({}):", report.table);
                println!("  Source:     {}", report.source_rows);
                println!("  Relational: {}", report.relational_rows);
                println!("  Analytical: {}", report.analytical_rows);
                println!(
                    "\n  Overall: {}",
                    if report.matches { "MATCH" } else { "MISMATCH" }
                );
            }

            if !report.matches {
                return Err(MigrateError::transfer(
                    &report.table,
                    "row counts differ between source and targets",
                ));
            }
        }

        Commands::HealthCheck => {
            let result = Orchestrator::check_health(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                print_store("Source (MySQL)", &result.source);
                print_store("Relational (MariaDB)", &result.relational);
                print_store("Analytical (ClickHouse)", &result.analytical);
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

fn print_outcome(
    outcome: &MigrationOutcome,
    output_json: bool,
    done_message: &str,
) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        MigrationOutcome::Completed(result) => {
            println!("\n{}", done_message);
            println!("  Run ID: {}", result.run_id);
            println!("  Duration: {:.2}s", result.duration_seconds);
            println!(
                "  Rows: {} read, {} written, {} skipped",
                result.rows_read, result.rows_written, result.rows_skipped
            );
            println!("  Batches: {}", result.batches);
            println!("  Throughput: {} rows/sec", result.rows_per_second);
        }
        MigrationOutcome::Skipped(reason) => {
            println!("\nMigration skipped: {}", reason);
        }
    }
    Ok(())
}

fn print_store(label: &str, health: &StoreHealth) {
    println!(
        "  {}: {} ({}ms)",
        label,
        if health.connected { "OK" } else { "FAILED" },
        health.latency_ms
    );
    if let Some(ref err) = health.error {
        println!("    Error: {}", err);
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

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

    Ok(())
}
