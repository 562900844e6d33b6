//! Paporg command line
//!
//! Validates rule resources, previews decisions and serves classification
//! requests over stdin/stdout.

use anyhow::{Context, Result};
use clap::Parser;
use paporg::config::{Config, Severity};
use paporg::{ConfigWatcher, SharedEngine};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "paporg")]
#[command(author, version, about = "Rule-based document classification")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the resources directory
    #[arg(short, long, value_name = "DIR")]
    resources: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate rule and variable resources
    Check,

    /// List rules in evaluation order
    List,

    /// Show the placement decision for one document
    Simulate {
        /// Original filename of the document
        #[arg(short, long)]
        filename: String,

        /// Extracted document text
        #[arg(short, long, conflicts_with = "text_file")]
        text: Option<String>,

        /// Read the extracted text from a file
        #[arg(long, value_name = "FILE")]
        text_file: Option<PathBuf>,
    },

    /// Answer JSON requests on stdin, reloading resources as they change
    Serve,
}

/// One line of `serve` input
#[derive(Debug, Deserialize)]
struct Request {
    text: String,
    filename: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.resources {
        config.general.resources_dir = Some(dir);
    }

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("PAPORG_LOG").unwrap_or(log_level),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Check => {
            let (engine, issues) = config.build_engine()?;
            for issue in &issues {
                println!("{}", issue);
            }

            let errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            if errors > 0 {
                eprintln!("✗ {} error(s), {} warning(s)", errors, issues.len() - errors);
                std::process::exit(1);
            }

            println!("✓ Resources are valid");
            println!("  {} rules", engine.rules().len());
            println!("  {} variables", engine.variables().len());
        }
        Commands::List => {
            let (engine, issues) = config.build_engine()?;
            paporg::config::validation::log_issues(&issues);

            println!("Rules:");
            for (i, rule) in engine.rules().iter().enumerate() {
                let status = if rule.spec.enabled { "✓" } else { "✗" };
                println!(
                    "  {} [{}] {} (priority {}, category '{}')",
                    status,
                    i + 1,
                    rule.name,
                    rule.spec.priority,
                    rule.spec.category
                );
            }

            println!("Variables:");
            for (name, spec) in engine.variables() {
                println!("  ${} = /{}/", name, spec.pattern);
            }
        }
        Commands::Simulate {
            filename,
            text,
            text_file,
        } => {
            let text = match (text, text_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Either --text or --text-file is required"),
            };

            let (engine, issues) = config.build_engine()?;
            paporg::config::validation::log_issues(&issues);

            let decision = engine.select(&text, &filename);
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Serve => serve(&config).await?,
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<()> {
    use tokio::signal;

    let resources_dir = config
        .resources_dir()
        .context("Could not determine resources directory")?;
    std::fs::create_dir_all(&resources_dir)
        .with_context(|| format!("Failed to create {}", resources_dir.display()))?;

    let shared = Arc::new(SharedEngine::default());
    let mut watcher = ConfigWatcher::new(
        Arc::clone(&shared),
        &resources_dir,
        config.unsorted.clone(),
        config.general.polling_interval_secs,
        config.general.debounce_seconds,
    )?;
    watcher.reload()?;
    watcher.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    info!("Serving requests on stdin. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => {
                        serde_json::to_string(&shared.select(&request.text, &request.filename))?
                    }
                    Err(e) => {
                        warn!("Bad request: {}", e);
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                };
                stdout.write_all(response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            _ = tick.tick() => {
                // A failed reload keeps serving the previous rule set
                if let Err(e) = watcher.process_events() {
                    warn!("{:#}", e);
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
