use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crossmod::config::{self, Config};
use crossmod::moderation::openai::OpenAiClient;
use crossmod::moderation::perspective::PerspectiveClient;
use crossmod::pipeline::orchestrator::{self, RunConfig};
use crossmod::pipeline::ShutdownSignal;
use crossmod::progress::ProgressTracker;

/// Crossmod: score a collected forum post dataset against the OpenAI
/// Moderation API and the Google Perspective API.
///
/// Processing is batched and resumable — interrupt with Ctrl-C and run
/// the same command again to pick up from the last completed batch.
#[derive(Parser)]
#[command(name = "crossmod", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the results database
    Init,

    /// Start or resume a processing run
    Run {
        /// Input collection file (overrides CROSSMOD_INPUT)
        #[arg(long)]
        input: Option<String>,

        /// Posts per batch — the unit of durable progress
        #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Minimum seconds between OpenAI requests
        #[arg(long, default_value_t = config::DEFAULT_RATE_INTERVAL_SECS)]
        openai_interval: f64,

        /// Minimum seconds between Perspective requests
        #[arg(long, default_value_t = config::DEFAULT_RATE_INTERVAL_SECS)]
        perspective_interval: f64,

        /// Attempts per request before a post is recorded as failed
        #[arg(long, default_value_t = config::DEFAULT_MAX_RETRIES)]
        max_retries: u32,

        /// Validate configuration and exit without processing
        #[arg(long)]
        validate_only: bool,
    },

    /// Show progress: records stored, batch index, remaining work
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crossmod=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing results database...");
            let config = Config::load()?;
            let db = crossmod::db::initialize(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nCrossmod is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: cargo run -- run");
        }

        Commands::Run {
            input,
            batch_size,
            openai_interval,
            perspective_interval,
            max_retries,
            validate_only,
        } => {
            let config = Config::load()?;
            let input_path = input.unwrap_or_else(|| config.input_path.clone());

            if validate_only {
                validate_configuration(&config, openai_interval, perspective_interval)?;
                return Ok(());
            }

            config.require_services()?;
            let db = crossmod::db::open(&config.db_path)?;

            let posts = crossmod::store::load_collection(std::path::Path::new(&input_path))?;
            if posts.is_empty() {
                anyhow::bail!("No posts found in {input_path}");
            }

            println!(
                "Processing {} posts (batch size {}, intervals {:.1}s / {:.1}s)...",
                posts.len(),
                batch_size,
                openai_interval,
                perspective_interval,
            );

            let openai = OpenAiClient::new(
                config.openai_api_key.clone(),
                openai_interval,
                max_retries,
            );
            let perspective = PerspectiveClient::new(
                config.perspective_api_key.clone(),
                perspective_interval,
                max_retries,
            );

            // Ctrl-C requests a stop at the next batch boundary; the
            // in-flight batch finishes and is recorded first.
            let shutdown = ShutdownSignal::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        println!(
                            "\n{}",
                            "Interrupt received — finishing the current batch...".yellow()
                        );
                        shutdown.trigger();
                    }
                });
            }

            let tracker = ProgressTracker::new(&db);
            let run_config = RunConfig { batch_size };

            let report = orchestrator::run(
                &posts,
                &openai,
                &perspective,
                &tracker,
                &run_config,
                &shutdown,
            )
            .await?;

            crossmod::output::terminal::display_run_report(&report);
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `crossmod init` to set up the database.");
                return Ok(());
            }
            let db = crossmod::db::open(&config.db_path)?;
            crossmod::status::show(&db, &config.db_path, &config.input_path).await?;
        }
    }

    Ok(())
}

/// Print what the run would use, without touching the network or database.
fn validate_configuration(config: &Config, openai_interval: f64, perspective_interval: f64) -> Result<()> {
    println!("Validating configuration...");
    println!(
        "  OpenAI API key:      {}",
        if config.openai_api_key.is_empty() {
            "Missing".red().to_string()
        } else {
            "Present".green().to_string()
        }
    );
    println!(
        "  Perspective API key: {}",
        if config.perspective_api_key.is_empty() {
            "Missing".red().to_string()
        } else {
            "Present".green().to_string()
        }
    );
    println!("  OpenAI interval:     {openai_interval:.1}s");
    println!("  Perspective interval: {perspective_interval:.1}s");
    println!("  Database path:       {}", config.db_path);
    println!("  Input path:          {}", config.input_path);

    config.require_services()?;
    println!("\n{}", "Configuration is valid.".green().bold());
    Ok(())
}
