//! jobmatch CLI
//!
//! Command-line interface for operating the recommendation pipeline on a
//! local store and index.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobmatch::{
    ingest, AppConfig, AppContext, Area, Error, FeedbackLedger, JobQuery, ProfileDraft, Rating,
    RecommendRequest, RecordStore, Result, Seniority,
};

#[derive(Parser)]
#[command(name = "jobmatch")]
#[command(author, version, about = "Semantic job recommendation", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "jobmatch.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "jobmatch.toml")]
        output: String,
    },

    /// Ingest jobs from a JSON Lines file and index them
    Ingest {
        /// One job object per line
        #[arg(short, long)]
        input: String,

        /// Stop after this many jobs
        #[arg(long)]
        limit: Option<usize>,

        /// Jobs per indexing batch (defaults to indexing.batch_size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Index every job that has no embedding yet
    Reindex,

    /// Create a profile from an extracted resume draft (JSON)
    Profile {
        #[arg(short, long)]
        input: String,
    },

    /// Recompute the stored query text of a profile
    Refresh {
        #[arg(short, long)]
        session: String,
    },

    /// Recommend jobs for a profile
    Recommend {
        #[arg(short, long)]
        session: String,

        /// Number of results (defaults to matching.default_count)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(long)]
        area: Option<String>,

        #[arg(long)]
        seniority: Option<String>,

        /// Substring the job location must contain
        #[arg(long)]
        location: Option<String>,
    },

    /// Record a relevance judgment
    Feedback {
        #[arg(short, long)]
        session: String,

        #[arg(short, long)]
        job: i64,

        /// 1 for relevant, -1 for irrelevant
        #[arg(short, long, allow_hyphen_values = true)]
        rating: i8,

        /// 1-based position the job was shown at
        #[arg(long)]
        rank: Option<u32>,

        /// Similarity shown with the job
        #[arg(long)]
        score: Option<f64>,
    },

    /// Precision@K of a profile's feedback
    Precision {
        #[arg(short, long)]
        session: String,

        #[arg(short, long, default_value = "10")]
        k: usize,
    },

    /// List stored jobs
    Jobs {
        #[arg(long)]
        area: Option<String>,

        #[arg(long)]
        seniority: Option<String>,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_context(config_path: &str) -> Result<AppContext> {
    if Path::new(config_path).exists() {
        info!("Loading configuration from: {}", config_path);
    } else {
        info!("Using default configuration");
    }
    let config = AppConfig::load_or_default(config_path)?;
    jobmatch::metrics::describe();
    AppContext::open(config).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Commands::Init { output } = &cli.command {
        info!("Writing default configuration to: {}", output);
        AppConfig::default().save(output)?;
        info!("Configuration saved successfully");
        return Ok(());
    }

    let context = open_context(&cli.config).await?;

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Ingest {
            input,
            limit,
            batch_size,
        } => {
            let jobs = ingest::read_jobs(&input, limit).await?;
            info!("Read {} jobs from {}", jobs.len(), input);
            let batch_size = batch_size.unwrap_or(context.config.indexing.batch_size);
            let report = ingest::ingest_jobs(&context.engine, jobs, batch_size).await;
            // Persist whatever was committed before a failure.
            context.persist().await?;
            print_json(&report?)?;
        }

        Commands::Reindex => {
            let result = context.indexer().spawn().await.map_err(|e| {
                Error::InvalidState(format!("indexing task did not complete: {}", e))
            })?;
            context.persist().await?;
            print_json(&result?)?;
        }

        Commands::Profile { input } => {
            let raw = tokio::fs::read(&input).await?;
            let draft: ProfileDraft = serde_json::from_slice(&raw)?;
            let profile = context.engine.create_profile(draft).await?;
            if profile.query_text().is_none() {
                warn!("Profile has no usable content; recommendations will be refused");
            }
            context.persist().await?;
            print_json(&profile)?;
        }

        Commands::Refresh { session } => {
            let profile = context.engine.refresh_profile_query(&session).await?;
            context.persist().await?;
            print_json(&profile)?;
        }

        Commands::Recommend {
            session,
            count,
            area,
            seniority,
            location,
        } => {
            let request = RecommendRequest {
                session_id: session,
                desired_count: count.unwrap_or(context.config.matching.default_count),
                area,
                seniority,
                location,
            };
            let recommendations = context.engine.recommend_request(&request).await?;
            print_json(&recommendations)?;
        }

        Commands::Feedback {
            session,
            job,
            rating,
            rank,
            score,
        } => {
            let rating = Rating::try_from(rating)?;
            let id = context
                .ledger
                .record(&session, job, rating, rank, score)
                .await?;
            context.persist().await?;
            print_json(&serde_json::json!({
                "id": id,
                "message": FeedbackLedger::ack_message(rating),
            }))?;
        }

        Commands::Precision { session, k } => {
            let report = context.ledger.precision_report(&session, k).await?;
            print_json(&report)?;
        }

        Commands::Jobs {
            area,
            seniority,
            skip,
            limit,
        } => {
            let query = JobQuery {
                area: area.as_deref().map(str::parse::<Area>).transpose()?,
                seniority: seniority
                    .as_deref()
                    .map(str::parse::<Seniority>)
                    .transpose()?,
                skip,
                limit,
            };
            let jobs = context.engine.store().list_jobs(&query).await?;
            print_json(&jobs)?;
        }
    }

    Ok(())
}
