use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use event_harvester::config::Config;
use event_harvester::context::InMemoryJobContext;
use event_harvester::handlers::{self, create_source};
use event_harvester::http::HttpFetcher;
use event_harvester::logging;
use event_harvester::pipeline::{run_source, Collaborators};
use event_harvester::tracker::{InMemoryTracker, ProcessedItemTracker, SqliteTracker};
use event_harvester::types::FetchContext;

#[derive(Parser)]
#[command(name = "event_harvester")]
#[command(about = "Multi-source event import and deduplication pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scheduled tick of a configured pipeline
    Run {
        /// Pipeline name from the config file
        #[arg(long)]
        pipeline: String,
        /// Path to the config file
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        /// SQLite file for processed-item state; omit for in-memory
        /// (dedup then lasts only for this invocation)
        #[arg(long)]
        state_db: Option<PathBuf>,
    },
    /// List the pipelines in the config file
    List {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// List the available source types
    Sources,
}

async fn run_tick(
    pipeline: &str,
    config_path: &PathBuf,
    state_db: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_from(config_path)?;
    let Some(pipeline_config) = config.find_pipeline(pipeline) else {
        error!("No pipeline named '{}' in {}", pipeline, config_path.display());
        println!("⚠️  Unknown pipeline: {pipeline}");
        return Ok(());
    };
    let Some(source) = create_source(&pipeline_config.source) else {
        error!("Unknown source type '{}'", pipeline_config.source);
        println!("⚠️  Unknown source type: {}", pipeline_config.source);
        return Ok(());
    };

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("tick", pipeline = %pipeline, run_id = %run_id);

    let http = HttpFetcher::new(&config.settings)?;
    let tracker: Box<dyn ProcessedItemTracker> = match state_db {
        Some(path) => Box::new(SqliteTracker::open(path)?),
        None => Box::new(InMemoryTracker::new()),
    };
    let job_context = InMemoryJobContext::new();

    let ctx = FetchContext {
        pipeline_id: pipeline_config.pipeline_id,
        config: pipeline_config.handler_json()?,
        flow_step_id: pipeline_config.flow_step_id.clone(),
        flow_id: pipeline_config.flow_id,
        job_id: pipeline_config.job_id.clone(),
    };
    let collab = Collaborators {
        http: &http,
        settings: &config.settings,
        tracker: tracker.as_ref(),
        job_context: &job_context,
    };

    // Instrument the future rather than holding an entered span guard
    // across the await
    let units = async {
        info!(source = %pipeline_config.source, "Starting pipeline tick");
        let units = run_source(source.as_ref(), &ctx, &collab).await;
        info!("Tick finished with {} unit(s)", units.len());
        units
    }
    .instrument(span)
    .await;

    match units.first() {
        Some(unit) => println!("{}", serde_json::to_string_pretty(unit)?),
        None => println!("No new events this run."),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            pipeline,
            config,
            state_db,
        } => {
            run_tick(&pipeline, &config, state_db.as_ref()).await?;
        }
        Commands::List { config } => {
            let config = Config::load_from(&config)?;
            if config.pipelines.is_empty() {
                println!("No pipelines configured.");
            }
            for p in &config.pipelines {
                println!(
                    "{}  (source: {}, pipeline_id: {}, flow_id: {})",
                    p.name, p.source, p.pipeline_id, p.flow_id
                );
            }
        }
        Commands::Sources => {
            for source_type in handlers::SOURCE_TYPES {
                println!("{source_type}");
            }
        }
    }
    Ok(())
}
