use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use prensa_client::{
    AzureVision, BrowserArticleSource, BrowserEngine, GenAiSentiment, ListingScanner,
    ProviderConfig, ReqwestFetcher, WatsonNlu,
};
use prensa_core::consumer::{ConsumerService, TracingConsumerReporter};
use prensa_core::enrich::EnrichmentOrchestrator;
use prensa_core::models::{ConsumerConfig, HarvestConfig};
use prensa_core::pipeline::HarvestService;
use prensa_core::publish::QueuePublisher;
use prensa_core::sink::JsonFileSink;
use prensa_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "prensa", version, about = "News article harvester and enricher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest articles from a site's index page
    Harvest {
        /// Index page URL to scan
        #[arg(short, long)]
        url: String,

        /// Directory for the JSON output file (standalone mode)
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Publish records to the queue instead of a local file
        /// (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        queue: bool,

        /// Maximum number of sections to process
        #[arg(long, default_value_t = 3)]
        max_sections: usize,

        /// Maximum number of articles per section
        #[arg(long, default_value_t = 3)]
        max_articles: usize,
    },

    /// Drain the queue into the document store
    Consume {
        /// Stable consumer identity (random by default)
        #[arg(long)]
        consumer_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prensa=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    spawn_shutdown_handler(cancel.clone());

    match cli.command {
        Commands::Harvest {
            url,
            out,
            queue,
            max_sections,
            max_articles,
        } => {
            let config = HarvestConfig {
                max_sections: Some(max_sections),
                max_articles_per_section: Some(max_articles),
            };
            cmd_harvest(&url, &out, queue, config, cancel).await?;
        }
        Commands::Consume { consumer_id } => {
            cmd_consume(consumer_id, cancel).await?;
        }
    }

    Ok(())
}

fn spawn_shutdown_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            cancel.cancel();
        }
    });
}

async fn cmd_harvest(
    url: &str,
    out: &std::path::Path,
    queue: bool,
    config: HarvestConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let fetcher = ReqwestFetcher::new().context("Failed to build HTTP client")?;
    let listing = ListingScanner::new(fetcher);

    let engine = BrowserEngine::launch()
        .await
        .context("Failed to launch headless browser")?;
    let articles = BrowserArticleSource::new(engine);

    let providers = ProviderConfig::from_env().context("Enrichment provider configuration")?;
    let enricher = EnrichmentOrchestrator::new(
        WatsonNlu::new(&providers.watson_url, &providers.watson_api_key)?,
        AzureVision::new(&providers.vision_endpoint, &providers.vision_key)?,
        GenAiSentiment::new(&providers.genai_api_key)?,
    );

    if queue {
        let db = connect_db().await?;
        let sink = QueuePublisher::new(db.queue_repo());
        let service = HarvestService::new(listing, articles, enricher, sink, config);
        let report = service.run(url, &cancel).await?;
        print_report(&report);
    } else {
        let sink = JsonFileSink::new(url, out);
        let service = HarvestService::new(listing, articles, enricher, sink.clone(), config);
        let report = service.run(url, &cancel).await?;
        let path = sink.finish().await?;
        println!("Wrote {} records to {}", sink.len(), path.display());
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &prensa_core::HarvestReport) {
    println!(
        "Sections: {}  Stubs: {}  Delivered: {}  Skipped: {}",
        report.sections_seen, report.stubs_seen, report.articles_delivered, report.articles_skipped
    );
}

async fn cmd_consume(consumer_id: Option<String>, cancel: CancellationToken) -> Result<()> {
    let db = connect_db().await?;

    let mut config = ConsumerConfig::default();
    if let Some(id) = consumer_id {
        config = config.with_consumer_id(id);
    }

    let service = ConsumerService::new(db.queue_repo(), db.article_repo(), config);
    service
        .run(cancel, &TracingConsumerReporter)
        .await
        .context("Consumer loop failed")?;

    Ok(())
}

async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().context("Database configuration")?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to run migrations")?;
    Ok(db)
}
