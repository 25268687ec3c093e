use anyhow::Context;
use clap::{Parser, Subcommand};
use notes_federation::{
    filter_by_source, filter_by_tag, unique_sources, unique_tags, Discovery, EndpointManager,
    FederationAggregator, Fetcher, FetchConfig, JsonFileStore, SourceStatus, Transport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notes-federation", about = "Aggregate developer notes from federated sources")]
struct Cli {
    /// JSON file holding the registered endpoints
    #[arg(long, env = "NOTES_FEDERATION_STORE", default_value = "endpoints.json", global = true)]
    store: PathBuf,

    /// Base URL of a proxy serving `/api/proxy?url=...`, used when direct fetches fail
    #[arg(long, env = "NOTES_FEDERATION_PROXY", global = true)]
    proxy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a site and register it
    Add { url: String },
    /// Unregister an endpoint by its metadata URL
    Remove { url: String },
    /// List registered endpoints
    List,
    /// Re-check one endpoint, or all of them
    Check { url: Option<String> },
    /// Check a site for its discovery document without registering it
    Validate { url: String },
    /// Fetch and print the merged feed
    Feed {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize notes per source
    Sources,
    /// List every tag in the merged feed
    Tags,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let fetch_config = FetchConfig {
        timeout_seconds: cli.timeout,
        proxy_url: cli.proxy.clone(),
        ..FetchConfig::default()
    };
    let max_concurrency = fetch_config.max_concurrency;
    let transport: Arc<dyn Transport> =
        Arc::new(Fetcher::new(fetch_config).context("failed to build HTTP client")?);

    let store = JsonFileStore::new(cli.store.clone());
    debug!("Using endpoint store {}", store.path().display());

    let discovery = Discovery::new(transport.clone());
    let mut manager = EndpointManager::new(store, discovery.clone());
    let aggregator = FederationAggregator::with_transport(transport, max_concurrency);

    match cli.command {
        Command::Add { url } => {
            let endpoint = manager.add(&url).await?;
            println!("Added {} ({})", endpoint.name, endpoint.url);
        }
        Command::Remove { url } => {
            manager.remove(&url);
            println!("Removed {}", url);
        }
        Command::List => {
            for endpoint in manager.list() {
                let checked = endpoint
                    .last_checked
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!("{}\t{}\t{}\t{}", endpoint.status, endpoint.name, endpoint.url, checked);
            }
        }
        Command::Check { url } => {
            let results = match url {
                Some(url) => {
                    let status = manager.check_health(&url).await;
                    vec![(url, status)]
                }
                None => manager.check_all().await,
            };
            for (url, status) in results {
                println!("{}\t{}", status, url);
            }
        }
        Command::Validate { url } => {
            let discovered = discovery.validate(&url).await?;
            println!("{}", serde_json::to_string_pretty(&discovered.document)?);
            println!("Metadata URL: {}", discovered.actual_url);
        }
        Command::Feed { source, tag, json } => {
            let result = aggregator.aggregate(&manager.urls()).await;

            for report in result.sources.iter().filter(|s| s.status == SourceStatus::Error) {
                error!("{}: {}", report.url, report.error.as_deref().unwrap_or("unknown error"));
            }
            if result.all_sources_failed() {
                error!("Every source failed");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let notes = filter_by_tag(
                    &filter_by_source(&result.notes, source.as_deref()),
                    tag.as_deref(),
                );
                for note in notes {
                    println!("{}\t{}\t{}\t{}", note.note.date, note.source.name, note.note.title, note.note.url);
                }
            }
        }
        Command::Sources => {
            let result = aggregator.aggregate(&manager.urls()).await;
            for summary in unique_sources(&result.notes) {
                println!("{}\t{}\t{}", summary.count, summary.name, summary.metadata_url);
            }
        }
        Command::Tags => {
            let result = aggregator.aggregate(&manager.urls()).await;
            for tag in unique_tags(&result.notes) {
                println!("{}", tag);
            }
        }
    }

    info!("Done");
    Ok(())
}
