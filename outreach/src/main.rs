/*
outreach - single-binary main.rs
Starts the Rocket HTTP server serving the daily newsletter, or generates one issue from the
terminal with --generate.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::{init_db_pool, Config, Credentials};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use outreach::llm::remote::RemoteLlmProvider;
use outreach::llm::summarizer::NewsletterSummarizer;
use outreach::search::serpapi::SerpApiClient;
use outreach::search::ArticleFetcher;
use outreach::server::{self, AppState};
use outreach::storage::{NewsletterStore, SqliteNewsletterStore};
use outreach::{IssueDate, Pipeline, PipelineSettings};

#[derive(Parser, Debug)]
#[command(name = "outreach", about = "Daily site newsletter: search, summarize, cache and serve")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print one newsletter to stdout instead of starting the server
    #[arg(long)]
    generate: bool,

    /// Issue date (YYYY-MM-DD) for --generate; defaults to today in the configured zone
    #[arg(long, requires = "generate")]
    date: Option<IssueDate>,

    /// Ignore any cached issue and overwrite it (use with --generate)
    #[arg(long, requires = "generate")]
    refresh: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    common::load_dotenv();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let mut config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    config.apply_env_overrides();
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let credentials = config.credentials();
    if credentials.search_api_key.is_none() {
        warn!("{} is not set; newsletter requests will fail", config.search.api_key_env());
    }
    if credentials.llm_api_key.is_none() {
        warn!("{} is not set; newsletter requests will fail", config.llm.api_key_env());
    }

    info!(db_path = %config.database.path, "opening newsletter cache");
    let db_pool = init_db_pool(&config.database.path).await?;
    let store = SqliteNewsletterStore::new(db_pool);
    store.init().await.context("failed to create news_archive table")?;

    let pipeline = Arc::new(build_pipeline(&config, credentials, Arc::new(store))?);

    if args.generate {
        let date = args.date.unwrap_or_else(|| pipeline.today());
        let newsletter = if args.refresh {
            pipeline.regenerate(date).await?
        } else {
            pipeline.newsletter_for(date).await?
        };
        println!("{}", newsletter);
        return Ok(());
    }

    info!("Launching Rocket HTTP server");
    server::launch_rocket(AppState::new(pipeline), server::figment(&config.server)).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Wire the search client, LLM client and cache into a pipeline.
fn build_pipeline(
    config: &Config,
    credentials: Credentials,
    store: Arc<dyn NewsletterStore>,
) -> Result<Pipeline> {
    let settings = PipelineSettings::from_config(config)?;

    let search = SerpApiClient::new(
        config.search.api_url(),
        credentials.search_api_key.clone().unwrap_or_default(),
        config.search.timeout_seconds(),
    )?
    .with_engine(config.search.engine(), config.search.language());

    let llm = RemoteLlmProvider::new(
        config.llm.api_url(),
        credentials.llm_api_key.clone().unwrap_or_default(),
        config.llm.model(),
    )
    .with_limits(config.llm.timeout_seconds, config.llm.max_tokens);
    info!(
        model = %llm.model(),
        site = %settings.site,
        timezone = %settings.timezone,
        "pipeline configured"
    );

    Ok(Pipeline::new(
        store,
        ArticleFetcher::new(Arc::new(search)),
        NewsletterSummarizer::new(Arc::new(llm)),
        settings,
        credentials,
    ))
}
