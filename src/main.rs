//! # crawlcache CLI Application
//!
//! Command-line entry point for the crawl-and-cache service.
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP server (`POST /crawl`, `GET /health`)
//! - `crawl`: run the workflow once for a URL and print the result
//! - `prune`: delete expired cache rows
//!
//! Secrets and locations can come from the environment: `FIRECRAWL_API_KEY`,
//! `FIRECRAWL_API_URL`, `TURSO_DATABASE_URL`, `TURSO_AUTH_TOKEN`,
//! `CRAWLCACHE_DB` and `REDIS_URL`.

mod telemetry;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crawlcache::cache::{CacheStore, Database};
use crawlcache::crawler::{
    Backend, CrawlerConfig, FirecrawlClient, RateLimitedScraper, SpiderClient,
    firecrawl::DEFAULT_BASE_URL,
};
use crawlcache::orchestrator::{CrawlRequest, CrawlService};
use crawlcache::ratelimit::{
    CounterBackend, MemoryCounterStore, RateLimitConfig, RateLimiter, RedisCounterStore,
};
use crawlcache::server::{self, AppState};
use serde_json::json;
use telemetry::TelemetryOptions;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Crawl websites into markdown and cache the results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Export traces and metrics over OTLP/HTTP
    #[arg(long, global = true)]
    otlp: bool,

    /// Also write rotated log files into this directory
    #[arg(long, global = true, env = "CRAWLCACHE_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the crawl API over HTTP
    Serve(ServeArgs),

    /// Crawl and scrape a website once
    Crawl(CrawlArgs),

    /// Delete expired cache entries
    Prune(PruneArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendKind {
    /// Hosted Firecrawl API
    Firecrawl,
    /// Local crawler
    Spider,
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    /// Local database path
    #[arg(long, env = "CRAWLCACHE_DB", default_value = "crawlcache.db")]
    database: String,

    /// Remote database URL; takes precedence over the local path
    #[arg(long, env = "TURSO_DATABASE_URL")]
    database_url: Option<String>,

    /// Auth token for the remote database
    #[arg(long, env = "TURSO_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Crawl and scrape implementation
    #[arg(long, value_enum, default_value = "firecrawl")]
    backend: BackendKind,

    /// Firecrawl API key
    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Firecrawl API base URL
    #[arg(long, env = "FIRECRAWL_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Maximum concurrent page scrapes per request (unbounded if unset)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Maximum outbound scrapes per minute (unlimited if unset)
    #[arg(long)]
    scrapes_per_minute: Option<NonZeroU32>,

    /// Scrape each derived URL only once per request
    #[arg(long)]
    dedupe: bool,

    /// Ignore robots.txt when using the spider backend
    #[arg(long)]
    ignore_robots: bool,

    /// Days a result stays cached
    #[arg(long, default_value = "7")]
    ttl_days: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Redis URL for rate limit counters (in-memory if unset)
    #[arg(long, env = "REDIS_URL", hide_env_values = true)]
    redis_url: Option<String>,

    /// Requests allowed per client per window
    #[arg(long, default_value = "5")]
    max_requests: u32,

    /// Rate limit window in seconds
    #[arg(long, default_value = "60")]
    window_secs: u64,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(flatten)]
    database: DatabaseArgs,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to crawl
    #[arg(required = true)]
    url: String,

    /// Maximum number of pages to crawl (1-100)
    #[arg(short, long)]
    limit: Option<i64>,

    /// Save the result to a file instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(flatten)]
    database: DatabaseArgs,
}

#[derive(Args, Debug)]
struct PruneArgs {
    #[command(flatten)]
    database: DatabaseArgs,
}

type Service = CrawlService<Backend, RateLimitedScraper<Backend>, Database>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber(&TelemetryOptions {
        otlp: cli.otlp,
        log_dir: cli.log_dir.clone(),
    })?;

    match cli.command {
        Some(Commands::Serve(args)) => serve_command(args).await?,
        Some(Commands::Crawl(args)) => crawl_command(args).await?,
        Some(Commands::Prune(args)) => prune_command(args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["crawlcache", "--help"]);
        }
    }

    Ok(())
}

#[instrument(skip_all, fields(bind = %args.bind))]
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let service = build_service(&args.backend, &args.database).await?;

    let store = match &args.redis_url {
        Some(url) => CounterBackend::Redis(
            RedisCounterStore::connect(url)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            warn!("REDIS_URL not set, rate limits are kept in memory");
            CounterBackend::Memory(MemoryCounterStore::new())
        }
    };
    let limiter = RateLimiter::with_config(
        store,
        RateLimitConfig {
            max_requests: args.max_requests,
            window: Duration::from_secs(args.window_secs),
            ..Default::default()
        },
    );

    server::serve(args.bind, AppState::new(service, limiter)).await?;
    Ok(())
}

#[instrument(skip_all, fields(url = %args.url))]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let request = CrawlRequest::new(&args.url, args.limit)?;
    let service = build_service(&args.backend, &args.database).await?;

    let outcome = service.crawl(&request).await?;
    info!(
        pages = outcome.pages.len(),
        cache_hit = outcome.cache_hit,
        "Crawl finished"
    );

    let json = serde_json::to_string_pretty(&json!({ "scrapedContent": outcome.pages }))?;
    match args.output {
        Some(output_file) => {
            tokio::fs::write(&output_file, json).await?;
            println!("Saved crawled content to {}", output_file.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

#[instrument(skip_all)]
async fn prune_command(args: PruneArgs) -> anyhow::Result<()> {
    let db = open_database(&args.database).await?;

    let removed = db.purge_expired().await?;
    println!("Removed {} expired cache entries", removed);

    Ok(())
}

async fn build_service(backend: &BackendArgs, database: &DatabaseArgs) -> anyhow::Result<Service> {
    let config = CrawlerConfig::builder()
        .scrape_concurrency(backend.concurrency)
        .scrapes_per_minute(backend.scrapes_per_minute)
        .dedupe_urls(backend.dedupe)
        .build();

    let client = match backend.backend {
        BackendKind::Firecrawl => {
            let api_key = backend
                .api_key
                .as_deref()
                .ok_or_else(|| anyhow!("FIRECRAWL_API_KEY must be set for the firecrawl backend"))?;
            Backend::Firecrawl(FirecrawlClient::from_config(
                api_key,
                &backend.api_url,
                &config,
            )?)
        }
        BackendKind::Spider => Backend::Spider(
            SpiderClient::new(&config).with_respect_robots_txt(!backend.ignore_robots),
        ),
    };
    let scraper = RateLimitedScraper::per_minute(client.clone(), config.scrapes_per_minute);
    let cache = open_database(database).await?;

    Ok(CrawlService::new(client, scraper, cache, config)
        .with_cache_ttl(cache_ttl(backend.ttl_days)?))
}

fn cache_ttl(days: u64) -> anyhow::Result<Duration> {
    if days == 0 {
        return Err(anyhow!("--ttl-days must be at least 1"));
    }
    days.checked_mul(24 * 60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("--ttl-days {} is too large", days))
}

async fn open_database(args: &DatabaseArgs) -> anyhow::Result<Database> {
    let db = match &args.database_url {
        Some(url) => {
            let token = args.auth_token.as_deref().unwrap_or_default();
            Database::new_remote(url, token).await?
        }
        None => Database::new_from_path(&args.database).await?,
    };
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttl_in_days() {
        assert_eq!(cache_ttl(7).unwrap(), Duration::from_secs(7 * 86_400));
        assert_eq!(cache_ttl(1).unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_cache_ttl_rejects_zero_and_overflow() {
        assert!(cache_ttl(0).is_err());
        assert!(cache_ttl(u64::MAX).is_err());
        assert!(cache_ttl(u64::MAX / 86_400 + 1).is_err());
    }
}
