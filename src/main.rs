mod config;
mod models;
mod scraper;
mod server;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::models::ScrapeOptions;
use crate::scraper::{ProductSource, ShoppingScraper};

#[derive(Parser)]
#[command(name = "shopping-scraper", about = "Resilient shopping search scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Scrape one search URL and print the normalized result as JSON
    Scrape {
        url: String,

        /// Skip the configured proxies
        #[arg(long)]
        direct: bool,

        /// Attempt budget for this request
        #[arg(long)]
        attempts: Option<u32>,

        /// Per-attempt timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Pin the User-Agent instead of rotating it
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Probe the upstream once, directly
    Health,

    /// Show configured capacity and proxy count
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "shopping_scraper=info,warn",
        1 => "shopping_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let scraper = Arc::new(ShoppingScraper::new(
        &config.scraping,
        config.egress.endpoints(),
    ));

    match cli.command {
        Command::Serve => {
            let stats = scraper.stats();
            info!(
                "Max concurrent: {} | proxies: {}",
                stats.max_concurrent, stats.proxy_count
            );
            server::serve(&config.server, scraper).await?;
        }

        Command::Scrape {
            url,
            direct,
            attempts,
            timeout_ms,
            user_agent,
        } => {
            let timer = utils::Timer::start("Scrape");
            let options = ScrapeOptions {
                use_egress: Some(!direct),
                max_attempts: attempts,
                timeout: timeout_ms.map(Duration::from_millis),
                user_agent,
            };
            let result = scraper
                .scrape(&url, options)
                .await
                .context("Failed to scrape")?;
            info!(
                "{} products ({} total) in {:.2?}",
                result.products.len(),
                result.total_count,
                timer.elapsed()
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Health => {
            if scraper.health_check().await {
                println!("healthy");
            } else {
                println!("unhealthy");
                std::process::exit(1);
            }
        }

        Command::Stats => {
            let stats = scraper.stats();
            println!("─────────────────────────────────");
            println!("  Shopping Scraper — Stats");
            println!("─────────────────────────────────");
            println!("  Max concurrent : {}", stats.max_concurrent);
            println!("  Proxies        : {}", stats.proxy_count);
            println!(
                "  Delay window   : {}–{} ms",
                config.scraping.delay_min_ms, config.scraping.delay_max_ms
            );
            println!("  Max attempts   : {}", config.scraping.max_attempts);
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}
