mod commands;
mod dashboard;
mod render;
mod session;

use clap::{Parser, Subcommand};
use ecofarm_core::{OfferFilter, ScrapeTarget, SortOrder};
use tracing_subscriber::EnvFilter;

use crate::commands::{Overrides, PricesArgs};

#[derive(Debug, Parser)]
#[command(name = "ecofarm")]
#[command(about = "EcoFarmacias price monitor")]
struct Cli {
    /// Base URL of the price service (overrides `ECOFARM_API_BASE_URL`)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// API key for scrape triggers (overrides `ECOFARM_API_KEY` and the stored key)
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List current prices
    Prices {
        /// Product name search term
        #[arg(long)]
        search: Option<String>,
        /// Restrict to one source (e.g. Farmex, or Todas)
        #[arg(long)]
        pharmacy: Option<String>,
        /// Offer filter: todos, ofertas or sin-oferta
        #[arg(long, default_value = "todos")]
        filter: OfferFilter,
        /// Order by price: asc or desc
        #[arg(long)]
        sort: Option<SortOrder>,
        /// Page to fetch
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size (defaults to `ECOFARM_PAGE_SIZE`)
        #[arg(long)]
        limit: Option<u32>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Re-scrape every configured source
    Scrape,
    /// Extract prices from a single product page
    ScrapeUrl {
        /// Absolute http(s) URL of the page
        url: String,
    },
    /// Re-scrape sources near a location
    #[command(allow_negative_numbers = true)]
    ScrapeGeo {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
    },
    /// Check that the price service is up
    Health,
    /// Interactive dashboard session (default)
    Dashboard,
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
}

#[derive(Debug, Subcommand)]
enum KeyCommands {
    /// Store an API key (prompts when omitted)
    Set { key: Option<String> },
    /// Delete the stored API key
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = ecofarm_core::load_app_config_from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, base_url = %config.api_base_url, "config loaded");

    let overrides = Overrides {
        base_url: cli.base_url,
        api_key: cli.api_key,
    };

    match cli.command {
        Some(Commands::Prices {
            search,
            pharmacy,
            filter,
            sort,
            page,
            limit,
            json,
        }) => {
            let args = PricesArgs {
                search,
                pharmacy,
                filter,
                sort,
                page,
                limit,
                json,
            };
            commands::run_prices(&config, &overrides, &args).await?;
        }
        Some(Commands::Scrape) => {
            commands::run_scrape(&config, &overrides, ScrapeTarget::All).await?;
        }
        Some(Commands::ScrapeUrl { url }) => {
            commands::run_scrape(&config, &overrides, ScrapeTarget::Url(url)).await?;
        }
        Some(Commands::ScrapeGeo { lat, lng }) => {
            commands::run_scrape(&config, &overrides, ScrapeTarget::Geo { lat, lng }).await?;
        }
        Some(Commands::Health) => commands::run_health(&config, &overrides).await?,
        Some(Commands::Dashboard) | None => commands::run_dashboard(&config, &overrides).await?,
        Some(Commands::Key { command }) => match command {
            KeyCommands::Set { key } => commands::run_key_set(&config, key).await?,
            KeyCommands::Clear => commands::run_key_clear(&config)?,
        },
    }

    Ok(())
}
