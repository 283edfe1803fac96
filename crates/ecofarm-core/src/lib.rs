pub mod app_config;
pub mod config;
pub mod format;
pub mod prices;
pub mod view;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use format::{format_clp, format_timestamp};
pub use prices::{
    PricePage, PriceRecord, QueryParameters, ScrapeOutcome, ScrapeTarget, ALL_PHARMACIES,
    KNOWN_PHARMACIES, MANUAL_SOURCE,
};
pub use view::{derive_view, OfferFilter, SortOrder, ViewOptions};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid offer filter: {0}")]
    InvalidOfferFilter(String),

    #[error("invalid sort order: {0}")]
    InvalidSortOrder(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
