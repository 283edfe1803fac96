use ecofarm_core::{PricePage, PriceRecord};
use serde::{Deserialize, Serialize};

/// `GET /prices` answers either with a bare array or with a `{results, total}`
/// envelope depending on the backend version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PricesPayload {
    Page {
        results: Vec<PriceRecord>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<PriceRecord>),
}

impl From<PricesPayload> for PricePage {
    fn from(payload: PricesPayload) -> Self {
        match payload {
            PricesPayload::Page {
                results,
                total: Some(total),
            } => PricePage { results, total },
            PricesPayload::Page {
                results,
                total: None,
            }
            | PricesPayload::Bare(results) => PricePage::from_results(results),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeUrlBody<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeGeoBody {
    pub lat: f64,
    pub lng: f64,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
