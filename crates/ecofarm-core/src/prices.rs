use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Pharmacy filter value meaning "every source".
pub const ALL_PHARMACIES: &str = "Todas";

/// Source name the backend assigns to records extracted from a user-supplied URL.
pub const MANUAL_SOURCE: &str = "Manual Scraped";

/// Sources the backend scrapes on a full run.
pub const KNOWN_PHARMACIES: [&str; 3] = ["EcoFarmacias", "Farmex", "Meki"];

/// A single price observation as served by `/api/prices` or returned inline
/// by a scrape trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Database id. Absent on records returned directly by a scrape trigger.
    #[serde(default)]
    pub id: Option<i64>,
    pub pharmacy: String,
    pub product: String,
    /// Price in Chilean pesos.
    pub price: Decimal,
    /// Free-text availability label, e.g. `"Disponible"` or `"N/A"`.
    #[serde(default)]
    pub stock: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub es_oferta: Option<bool>,
}

impl PriceRecord {
    /// Returns `true` when the record is flagged as a discount. A missing flag
    /// counts as not on offer.
    #[must_use]
    pub fn is_offer(&self) -> bool {
        self.es_oferta.unwrap_or(false)
    }
}

/// One page of prices plus the server-side total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricePage {
    pub results: Vec<PriceRecord>,
    pub total: u64,
}

impl PricePage {
    /// Builds a page from a bare result list, using its length as the total.
    #[must_use]
    pub fn from_results(results: Vec<PriceRecord>) -> Self {
        let total = u64::try_from(results.len()).unwrap_or(u64::MAX);
        Self { results, total }
    }
}

/// Filter and paging parameters for `GET /api/prices`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub pharmacy: Option<String>,
}

impl QueryParameters {
    /// Query-string pairs for the request. Unset or blank values are omitted,
    /// as is the [`ALL_PHARMACIES`] sentinel.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        if let Some(pharmacy) = self.pharmacy.as_deref().map(str::trim) {
            if !pharmacy.is_empty() && pharmacy != ALL_PHARMACIES {
                pairs.push(("pharmacy", pharmacy.to_string()));
            }
        }
        pairs
    }

    /// Current page, treating an unset page as the first.
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// What a scrape trigger asks the backend to collect.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeTarget {
    /// Every predefined source.
    All,
    /// A single product or listing page.
    Url(String),
    /// Sources near a location.
    Geo { lat: f64, lng: f64 },
}

impl ScrapeTarget {
    /// Short label used in logs and prompts.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            ScrapeTarget::All => "all sources".to_string(),
            ScrapeTarget::Url(url) => format!("url {url}"),
            ScrapeTarget::Geo { lat, lng } => format!("geo ({lat}, {lng})"),
        }
    }

    /// Whether a successful trigger leaves new data in `/api/prices` that the
    /// caller should reload. Single-URL scrapes return their records inline.
    #[must_use]
    pub fn refreshes_listing(&self) -> bool {
        !matches!(self, ScrapeTarget::Url(_))
    }
}

/// Decoded body of any scrape trigger. The backend answers with `{count}`,
/// `{results}` or a plain status object depending on the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<PriceRecord>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScrapeOutcome {
    /// Number of records the scrape produced: the reported `count` when
    /// present, otherwise the length of `results`.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.count
            .unwrap_or_else(|| u64::try_from(self.results.len()).unwrap_or(u64::MAX))
    }
}

/// Parses a capture timestamp. Accepts RFC 3339, or a naive ISO-8601
/// datetime which is taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
    }
}
