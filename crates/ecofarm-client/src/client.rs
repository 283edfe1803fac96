//! HTTP client for the EcoFarmacias price service.
//!
//! Wraps `reqwest` with the service's endpoint layout, `X-API-Key` handling
//! and typed response decoding. A 403 on any call surfaces as
//! [`ClientError::InvalidApiKey`] so callers can tell a rejected key apart
//! from every other failure. Nothing is retried.

use std::time::Duration;

use ecofarm_core::{PricePage, QueryParameters, ScrapeOutcome, ScrapeTarget};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::types::{HealthStatus, PricesPayload, ScrapeGeoBody, ScrapeUrlBody};

/// Header carrying the shared secret on privileged calls.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Client for the price service REST API.
///
/// `base_url` includes the `/api` prefix, e.g. `https://monitor.example.cl/api`.
pub struct PriceClient {
    client: Client,
    base_url: Url,
}

impl PriceClient {
    /// Creates a client with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so `join` appends to the `/api` path
        // instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// The normalised base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Calls `GET /health`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on any non-2xx status.
    /// - [`ClientError::Deserialize`] if the body is not `{status}`.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.endpoint("health")?;
        let request = self.client.get(url.clone());
        send_json(request, &url, "health").await
    }

    /// Fetches one page of prices, forwarding `params` as the query string.
    ///
    /// Accepts both the bare-array and the `{results, total}` response shapes.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on any non-2xx status.
    /// - [`ClientError::Deserialize`] if the body matches neither shape.
    pub async fn fetch_prices(&self, params: &QueryParameters) -> Result<PricePage, ClientError> {
        let mut url = self.endpoint("prices")?;
        let pairs = params.to_query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        tracing::debug!(url = %url, "fetching prices");
        let request = self.client.get(url.clone());
        let payload: PricesPayload = send_json(request, &url, "prices").await?;
        Ok(payload.into())
    }

    /// Triggers a full scrape of the predefined sources via `POST /scrape`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidApiKey`] if the server answers 403.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ClientError::Deserialize`] if the body is not a scrape payload.
    pub async fn trigger_scrape(&self, api_key: &str) -> Result<ScrapeOutcome, ClientError> {
        let url = self.endpoint("scrape")?;
        let request = with_api_key(
            self.client.post(url.clone()).json(&serde_json::json!({})),
            Some(api_key),
        );
        send_json(request, &url, "scrape").await
    }

    /// Extracts prices from a single page via `POST /scrape-url`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidTarget`] if `target_url` is not an absolute
    ///   `http`/`https` URL. No request is sent.
    /// - Otherwise as [`PriceClient::trigger_scrape`].
    pub async fn trigger_scrape_url(
        &self,
        api_key: Option<&str>,
        target_url: &str,
    ) -> Result<ScrapeOutcome, ClientError> {
        let target_url = target_url.trim();
        validate_target_url(target_url)?;
        let url = self.endpoint("scrape-url")?;
        let request = with_api_key(
            self.client
                .post(url.clone())
                .json(&ScrapeUrlBody { url: target_url }),
            api_key,
        );
        send_json(request, &url, "scrape-url").await
    }

    /// Triggers location-based scraping via `POST /scrape-geo`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidTarget`] if the coordinates are not finite or
    ///   out of range. No request is sent.
    /// - Otherwise as [`PriceClient::trigger_scrape`].
    pub async fn trigger_scrape_geo(
        &self,
        api_key: Option<&str>,
        lat: f64,
        lng: f64,
    ) -> Result<ScrapeOutcome, ClientError> {
        validate_coordinates(lat, lng)?;
        let url = self.endpoint("scrape-geo")?;
        let request = with_api_key(
            self.client
                .post(url.clone())
                .json(&ScrapeGeoBody { lat, lng }),
            api_key,
        );
        send_json(request, &url, "scrape-geo").await
    }

    /// Dispatches `target` to the matching scrape endpoint.
    ///
    /// # Errors
    ///
    /// As the endpoint-specific methods. A full scrape without a key is sent
    /// without the header and will normally come back as
    /// [`ClientError::InvalidApiKey`].
    pub async fn trigger(
        &self,
        api_key: Option<&str>,
        target: &ScrapeTarget,
    ) -> Result<ScrapeOutcome, ClientError> {
        tracing::info!(scrape_target = %target.label(), "triggering scrape");
        let outcome = match target {
            ScrapeTarget::All => self.trigger_scrape(api_key.unwrap_or_default()).await,
            ScrapeTarget::Url(url) => self.trigger_scrape_url(api_key, url).await,
            ScrapeTarget::Geo { lat, lng } => self.trigger_scrape_geo(api_key, *lat, *lng).await,
        }?;
        tracing::info!(
            scrape_target = %target.label(),
            records = outcome.record_count(),
            "scrape finished"
        );
        Ok(outcome)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: format!("cannot join '{path}': {e}"),
            })
    }
}

/// Sends `request`, maps the status to a typed error, and decodes the body.
async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &Url,
    context: &str,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::FORBIDDEN {
        tracing::warn!(url = %url, "API key rejected");
        return Err(ClientError::InvalidApiKey {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Attaches the API key header when a non-blank key is available.
fn with_api_key(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => request.header(API_KEY_HEADER, key),
        None => request,
    }
}

fn validate_target_url(raw: &str) -> Result<(), ClientError> {
    let parsed = Url::parse(raw)
        .map_err(|e| ClientError::InvalidTarget(format!("'{raw}' is not a URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidTarget(format!(
            "'{raw}' must use http or https"
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::InvalidTarget(format!("'{raw}' has no host")));
    }
    Ok(())
}

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ClientError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ClientError::InvalidTarget(format!(
            "latitude {lat} is outside [-90, 90]"
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ClientError::InvalidTarget(format!(
            "longitude {lng} is outside [-180, 180]"
        )));
    }
    Ok(())
}
