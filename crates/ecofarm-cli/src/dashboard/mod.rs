//! View model behind both the interactive session and the one-shot commands.
//!
//! [`Dashboard`] owns the fetched records, the request lifecycle flags, the
//! query and display parameters, and the API key. Scrape triggers are gated
//! on a key: without one the action is parked and [`ScrapeStatus::AwaitingKey`]
//! is returned, and [`Dashboard::confirm_key`] resumes it.
//!
//! Loads are ticketed. Only the response for the most recently issued ticket
//! is applied, so a slow superseded fetch cannot overwrite newer results.

mod auth;

use ecofarm_client::{ClientError, CredentialStore, PriceClient};
use ecofarm_core::{
    derive_view, OfferFilter, PricePage, PriceRecord, QueryParameters, ScrapeOutcome,
    ScrapeTarget, SortOrder, ViewOptions,
};

use auth::AuthState;

pub(crate) const LOAD_ERROR_MESSAGE: &str =
    "Error al cargar precios. Verifique la conexión con el servidor.";
pub(crate) const INVALID_KEY_MESSAGE: &str = "API Key inválida.";
pub(crate) const SCRAPE_ERROR_MESSAGE: &str = "Error al iniciar scraping.";

/// Lifecycle of the most recent price load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadState {
    Idle,
    Loading,
    Success,
    Error,
}

/// Result of asking the dashboard to run a scrape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScrapeStatus {
    Completed(ScrapeOutcome),
    /// No key is held; the action is parked until [`Dashboard::confirm_key`].
    AwaitingKey,
    /// Another scrape is still running on this dashboard.
    Busy,
    Failed { message: &'static str },
    /// A key was confirmed but no action was waiting for it.
    NothingPending,
}

/// Sequence number identifying one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct LoadTicket(u64);

pub(crate) struct Dashboard {
    client: PriceClient,
    records: Vec<PriceRecord>,
    total: u64,
    load_state: LoadState,
    error: Option<&'static str>,
    notice: Option<String>,
    query: QueryParameters,
    view: ViewOptions,
    auth: AuthState,
    /// Set while a scrape request is in flight.
    scraping: bool,
    latest_ticket: u64,
}

impl Dashboard {
    pub(crate) fn new(client: PriceClient, page_size: u32) -> Self {
        Self {
            client,
            records: Vec::new(),
            total: 0,
            load_state: LoadState::Idle,
            error: None,
            notice: None,
            query: QueryParameters {
                page: Some(1),
                limit: Some(page_size),
                search: None,
                pharmacy: None,
            },
            view: ViewOptions::default(),
            auth: AuthState::default(),
            scraping: false,
            latest_ticket: 0,
        }
    }

    /// Uses `store` to persist confirmed keys, and adopts the key already in
    /// it when none was supplied explicitly.
    pub(crate) fn with_credentials(mut self, store: CredentialStore) -> Self {
        self.auth = self.auth.with_store(store);
        self
    }

    /// Holds `api_key` in memory without persisting it.
    pub(crate) fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.auth.set_session_key(api_key);
        self
    }

    /// Presets the search term, source and page used by the first load.
    pub(crate) fn with_query(
        mut self,
        search: Option<&str>,
        pharmacy: Option<&str>,
        page: u32,
    ) -> Self {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let pharmacy = pharmacy.map(str::trim).filter(|p| !p.is_empty());
        self.query.search = search.map(str::to_string);
        self.view.search = search.unwrap_or_default().to_string();
        self.query.pharmacy = pharmacy.map(str::to_string);
        self.view.pharmacy = pharmacy.map(str::to_string);
        self.query.page = Some(page.max(1));
        self
    }

    pub(crate) fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// Filtered and sorted projection of the current records.
    pub(crate) fn visible(&self) -> Vec<&PriceRecord> {
        derive_view(&self.records, &self.view)
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub(crate) fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub(crate) fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub(crate) fn query(&self) -> &QueryParameters {
        &self.query
    }

    pub(crate) fn view(&self) -> &ViewOptions {
        &self.view
    }

    pub(crate) fn has_api_key(&self) -> bool {
        self.auth.key().is_some()
    }

    pub(crate) fn auth_prompt_open(&self) -> bool {
        self.auth.prompt_open()
    }

    /// Number of pages implied by `total` and the page size; at least one.
    pub(crate) fn page_count(&self) -> u32 {
        let limit = u64::from(self.query.limit.unwrap_or(1).max(1));
        let pages = self.total.div_ceil(limit).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Fetches the current page with the current query and applies it.
    pub(crate) async fn load(&mut self) {
        let ticket = self.begin_load();
        let result = self.client.fetch_prices(&self.query).await;
        self.apply_load(ticket, result);
    }

    /// Marks a load as in flight and returns its ticket. Issuing a ticket
    /// supersedes every earlier one.
    pub(crate) fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        self.load_state = LoadState::Loading;
        LoadTicket(self.latest_ticket)
    }

    /// Applies a load response. Returns `false` and leaves state untouched if
    /// `ticket` has been superseded.
    pub(crate) fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<PricePage, ClientError>,
    ) -> bool {
        if ticket.0 != self.latest_ticket {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.latest_ticket,
                "discarding stale price response"
            );
            return false;
        }

        match result {
            Ok(page) => {
                tracing::debug!(records = page.results.len(), total = page.total, "prices loaded");
                self.records = page.results;
                self.total = page.total;
                self.load_state = LoadState::Success;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load prices");
                self.load_state = LoadState::Error;
                self.error = Some(LOAD_ERROR_MESSAGE);
            }
        }
        true
    }

    /// Sets the search term for both the server query and the local view,
    /// returns to the first page, and reloads.
    pub(crate) async fn search(&mut self, term: &str) {
        let term = term.trim();
        self.query.search = (!term.is_empty()).then(|| term.to_string());
        self.view.search = term.to_string();
        self.query.page = Some(1);
        self.load().await;
    }

    /// Restricts results to one source (`None` or `"Todas"` for all),
    /// returns to the first page, and reloads.
    pub(crate) async fn set_pharmacy(&mut self, pharmacy: Option<&str>) {
        let pharmacy = pharmacy.map(str::trim).filter(|p| !p.is_empty());
        self.query.pharmacy = pharmacy.map(str::to_string);
        self.view.pharmacy = pharmacy.map(str::to_string);
        self.query.page = Some(1);
        self.load().await;
    }

    pub(crate) fn set_offer_filter(&mut self, filter: OfferFilter) {
        self.view.offer_filter = filter;
    }

    pub(crate) fn set_sort(&mut self, sort: Option<SortOrder>) {
        self.view.sort = sort;
    }

    /// Jumps to `page`, clamped to `1..=page_count`, and reloads.
    pub(crate) async fn go_to_page(&mut self, page: u32) {
        self.query.page = Some(page.clamp(1, self.page_count()));
        self.load().await;
    }

    pub(crate) async fn next_page(&mut self) {
        let next = self.query.current_page().saturating_add(1);
        self.go_to_page(next).await;
    }

    pub(crate) async fn prev_page(&mut self) {
        let prev = self.query.current_page().saturating_sub(1);
        self.go_to_page(prev).await;
    }

    /// Runs `target` if a key is held; otherwise parks it and asks for a key.
    pub(crate) async fn request_scrape(&mut self, target: ScrapeTarget) -> ScrapeStatus {
        if self.scraping {
            return ScrapeStatus::Busy;
        }
        match self.auth.key().map(str::to_string) {
            Some(key) => self.run_scrape(&key, target).await,
            None => {
                tracing::debug!(scrape_target = %target.label(), "deferring scrape until a key is provided");
                self.auth.defer(target);
                ScrapeStatus::AwaitingKey
            }
        }
    }

    /// Accepts a key from the prompt and resumes the parked action, if any.
    /// A blank key keeps the prompt open.
    pub(crate) async fn confirm_key(&mut self, api_key: &str) -> ScrapeStatus {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return if self.auth.prompt_open() {
                ScrapeStatus::AwaitingKey
            } else {
                ScrapeStatus::NothingPending
            };
        }

        self.auth.accept(api_key);
        match self.auth.take_pending() {
            Some(target) => self.run_scrape(api_key, target).await,
            None => ScrapeStatus::NothingPending,
        }
    }

    /// Closes the key prompt and drops the parked action.
    pub(crate) fn cancel_auth(&mut self) {
        if self.auth.take_pending().is_some() {
            tracing::debug!("scrape cancelled at key prompt");
        }
    }

    /// Forgets the held key, including the persisted copy.
    pub(crate) fn forget_key(&mut self) {
        self.auth.forget();
    }

    async fn run_scrape(&mut self, api_key: &str, target: ScrapeTarget) -> ScrapeStatus {
        self.scraping = true;
        self.notice = None;
        let result = self.client.trigger(Some(api_key), &target).await;
        self.scraping = false;

        match result {
            Ok(outcome) => {
                self.error = None;
                self.notice = Some(format!(
                    "Scraping completado: {} registros.",
                    outcome.record_count()
                ));
                if target.refreshes_listing() {
                    self.load().await;
                } else {
                    // Inline results replace the listing; invalidate any load
                    // still in flight so it cannot overwrite them.
                    self.latest_ticket += 1;
                    self.records.clone_from(&outcome.results);
                    self.total = outcome.record_count();
                    self.load_state = LoadState::Success;
                }
                ScrapeStatus::Completed(outcome)
            }
            Err(e) if e.is_invalid_api_key() => {
                tracing::warn!("scrape rejected: invalid API key");
                self.auth.reject();
                self.error = Some(INVALID_KEY_MESSAGE);
                ScrapeStatus::Failed {
                    message: INVALID_KEY_MESSAGE,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, scrape_target = %target.label(), "scrape failed");
                self.error = Some(SCRAPE_ERROR_MESSAGE);
                ScrapeStatus::Failed {
                    message: SCRAPE_ERROR_MESSAGE,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
