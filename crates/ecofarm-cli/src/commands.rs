//! One-shot command handlers for the CLI.
//!
//! Each handler builds a [`Dashboard`] from the loaded config so the
//! one-shot commands and the interactive session share the same key
//! handling and error messages.

use std::io::Write;

use anyhow::Context;
use ecofarm_client::{CredentialStore, PriceClient};
use ecofarm_core::{AppConfig, OfferFilter, PricePage, ScrapeTarget, SortOrder};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::dashboard::{Dashboard, LoadState, ScrapeStatus};
use crate::render::render_table;
use crate::session::{drive_scrape, run_session};

/// Connection overrides taken from global CLI flags.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) base_url: Option<String>,
    pub(crate) api_key: Option<String>,
}

/// Query and display options for `prices`.
#[derive(Debug)]
pub(crate) struct PricesArgs {
    pub(crate) search: Option<String>,
    pub(crate) pharmacy: Option<String>,
    pub(crate) filter: OfferFilter,
    pub(crate) sort: Option<SortOrder>,
    pub(crate) page: u32,
    pub(crate) limit: Option<u32>,
    pub(crate) json: bool,
}

fn build_client(config: &AppConfig, overrides: &Overrides) -> anyhow::Result<PriceClient> {
    let base_url = overrides
        .base_url
        .as_deref()
        .unwrap_or(&config.api_base_url);
    PriceClient::new(base_url, config.request_timeout_secs, &config.user_agent)
        .with_context(|| format!("failed to build client for {base_url}"))
}

/// Builds a dashboard with the key resolved in precedence order: flag, env,
/// then the credentials file.
pub(crate) fn build_dashboard(
    config: &AppConfig,
    overrides: &Overrides,
    page_size: Option<u32>,
) -> anyhow::Result<Dashboard> {
    let client = build_client(config, overrides)?;
    let api_key = overrides.api_key.clone().or_else(|| config.api_key.clone());
    Ok(
        Dashboard::new(client, page_size.unwrap_or(config.page_size).max(1))
            .with_api_key(api_key)
            .with_credentials(CredentialStore::new(&config.credentials_path)),
    )
}

/// Fetches one page of prices and prints the derived view.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the fetch fails.
pub(crate) async fn run_prices(
    config: &AppConfig,
    overrides: &Overrides,
    args: &PricesArgs,
) -> anyhow::Result<()> {
    let mut dashboard = build_dashboard(config, overrides, args.limit)?.with_query(
        args.search.as_deref(),
        args.pharmacy.as_deref(),
        args.page,
    );
    dashboard.set_offer_filter(args.filter);
    dashboard.set_sort(args.sort);
    dashboard.load().await;

    if dashboard.load_state() == LoadState::Error {
        anyhow::bail!(dashboard.error().unwrap_or("failed to load prices"));
    }

    let visible = dashboard.visible();
    tracing::debug!(
        fetched = dashboard.records().len(),
        visible = visible.len(),
        "prices view derived"
    );

    if args.json {
        let page = PricePage {
            results: visible.into_iter().cloned().collect(),
            total: dashboard.total(),
        };
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    print!("{}", render_table(&visible));
    println!(
        "\nP\u{e1}gina {} de {} \u{b7} {} registros en total",
        dashboard.query().current_page(),
        dashboard.page_count(),
        dashboard.total()
    );
    Ok(())
}

/// Triggers a scrape, prompting on stdin for a key when none is available.
///
/// # Errors
///
/// Returns an error if the scrape fails or is rejected.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    overrides: &Overrides,
    target: ScrapeTarget,
) -> anyhow::Result<()> {
    let mut dashboard = build_dashboard(config, overrides, None)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    let inline = !target.refreshes_listing();
    tracing::info!(scrape_target = %target.label(), "requesting scrape");
    let Some(status) = drive_scrape(&mut dashboard, target, &mut lines, &mut stdout).await? else {
        return Ok(());
    };

    match status {
        ScrapeStatus::Completed(outcome) => {
            if let Some(notice) = dashboard.notice() {
                println!("{notice}");
            }
            if let Some(message) = outcome.message.as_deref() {
                println!("{message}");
            }
            if inline {
                print!("{}", render_table(&dashboard.visible()));
            }
            Ok(())
        }
        ScrapeStatus::Failed { message } => anyhow::bail!(message),
        ScrapeStatus::AwaitingKey | ScrapeStatus::NothingPending => {
            anyhow::bail!("an API key is required to trigger a scrape")
        }
        ScrapeStatus::Busy => anyhow::bail!("a scrape is already running"),
    }
}

/// Prints the service health status.
///
/// # Errors
///
/// Returns an error if the service is unreachable or answers non-2xx.
pub(crate) async fn run_health(config: &AppConfig, overrides: &Overrides) -> anyhow::Result<()> {
    let client = build_client(config, overrides)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("health check against {} failed", client.base_url()))?;
    println!("{}: {}", client.base_url(), health.status);
    Ok(())
}

/// Runs the interactive dashboard on stdin/stdout.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the terminal I/O fails.
pub(crate) async fn run_dashboard(config: &AppConfig, overrides: &Overrides) -> anyhow::Result<()> {
    let mut dashboard = build_dashboard(config, overrides, None)?;
    let input = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(&mut dashboard, input, &mut stdout).await
}

/// Persists `key`, reading it from stdin when not given.
///
/// # Errors
///
/// Returns an error if no key is supplied or the credentials file cannot be
/// written.
pub(crate) async fn run_key_set(config: &AppConfig, key: Option<String>) -> anyhow::Result<()> {
    let key = match key {
        Some(key) => key,
        None => {
            print!("API key: ");
            std::io::stdout().flush()?;
            BufReader::new(tokio::io::stdin())
                .lines()
                .next_line()
                .await
                .context("failed to read API key")?
                .unwrap_or_default()
        }
    };

    let store = CredentialStore::new(&config.credentials_path);
    store.save(key.trim())?;
    println!("API key guardada en {}", store.path().display());
    Ok(())
}

/// Deletes the persisted key.
///
/// # Errors
///
/// Returns an error if the credentials file exists but cannot be removed.
pub(crate) fn run_key_clear(config: &AppConfig) -> anyhow::Result<()> {
    let store = CredentialStore::new(&config.credentials_path);
    if store.clear()? {
        println!("API key eliminada de {}", store.path().display());
    } else {
        println!("no hay API key guardada en {}", store.path().display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ecofarm_core::Environment;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config(credentials_path: PathBuf) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            api_key: None,
            credentials_path,
            request_timeout_secs: 5,
            user_agent: "ecofarm-test/0.1".to_string(),
            page_size: 25,
            log_level: "warn".to_string(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("ecofarm-commands-{}", uuid::Uuid::new_v4()))
            .join("credentials.json")
    }

    /// Runs a full scrape through `build_dashboard` against a mock server
    /// that only accepts `expected_key`.
    async fn assert_scrape_sends_key(
        mut config: AppConfig,
        flag: Option<&str>,
        expected_key: &str,
    ) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/scrape"))
            .and(header("X-API-Key", expected_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
            .expect(1)
            .mount(&server)
            .await;

        config.api_base_url = format!("{}/api", server.uri());
        let overrides = Overrides {
            base_url: None,
            api_key: flag.map(str::to_string),
        };
        let mut dashboard = build_dashboard(&config, &overrides, None).unwrap();
        let status = dashboard.request_scrape(ScrapeTarget::All).await;
        assert!(
            matches!(status, ScrapeStatus::Completed(_)),
            "expected completed scrape, got {status:?}"
        );
    }

    #[tokio::test]
    async fn flag_key_wins_over_env_and_file() {
        let path = temp_path();
        CredentialStore::new(&path).save("from-file").unwrap();
        let mut config = test_config(path);
        config.api_key = Some("from-env".to_string());

        assert_scrape_sends_key(config, Some("from-flag"), "from-flag").await;
    }

    #[tokio::test]
    async fn env_key_wins_over_file() {
        let path = temp_path();
        CredentialStore::new(&path).save("from-file").unwrap();
        let mut config = test_config(path);
        config.api_key = Some("from-env".to_string());

        assert_scrape_sends_key(config, None, "from-env").await;
    }

    #[tokio::test]
    async fn stored_key_is_used_when_no_other_source() {
        let path = temp_path();
        CredentialStore::new(&path).save("from-file").unwrap();
        let config = test_config(path);

        assert_scrape_sends_key(config, None, "from-file").await;
    }

    #[test]
    fn page_size_override_wins_over_config() {
        let config = test_config(temp_path());
        let dashboard = build_dashboard(&config, &Overrides::default(), None).unwrap();
        assert_eq!(dashboard.query().limit, Some(25));
        let dashboard = build_dashboard(&config, &Overrides::default(), Some(10)).unwrap();
        assert_eq!(dashboard.query().limit, Some(10));
    }

    #[test]
    fn no_key_anywhere_leaves_dashboard_unauthenticated() {
        let config = test_config(temp_path());
        let dashboard = build_dashboard(&config, &Overrides::default(), None).unwrap();
        assert!(!dashboard.has_api_key());
    }

    #[test]
    fn base_url_override_is_validated() {
        let config = test_config(temp_path());
        let overrides = Overrides {
            base_url: Some("not a url".to_string()),
            api_key: None,
        };
        assert!(build_dashboard(&config, &overrides, None).is_err());
    }

    #[test]
    fn clearing_missing_key_succeeds() {
        let config = test_config(temp_path());
        run_key_clear(&config).unwrap();
    }
}
