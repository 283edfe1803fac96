use ecofarm_client::PriceClient;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::dashboard::INVALID_KEY_MESSAGE;

fn test_dashboard(server: &MockServer) -> Dashboard {
    let client = PriceClient::new(&format!("{}/api", server.uri()), 5, "ecofarm-test/0.1")
        .expect("client construction should not fail");
    Dashboard::new(client, 50)
}

async fn mount_prices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 1, "pharmacy": "EcoFarmacias", "product": "Paracetamol", "price": 1200, "es_oferta": false},
                {"id": 2, "pharmacy": "Farmex", "product": "Ibuprofeno", "price": 900, "es_oferta": true}
            ],
            "total": 2
        })))
        .mount(server)
        .await;
}

async fn run(dashboard: &mut Dashboard, input: &str) -> String {
    let mut out = Vec::new();
    run_session(dashboard, input.as_bytes(), &mut out)
        .await
        .expect("session should not fail");
    String::from_utf8(out).expect("output is UTF-8")
}

#[test]
fn parses_basic_commands() {
    assert_eq!(SessionCommand::parse("").unwrap(), None);
    assert_eq!(
        SessionCommand::parse("refresh").unwrap(),
        Some(SessionCommand::Refresh)
    );
    assert_eq!(
        SessionCommand::parse("search  Paracetamol 500 ").unwrap(),
        Some(SessionCommand::Search("Paracetamol 500".to_string()))
    );
    assert_eq!(
        SessionCommand::parse("pharmacy").unwrap(),
        Some(SessionCommand::Pharmacy(None))
    );
    assert_eq!(
        SessionCommand::parse("filter sin oferta").unwrap(),
        Some(SessionCommand::Filter(OfferFilter::RegularOnly))
    );
    assert_eq!(
        SessionCommand::parse("sort none").unwrap(),
        Some(SessionCommand::Sort(None))
    );
    assert_eq!(
        SessionCommand::parse("SORT desc").unwrap(),
        Some(SessionCommand::Sort(Some(SortOrder::Desc)))
    );
    assert_eq!(
        SessionCommand::parse("page 3").unwrap(),
        Some(SessionCommand::Page(3))
    );
}

#[test]
fn parses_scrape_commands() {
    assert_eq!(
        SessionCommand::parse("scrape").unwrap(),
        Some(SessionCommand::Scrape(ScrapeTarget::All))
    );
    assert_eq!(
        SessionCommand::parse("scrape-url https://www.cruzverde.cl/").unwrap(),
        Some(SessionCommand::Scrape(ScrapeTarget::Url(
            "https://www.cruzverde.cl/".to_string()
        )))
    );
    assert_eq!(
        SessionCommand::parse("scrape-geo -33.45 -70.66").unwrap(),
        Some(SessionCommand::Scrape(ScrapeTarget::Geo {
            lat: -33.45,
            lng: -70.66
        }))
    );
}

#[test]
fn rejects_malformed_commands() {
    assert!(SessionCommand::parse("scrape-url").is_err());
    assert!(SessionCommand::parse("scrape-geo 1").is_err());
    assert!(SessionCommand::parse("scrape-geo north west").is_err());
    assert!(SessionCommand::parse("page two").is_err());
    assert!(SessionCommand::parse("filter rebajas").is_err());
    assert!(SessionCommand::parse("fly").is_err());
}

#[tokio::test]
async fn session_renders_filtered_view() {
    let server = MockServer::start().await;
    mount_prices(&server).await;

    let mut dashboard = test_dashboard(&server);
    let output = run(&mut dashboard, "filter ofertas\nsort asc\nquit\n").await;

    let last = output
        .rsplit("EcoFarmacias Monitor")
        .next()
        .expect("dashboard rendered at least once");
    assert!(last.contains("Ibuprofeno"));
    assert!(!last.contains("Paracetamol"));
    assert!(last.contains("filtro: Ofertas"));
    assert!(last.contains("orden: asc"));
}

#[tokio::test]
async fn session_prompts_for_key_then_scrapes_once() {
    let server = MockServer::start().await;
    mount_prices(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .and(header("X-API-Key", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let mut dashboard = test_dashboard(&server);
    let output = run(&mut dashboard, "scrape\ns3cret\nquit\n").await;

    assert!(output.contains(KEY_PROMPT));
    assert!(output.contains("Scraping completado: 2 registros."));
    assert!(dashboard.has_api_key());
}

#[tokio::test]
async fn empty_answer_at_prompt_cancels_scrape() {
    let server = MockServer::start().await;
    mount_prices(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let mut dashboard = test_dashboard(&server);
    let output = run(&mut dashboard, "scrape\n\nquit\n").await;

    assert!(output.contains("scraping cancelado"));
    assert!(!dashboard.auth_prompt_open());
}

#[tokio::test]
async fn rejected_key_shows_invalid_key_message() {
    let server = MockServer::start().await;
    mount_prices(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/scrape"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let mut dashboard = test_dashboard(&server);
    let output = run(&mut dashboard, "key wrong\nscrape\nquit\n").await;

    assert!(output.contains(&format!("error: {INVALID_KEY_MESSAGE}")));
    assert!(!output.contains(crate::dashboard::SCRAPE_ERROR_MESSAGE));
    assert!(!dashboard.has_api_key());
}
