//! Interactive, line-oriented dashboard session.
//!
//! Each input line is one command. After every command the dashboard is
//! re-rendered. A scrape without a key switches the next input line to the
//! key prompt; an empty line there cancels the scrape.

use std::io::Write;

use anyhow::Context;
use ecofarm_core::{OfferFilter, ScrapeTarget, SortOrder};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::dashboard::{Dashboard, ScrapeStatus};
use crate::render::render_dashboard;

pub(crate) const KEY_PROMPT: &str =
    "Autenticaci\u{f3}n requerida. Ingrese la APP_API_KEY para autorizar el escaneo de precios (vac\u{ed}o para cancelar):";

const HELP: &str = "\
comandos:
  refresh                    recargar precios
  search <texto>             buscar por nombre de producto (vac\u{ed}o para limpiar)
  pharmacy <nombre|Todas>    filtrar por farmacia
  filter <todos|ofertas|sin oferta>
  sort <asc|desc|none>       ordenar por precio
  page <n> | next | prev     paginaci\u{f3}n
  scrape                     actualizar todas las fuentes
  scrape-url <url>           extraer precios de una p\u{e1}gina
  scrape-geo <lat> <lng>     actualizar por ubicaci\u{f3}n
  key <api-key>              guardar la API key
  logout                     olvidar la API key
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    Refresh,
    Search(String),
    Pharmacy(Option<String>),
    Filter(OfferFilter),
    Sort(Option<SortOrder>),
    Page(u32),
    Next,
    Prev,
    Scrape(ScrapeTarget),
    Key(String),
    Logout,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parses one input line. Returns `Ok(None)` for blank lines.
    pub(crate) fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(v, r)| (v, r.trim()));

        let command = match verb.to_lowercase().as_str() {
            "refresh" | "r" => SessionCommand::Refresh,
            "search" | "s" => SessionCommand::Search(rest.to_string()),
            "pharmacy" | "farmacia" => {
                SessionCommand::Pharmacy((!rest.is_empty()).then(|| rest.to_string()))
            }
            "filter" | "filtro" => {
                SessionCommand::Filter(rest.parse().map_err(|e| format!("{e}"))?)
            }
            "sort" | "orden" => match rest.to_lowercase().as_str() {
                "" | "none" | "ninguno" => SessionCommand::Sort(None),
                other => SessionCommand::Sort(Some(other.parse().map_err(|e| format!("{e}"))?)),
            },
            "page" | "p" => SessionCommand::Page(
                rest.parse()
                    .map_err(|_| format!("invalid page number: '{rest}'"))?,
            ),
            "next" | "n" => SessionCommand::Next,
            "prev" => SessionCommand::Prev,
            "scrape" => SessionCommand::Scrape(ScrapeTarget::All),
            "scrape-url" => {
                if rest.is_empty() {
                    return Err("usage: scrape-url <url>".to_string());
                }
                SessionCommand::Scrape(ScrapeTarget::Url(rest.to_string()))
            }
            "scrape-geo" => {
                let mut parts = rest.split_whitespace();
                let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err("usage: scrape-geo <lat> <lng>".to_string());
                };
                let lat: f64 = lat
                    .parse()
                    .map_err(|_| format!("invalid latitude: '{lat}'"))?;
                let lng: f64 = lng
                    .parse()
                    .map_err(|_| format!("invalid longitude: '{lng}'"))?;
                SessionCommand::Scrape(ScrapeTarget::Geo { lat, lng })
            }
            "key" => {
                if rest.is_empty() {
                    return Err("usage: key <api-key>".to_string());
                }
                SessionCommand::Key(rest.to_string())
            }
            "logout" => SessionCommand::Logout,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => return Err(format!("unknown command '{other}'; type `help`")),
        };
        Ok(Some(command))
    }
}

/// Requests `target` and, if the dashboard asks for a key, reads it from
/// `lines`. End of input or an empty answer cancels the scrape.
pub(crate) async fn drive_scrape<R, W>(
    dashboard: &mut Dashboard,
    target: ScrapeTarget,
    lines: &mut Lines<R>,
    out: &mut W,
) -> anyhow::Result<Option<ScrapeStatus>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let status = dashboard.request_scrape(target).await;
    if status != ScrapeStatus::AwaitingKey {
        return Ok(Some(status));
    }

    writeln!(out, "{KEY_PROMPT}")?;
    out.flush()?;
    let answer = lines.next_line().await.context("failed to read API key")?;
    match answer.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()) {
        Some(key) => Ok(Some(dashboard.confirm_key(&key).await)),
        None => {
            dashboard.cancel_auth();
            writeln!(out, "scraping cancelado")?;
            Ok(None)
        }
    }
}

/// Reads commands from `input` until `quit` or end of input.
pub(crate) async fn run_session<R, W>(
    dashboard: &mut Dashboard,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    dashboard.load().await;
    write!(out, "{}", render_dashboard(dashboard))?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await.context("failed to read command")? else {
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };
        if !matches!(command, SessionCommand::Key(_)) {
            tracing::debug!(?command, "session command");
        }

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            SessionCommand::Refresh => dashboard.load().await,
            SessionCommand::Search(term) => dashboard.search(&term).await,
            SessionCommand::Pharmacy(name) => dashboard.set_pharmacy(name.as_deref()).await,
            SessionCommand::Filter(filter) => dashboard.set_offer_filter(filter),
            SessionCommand::Sort(sort) => dashboard.set_sort(sort),
            SessionCommand::Page(page) => dashboard.go_to_page(page).await,
            SessionCommand::Next => dashboard.next_page().await,
            SessionCommand::Prev => dashboard.prev_page().await,
            SessionCommand::Scrape(target) => {
                drive_scrape(dashboard, target, &mut lines, out).await?;
            }
            SessionCommand::Key(key) => {
                dashboard.confirm_key(&key).await;
                writeln!(out, "API key guardada")?;
            }
            SessionCommand::Logout => {
                dashboard.forget_key();
                writeln!(out, "API key eliminada")?;
            }
        }

        write!(out, "{}", render_dashboard(dashboard))?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
