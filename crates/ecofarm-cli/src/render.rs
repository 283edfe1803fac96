use std::fmt::Write as _;

use ecofarm_core::{format_clp, format_timestamp, PriceRecord, ALL_PHARMACIES};

use crate::dashboard::{Dashboard, LoadState};

pub(crate) const EMPTY_VIEW_MESSAGE: &str =
    "No hay datos disponibles para la farmacia seleccionada.";

const PRODUCT_WIDTH: usize = 40;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Renders records as a fixed-width table, or the empty-view message.
pub(crate) fn render_table(rows: &[&PriceRecord]) -> String {
    if rows.is_empty() {
        return format!("{EMPTY_VIEW_MESSAGE}\n");
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16}{:<42}{:>12}  {:<14}{:<8}ACTUALIZADO",
        "FARMACIA", "PRODUCTO", "PRECIO (CLP)", "STOCK", "OFERTA"
    );
    for row in rows {
        let stock = row.stock.as_deref().unwrap_or("\u{2014}");
        let offer = if row.is_offer() { "s\u{ed}" } else { "" };
        let _ = writeln!(
            out,
            "{:<16}{:<42}{:>12}  {:<14}{:<8}{}",
            truncate(&row.pharmacy, 15),
            truncate(&row.product, PRODUCT_WIDTH),
            format_clp(row.price),
            truncate(stock, 13),
            offer,
            format_timestamp(row.timestamp)
        );
    }
    out
}

/// Renders the whole dashboard: status line, messages, table and footer.
pub(crate) fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::from("EcoFarmacias Monitor\n\n");

    if dashboard.load_state() == LoadState::Loading {
        out.push_str("Cargando...\n");
    }
    if let Some(error) = dashboard.error() {
        let _ = writeln!(out, "error: {error}");
    }
    if let Some(notice) = dashboard.notice() {
        let _ = writeln!(out, "{notice}");
    }

    let visible = dashboard.visible();
    out.push_str(&render_table(&visible));

    let view = dashboard.view();
    let pharmacy = view.pharmacy.as_deref().unwrap_or(ALL_PHARMACIES);
    let sort = view.sort.map_or_else(|| "ninguno".to_string(), |s| s.to_string());
    let _ = writeln!(
        out,
        "\nP\u{e1}gina {} de {} \u{b7} {} de {} registros \u{b7} farmacia: {} \u{b7} filtro: {} \u{b7} orden: {}",
        dashboard.query().current_page(),
        dashboard.page_count(),
        visible.len(),
        dashboard.total(),
        pharmacy,
        view.offer_filter,
        sort
    );
    if !view.search.is_empty() {
        let _ = writeln!(out, "b\u{fa}squeda: \"{}\"", view.search);
    }
    if dashboard.auth_prompt_open() {
        out.push_str("Autenticaci\u{f3}n requerida.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(pharmacy: &str, product: &str, price: i64, offer: bool) -> PriceRecord {
        PriceRecord {
            id: None,
            pharmacy: pharmacy.to_string(),
            product: product.to_string(),
            price: Decimal::from(price),
            stock: None,
            url: None,
            timestamp: None,
            es_oferta: Some(offer),
        }
    }

    #[test]
    fn empty_view_prints_message() {
        assert_eq!(render_table(&[]), format!("{EMPTY_VIEW_MESSAGE}\n"));
    }

    #[test]
    fn table_formats_price_and_offer_marker() {
        let a = record("Farmex", "Ibuprofeno 400mg", 1290, true);
        let table = render_table(&[&a]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("FARMACIA"));
        assert!(lines[1].starts_with("Farmex"));
        assert!(lines[1].contains("$1.290"));
        assert!(lines[1].contains("s\u{ed}"));
    }

    #[test]
    fn idle_dashboard_renders_empty_view_and_footer() {
        let client =
            ecofarm_client::PriceClient::new("http://127.0.0.1:9/api", 5, "ecofarm-test/0.1")
                .expect("client construction should not fail");
        let dashboard = Dashboard::new(client, 50);

        let rendered = render_dashboard(&dashboard);

        assert!(rendered.starts_with("EcoFarmacias Monitor"));
        assert!(rendered.contains(EMPTY_VIEW_MESSAGE));
        assert!(rendered.contains("P\u{e1}gina 1 de 1"));
        assert!(rendered.contains("filtro: Todos"));
        assert!(!rendered.contains("Cargando"));
        assert!(!rendered.contains("Actualizando"));
    }

    #[test]
    fn long_product_names_are_truncated() {
        let name = "Paracetamol 500mg caja de 16 comprimidos recubiertos extra";
        let truncated = truncate(name, PRODUCT_WIDTH);
        assert_eq!(truncated.chars().count(), PRODUCT_WIDTH);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate("Aspirina", PRODUCT_WIDTH), "Aspirina");
    }
}
