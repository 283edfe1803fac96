//! Client-side projection of a fetched price list.
//!
//! [`derive_view`] applies the search term, the pharmacy and offer filters,
//! and an optional price ordering to a slice of records without copying them.
//! The sort is stable, so records with equal prices keep their fetch order.

use std::fmt;
use std::str::FromStr;

use crate::prices::{PriceRecord, ALL_PHARMACIES};
use crate::CoreError;

/// Partition on the discount flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OfferFilter {
    #[default]
    All,
    OffersOnly,
    RegularOnly,
}

impl OfferFilter {
    #[must_use]
    pub fn matches(self, record: &PriceRecord) -> bool {
        match self {
            OfferFilter::All => true,
            OfferFilter::OffersOnly => record.is_offer(),
            OfferFilter::RegularOnly => !record.is_offer(),
        }
    }
}

impl fmt::Display for OfferFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferFilter::All => write!(f, "Todos"),
            OfferFilter::OffersOnly => write!(f, "Ofertas"),
            OfferFilter::RegularOnly => write!(f, "Sin oferta"),
        }
    }
}

impl FromStr for OfferFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "todos" | "all" => Ok(OfferFilter::All),
            "ofertas" | "oferta" | "offers" => Ok(OfferFilter::OffersOnly),
            "sin oferta" | "sin-oferta" | "sin_oferta" | "regular" => {
                Ok(OfferFilter::RegularOnly)
            }
            _ => Err(CoreError::InvalidOfferFilter(s.to_string())),
        }
    }
}

/// Price ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascendente" => Ok(SortOrder::Asc),
            "desc" | "descendente" => Ok(SortOrder::Desc),
            _ => Err(CoreError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// Display controls that never trigger a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Case-insensitive substring matched against the product name.
    pub search: String,
    /// Exact source name; `None` or [`ALL_PHARMACIES`] keeps every source.
    pub pharmacy: Option<String>,
    pub offer_filter: OfferFilter,
    /// `None` keeps fetch order.
    pub sort: Option<SortOrder>,
}

/// Case-insensitive substring containment on the product name. An empty term
/// matches everything.
#[must_use]
pub fn matches_search(record: &PriceRecord, term: &str) -> bool {
    term.is_empty() || record.product.to_lowercase().contains(&term.to_lowercase())
}

fn matches_pharmacy(record: &PriceRecord, pharmacy: Option<&str>) -> bool {
    match pharmacy {
        None | Some(ALL_PHARMACIES) => true,
        Some(name) => record.pharmacy == name,
    }
}

/// Filters `records` by `options` and orders the survivors by price.
#[must_use]
pub fn derive_view<'a>(records: &'a [PriceRecord], options: &ViewOptions) -> Vec<&'a PriceRecord> {
    let mut view: Vec<&PriceRecord> = records
        .iter()
        .filter(|r| matches_search(r, &options.search))
        .filter(|r| matches_pharmacy(r, options.pharmacy.as_deref()))
        .filter(|r| options.offer_filter.matches(r))
        .collect();

    match options.sort {
        Some(SortOrder::Asc) => view.sort_by(|a, b| a.price.cmp(&b.price)),
        Some(SortOrder::Desc) => view.sort_by(|a, b| b.price.cmp(&a.price)),
        None => {}
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(id: i64, pharmacy: &str, product: &str, price: i64, offer: Option<bool>) -> PriceRecord {
        PriceRecord {
            id: Some(id),
            pharmacy: pharmacy.to_string(),
            product: product.to_string(),
            price: Decimal::from(price),
            stock: None,
            url: None,
            timestamp: None,
            es_oferta: offer,
        }
    }

    fn sample() -> Vec<PriceRecord> {
        vec![
            record(1, "EcoFarmacias", "Paracetamol 500mg", 1200, Some(false)),
            record(2, "Farmex", "Ibuprofeno 400mg", 900, Some(true)),
            record(3, "Meki", "Paracetamol Infantil", 1500, None),
            record(4, "Farmex", "Loratadina", 900, Some(true)),
            record(5, "Meki", "Omeprazol", 2100, Some(false)),
        ]
    }

    fn ids(view: &[&PriceRecord]) -> Vec<i64> {
        view.iter().filter_map(|r| r.id).collect()
    }

    #[test]
    fn offers_filter_with_ascending_sort_matches_dashboard_example() {
        let records = vec![
            record(1, "Farmex", "Paracetamol", 1200, Some(false)),
            record(2, "Farmex", "Ibuprofeno", 900, Some(true)),
        ];
        let options = ViewOptions {
            offer_filter: "Ofertas".parse().unwrap(),
            sort: Some("asc".parse().unwrap()),
            ..ViewOptions::default()
        };
        let view = derive_view(&records, &options);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].product, "Ibuprofeno");
        assert_eq!(view[0].price, Decimal::from(900));
    }

    #[test]
    fn offer_partitions_are_complementary() {
        let records = sample();
        let offers = derive_view(
            &records,
            &ViewOptions {
                offer_filter: OfferFilter::OffersOnly,
                ..ViewOptions::default()
            },
        );
        let regular = derive_view(
            &records,
            &ViewOptions {
                offer_filter: OfferFilter::RegularOnly,
                ..ViewOptions::default()
            },
        );
        assert!(offers.iter().all(|r| r.is_offer()));
        assert!(regular.iter().all(|r| !r.is_offer()));
        assert_eq!(offers.len() + regular.len(), records.len());
        assert_eq!(ids(&offers), vec![2, 4]);
        assert_eq!(ids(&regular), vec![1, 3, 5]);
    }

    #[test]
    fn ascending_sort_is_stable_permutation() {
        let records = sample();
        let view = derive_view(
            &records,
            &ViewOptions {
                sort: Some(SortOrder::Asc),
                ..ViewOptions::default()
            },
        );
        assert_eq!(view.len(), records.len());
        assert!(view.windows(2).all(|w| w[0].price <= w[1].price));
        // 2 and 4 tie at 900 and keep fetch order.
        assert_eq!(ids(&view), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn descending_sort_is_stable_permutation() {
        let records = sample();
        let view = derive_view(
            &records,
            &ViewOptions {
                sort: Some(SortOrder::Desc),
                ..ViewOptions::default()
            },
        );
        assert_eq!(view.len(), records.len());
        assert!(view.windows(2).all(|w| w[0].price >= w[1].price));
        assert_eq!(ids(&view), vec![5, 3, 1, 2, 4]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let records = sample();
        let view = derive_view(
            &records,
            &ViewOptions {
                search: "PARACETAMOL".to_string(),
                ..ViewOptions::default()
            },
        );
        assert_eq!(ids(&view), vec![1, 3]);
    }

    #[test]
    fn empty_search_returns_input_unchanged() {
        let records = sample();
        let view = derive_view(&records, &ViewOptions::default());
        assert_eq!(ids(&view), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pharmacy_filter_matches_exact_source() {
        let records = sample();
        let view = derive_view(
            &records,
            &ViewOptions {
                pharmacy: Some("Meki".to_string()),
                ..ViewOptions::default()
            },
        );
        assert_eq!(ids(&view), vec![3, 5]);

        let all = derive_view(
            &records,
            &ViewOptions {
                pharmacy: Some(ALL_PHARMACIES.to_string()),
                ..ViewOptions::default()
            },
        );
        assert_eq!(all.len(), records.len());
    }

    #[test]
    fn parses_filter_labels() {
        assert_eq!("Todos".parse::<OfferFilter>().unwrap(), OfferFilter::All);
        assert_eq!(
            "sin oferta".parse::<OfferFilter>().unwrap(),
            OfferFilter::RegularOnly
        );
        assert!("rebajas".parse::<OfferFilter>().is_err());
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
