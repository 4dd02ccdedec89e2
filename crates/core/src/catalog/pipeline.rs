//! Price filter → limit → rating selection, plus the cheapest-item side channel.

use std::cmp::Ordering;

use crate::domain::filter::{FilterConfig, PriceRange, RatingSelection};
use crate::domain::product::Product;

/// Minimum-price result over the price-filtered, limited set.
#[derive(Clone, Debug, PartialEq)]
pub enum Cheapest {
    Found(Product),
    Empty,
}

impl Cheapest {
    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Found(product) => Some(product),
            Self::Empty => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub products: Vec<Product>,
    pub cheapest: Cheapest,
}

pub fn apply(products: &[Product], config: &FilterConfig) -> PipelineOutput {
    let mut selected = filter_by_price(products, config.price_range.as_ref());
    if let Some(limit) = config.limit {
        selected.truncate(limit.get());
    }

    let cheapest = cheapest(&selected);
    let products = match &config.rating {
        Some(selection) => select_top_rated(selected, selection),
        None => selected,
    };

    PipelineOutput { products, cheapest }
}

pub fn filter_by_price(products: &[Product], range: Option<&PriceRange>) -> Vec<Product> {
    products
        .iter()
        .filter(|product| range.map_or(true, |range| range.contains(product.price)))
        .cloned()
        .collect()
}

/// Stable sort by rate, then keep the first `selection.count` items.
pub fn select_top_rated(mut products: Vec<Product>, selection: &RatingSelection) -> Vec<Product> {
    products.sort_by(|left, right| {
        let ordering = left.rate().partial_cmp(&right.rate()).unwrap_or(Ordering::Equal);
        if selection.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    products.truncate(selection.count.get());
    products
}

/// First product with the lowest price wins ties.
pub fn cheapest(products: &[Product]) -> Cheapest {
    products
        .iter()
        .reduce(|best, candidate| if candidate.price < best.price { candidate } else { best })
        .cloned()
        .map_or(Cheapest::Empty, Cheapest::Found)
}
