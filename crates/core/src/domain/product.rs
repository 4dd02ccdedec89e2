use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_RATING: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rate: f64,
    pub count: u64,
}

/// A catalog listing after it has crossed the upstream mapping boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl Product {
    pub fn rate(&self) -> f64 {
        self.rating.as_ref().map(|rating| rating.rate).unwrap_or(0.0)
    }
}

/// Wire shape of one upstream catalog record.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RawProduct {
    pub title: String,
    pub price: f64,
    pub description: String,
    #[serde(default)]
    pub rating: Option<Rating>,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProductMappingError {
    #[error("product `{title}` has an invalid price {price}")]
    InvalidPrice { title: String, price: f64 },
    #[error("product `{title}` has a rating {rate} outside 0..=5")]
    InvalidRating { title: String, rate: f64 },
}

impl TryFrom<RawProduct> for Product {
    type Error = ProductMappingError;

    fn try_from(raw: RawProduct) -> Result<Self, Self::Error> {
        if !raw.price.is_finite() || raw.price < 0.0 {
            return Err(ProductMappingError::InvalidPrice { title: raw.title, price: raw.price });
        }
        if let Some(rating) = &raw.rating {
            if !(0.0..=MAX_RATING).contains(&rating.rate) {
                return Err(ProductMappingError::InvalidRating {
                    title: raw.title,
                    rate: rating.rate,
                });
            }
        }

        Ok(Self {
            name: raw.title,
            price: raw.price,
            description: raw.description,
            rating: raw.rating,
        })
    }
}

pub fn map_raw_products(raw: Vec<RawProduct>) -> Result<Vec<Product>, ProductMappingError> {
    raw.into_iter().map(Product::try_from).collect()
}
