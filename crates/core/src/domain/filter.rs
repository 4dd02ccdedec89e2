use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid price range `{0}`: expected `<min>-<max>` with min <= max")]
    InvalidPriceRange(String),
    #[error("rating count must be a positive integer")]
    InvalidRatingCount,
}

/// Inclusive `[min, max]` price bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, FilterError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(FilterError::InvalidPriceRange(format!("{min}-{max}")));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl FromStr for PriceRange {
    type Err = FilterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || FilterError::InvalidPriceRange(raw.to_owned());
        let mut tokens = raw.split('-');
        let (Some(min), Some(max), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(invalid());
        };

        let min = min.trim().parse::<f64>().map_err(|_| invalid())?;
        let max = max.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::new(min, max).map_err(|_| invalid())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSelection {
    pub count: NonZeroUsize,
    pub descending: bool,
}

impl Default for RatingSelection {
    fn default() -> Self {
        Self { count: NonZeroUsize::MIN, descending: false }
    }
}

impl RatingSelection {
    pub fn new(count: usize, descending: bool) -> Result<Self, FilterError> {
        let count = NonZeroUsize::new(count).ok_or(FilterError::InvalidRatingCount)?;
        Ok(Self { count, descending })
    }
}

/// Per-request pipeline settings. `rating` is only set for the rated variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub price_range: Option<PriceRange>,
    pub limit: Option<NonZeroUsize>,
    pub rating: Option<RatingSelection>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price_range(mut self, range: PriceRange) -> Self {
        self.price_range = Some(range);
        self
    }

    /// A zero limit means "no limit".
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = NonZeroUsize::new(limit);
        self
    }

    pub fn rated(mut self, selection: RatingSelection) -> Self {
        self.rating = Some(selection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterConfig, FilterError, PriceRange, RatingSelection};

    #[test]
    fn parses_inclusive_range_from_dash_delimited_string() {
        let range: PriceRange = "100-200".parse().expect("range should parse");
        assert_eq!(range.min(), 100.0);
        assert_eq!(range.max(), 200.0);
        assert!(range.contains(100.0));
        assert!(range.contains(200.0));
        assert!(!range.contains(200.01));
    }

    #[test]
    fn accepts_fractional_bounds_and_whitespace() {
        let range: PriceRange = " 9.5 - 10.25 ".parse().expect("range should parse");
        assert_eq!(range.min(), 9.5);
        assert_eq!(range.max(), 10.25);
    }

    #[test]
    fn rejects_malformed_ranges() {
        for raw in ["", "100", "abc-200", "100-", "1-2-3", "200-100", "nan-5", "-5"] {
            assert_eq!(
                raw.parse::<PriceRange>(),
                Err(FilterError::InvalidPriceRange(raw.to_owned())),
                "`{raw}` should be rejected"
            );
        }
    }

    #[test]
    fn zero_limit_means_unbounded() {
        assert_eq!(FilterConfig::new().limit(0).limit, None);
        assert_eq!(FilterConfig::new().limit(3).limit.map(|limit| limit.get()), Some(3));
    }

    #[test]
    fn rating_selection_defaults_to_single_ascending_item() {
        let selection = RatingSelection::default();
        assert_eq!(selection.count.get(), 1);
        assert!(!selection.descending);
        assert_eq!(RatingSelection::new(0, true), Err(FilterError::InvalidRatingCount));
    }
}
