pub mod pipeline;
pub mod summary;

use async_trait::async_trait;

use crate::domain::product::Product;
use crate::errors::CatalogError;

pub use pipeline::{apply, Cheapest, PipelineOutput};

/// Remote product listing source. One call returns the whole, unpaginated catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError>;
}

/// Fixed in-memory catalog, mostly useful for tests and local runs.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }
}
