pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;

pub use catalog::{apply, CatalogSource, Cheapest, PipelineOutput, StaticCatalog};
pub use domain::filter::{FilterConfig, FilterError, PriceRange, RatingSelection};
pub use domain::product::{Product, ProductMappingError, Rating, RawProduct};
pub use domain::query_log::QueryLogEntry;
pub use errors::{ApplicationError, CatalogError, InterfaceError};
pub use notify::{NoopNotifier, Notifier, NotifyError};
