pub mod filter;
pub mod product;
pub mod query_log;
