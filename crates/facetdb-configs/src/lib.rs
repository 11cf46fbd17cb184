//! facetdb-configs
//!
//! Configuration types and loader for FacetDB stores and tooling.

pub mod config;

pub use config::defaults;
pub use config::*;
