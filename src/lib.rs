pub mod aggregation;
pub mod canonical;
pub mod config;
pub mod dashboard;
pub mod decline;
pub mod error;
pub mod export;
pub mod filter;
pub mod forecast;
pub mod geo;
pub mod loader;
pub mod model;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use error::{LoadError, PadiError, Result};
pub use model::{Dataset, ProductionRecord};
