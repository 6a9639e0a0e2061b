pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliArgs, OutputFormat};

pub use adapters::registry::build_fetchers;
pub use adapters::storage::LocalStorage;
pub use config::RadarConfig;
pub use core::{SearchEngine, SearchReport, SearchRequest};
pub use domain::model::{Listing, ResumeProfile};
pub use domain::ports::{FetchContext, SourceFetcher};
pub use utils::error::{RadarError, Result};
