pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpFetcher, OutputFormat};
pub use config::{SourceCatalog, SourceConfig};
pub use core::ChartEngine;
pub use domain::model::{Chart, ChartCategory, ChartSet, ChartsReport, Diagnostic, PublicationCycle};
pub use domain::ports::{FetchResponse, Fetcher};
pub use utils::cancellation::CancellationToken;
pub use utils::error::{ChartError, Result};
