pub mod classifier;
pub mod dedupe;
pub mod engine;
pub mod extractor;
pub mod locator;
pub mod publication;
pub mod session;
pub mod url_normalizer;

pub use crate::domain::model::{Chart, ChartCategory, ChartSet, PublicationCycle};
pub use crate::domain::ports::{FetchResponse, Fetcher};
pub use crate::utils::error::Result;
pub use engine::ChartEngine;
