// Adapters layer: concrete implementations for external systems (http, output rendering)

pub mod http;
pub mod output;

pub use http::HttpFetcher;
pub use output::OutputFormat;
