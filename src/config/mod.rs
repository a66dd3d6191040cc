pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod source_config;

pub use catalog::SourceCatalog;
pub use source_config::{
    ClassificationOverrides, CycleConfig, CycleStrategy, ExtractConfig, LocatorConfig,
    SourceConfig,
};

#[cfg(feature = "cli")]
pub use cli::CliConfig;
