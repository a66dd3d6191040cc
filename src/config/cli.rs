use crate::adapters::output::OutputFormat;
use crate::config::catalog::SourceCatalog;
use crate::config::source_config::SourceConfig;
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "aerodrome-charts")]
#[command(about = "Resolve the current aerodrome charts for ICAO airports")]
pub struct CliConfig {
    #[arg(help = "ICAO airport codes, e.g. EVRA EETN")]
    pub icao_codes: Vec<String>,

    #[arg(long, default_value = "sources.toml", help = "Source catalog (TOML)")]
    pub sources: String,

    #[arg(long, help = "Use this source id instead of ICAO prefix routing")]
    pub source: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[arg(long, default_value = "30", help = "Per-request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "List configured sources and exit")]
    pub list_sources: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number("timeout", self.timeout as usize, 1)?;
        validation::validate_non_empty_string("sources", &self.sources)?;
        if !self.list_sources && self.icao_codes.is_empty() {
            return Err(ChartError::MissingConfigError {
                field: "icao_codes".to_string(),
            });
        }
        for code in &self.icao_codes {
            validation::normalize_icao(code)?;
        }
        Ok(())
    }
}

impl CliConfig {
    /// Pairs every requested ICAO code with the source that serves it, in
    /// argument order.
    pub fn plan<'c>(&self, catalog: &'c SourceCatalog) -> Vec<(String, Result<&'c SourceConfig>)> {
        self.icao_codes
            .iter()
            .map(|code| {
                let icao = code.trim().to_ascii_uppercase();
                let source = match &self.source {
                    Some(id) => catalog.get(id).ok_or_else(|| ChartError::InvalidConfigValueError {
                        field: "source".to_string(),
                        value: id.clone(),
                        reason: "No source with this id in the catalog".to_string(),
                    }),
                    None => catalog.route(&icao),
                };
                (icao, source)
            })
            .collect()
    }
}
