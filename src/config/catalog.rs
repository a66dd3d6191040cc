use crate::config::source_config::{substitute_env_vars, SourceConfig};
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A set of sources loaded from one `[[sources]]` TOML file, with ICAO
/// prefix routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCatalog {
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ChartError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ChartError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Picks the source with the longest matching ICAO prefix. Ties go to the
    /// source declared first.
    pub fn route(&self, icao: &str) -> Result<&SourceConfig> {
        let icao = icao.to_ascii_uppercase();
        let mut best: Option<(&SourceConfig, usize)> = None;

        for source in &self.sources {
            if source
                .exclude_prefixes
                .iter()
                .any(|p| icao.starts_with(p.as_str()))
            {
                continue;
            }
            let matched = source
                .icao_prefixes
                .iter()
                .filter(|p| icao.starts_with(p.as_str()))
                .map(String::len)
                .max();
            if let Some(len) = matched {
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((source, len));
                }
            }
        }

        best.map(|(source, _)| source)
            .ok_or(ChartError::UnknownSource { icao })
    }
}

impl Validate for SourceCatalog {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(ChartError::InvalidConfigValueError {
                    field: "sources.id".to_string(),
                    value: source.id.clone(),
                    reason: "Duplicate source id".to_string(),
                });
            }
            source.validate()?;
        }
        Ok(())
    }
}
