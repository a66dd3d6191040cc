use crate::core::classifier::ChartClassifier;
use crate::domain::model::{ChartCategory, ExtractionStrategy};
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Declarative description of one chart publisher.
///
/// Everything that differs between national AIP sites lives here; the engine
/// itself is shared. Loaded once and shared read-only between resolutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub icao_prefixes: Vec<String>,
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
    /// Root of one publication, usually containing `{cycle}` or `{date}`.
    pub url_base: String,
    /// Marker identifying the publisher's own-language page variants.
    pub primary_language: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub cycle: CycleConfig,
    pub locator: LocatorConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub classification: ClassificationOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Token regex; capture group 1 (or the whole match) is the cycle id.
    pub pattern: Option<String>,
    pub strategies: Vec<CycleStrategy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleStrategy {
    /// History or landing page with a "currently effective" marker.
    IndexMarker {
        url: String,
        #[serde(default)]
        labels: Vec<String>,
        #[serde(default)]
        styles: Vec<String>,
    },
    /// Landing URL that redirects into the current publication folder.
    Redirect { url: String },
    /// JSON list of issues with effective dates.
    Feed {
        url: String,
        entries: Option<String>,
        #[serde(default = "default_date_field")]
        date_field: String,
        cycle_field: Option<String>,
    },
    /// Unversioned publication.
    Fixed { cycle: String },
}

impl CycleStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleStrategy::IndexMarker { .. } => "index_marker",
            CycleStrategy::Redirect { .. } => "redirect",
            CycleStrategy::Feed { .. } => "feed",
            CycleStrategy::Fixed { .. } => "fixed",
        }
    }
}

fn default_date_field() -> String {
    "effectiveDate".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub page_template: Option<String>,
    pub menu_template: Option<String>,
    #[serde(default = "default_page_markers")]
    pub page_markers: Vec<String>,
    #[serde(default = "default_english_markers")]
    pub english_markers: Vec<String>,
}

fn default_page_markers() -> Vec<String> {
    ["AD 2", "AD-2", "AD_2", "AD2"].map(String::from).to_vec()
}

fn default_english_markers() -> Vec<String> {
    ["en-GB", "en-US", "-en.", "_en.", "-en-", "english"]
        .map(String::from)
        .to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_extract_strategies")]
    pub strategies: Vec<ExtractionStrategy>,
    #[serde(default = "default_link_pattern")]
    pub link_pattern: String,
    #[serde(default)]
    pub require_icao_in_href: bool,
    #[serde(default = "default_skip_names")]
    pub skip_names: Vec<String>,
    #[serde(default = "default_filename_strip")]
    pub filename_strip: Vec<String>,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategies: default_extract_strategies(),
            link_pattern: default_link_pattern(),
            require_icao_in_href: false,
            skip_names: default_skip_names(),
            filename_strip: default_filename_strip(),
            title_selector: default_title_selector(),
        }
    }
}

fn default_extract_strategies() -> Vec<ExtractionStrategy> {
    vec![
        ExtractionStrategy::LinkText,
        ExtractionStrategy::PairedRow,
        ExtractionStrategy::SameRow,
        ExtractionStrategy::Caption,
        ExtractionStrategy::Filename,
    ]
}

fn default_link_pattern() -> String {
    r"(?i)\.pdf(?:[?#].*)?$".to_string()
}

fn default_skip_names() -> Vec<String> {
    vec![r"(?i)^nil$".to_string(), r"(?i)left\s+blank".to_string()]
}

fn default_filename_strip() -> Vec<String> {
    vec![
        r"(?i)^[A-Z]{2}[-_ ]AD[-_ ]2[-_ .][A-Z]{4}[-_ ]".to_string(),
        r"(?i)^AD[-_ ]?2[-_ .][A-Z]{4}[-_ ]".to_string(),
        r"(?i)[-_ ]en$".to_string(),
        r"[-_ ]\d{8}$".to_string(),
    ]
}

fn default_title_selector() -> String {
    "h1, h2, h3, h4, h5, h6, .title".to_string()
}

/// Per-source additions to the classifier. Families keep their fixed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationOverrides {
    #[serde(default)]
    pub sid_keywords: Vec<String>,
    #[serde(default)]
    pub star_keywords: Vec<String>,
    #[serde(default)]
    pub approach_keywords: Vec<String>,
    #[serde(default)]
    pub diagram_keywords: Vec<String>,
    #[serde(default)]
    pub codes: BTreeMap<String, ChartCategory>,
}

impl SourceConfig {
    /// 從 TOML 檔案載入單一來源
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

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("id", &self.id)?;
        validation::validate_url_template("url_base", &self.url_base)?;

        for prefix in self.icao_prefixes.iter().chain(&self.exclude_prefixes) {
            validation::validate_icao_prefix("icao_prefixes", prefix)?;
        }

        if self.cycle.strategies.is_empty() {
            return Err(ChartError::MissingConfigError {
                field: format!("{}.cycle.strategies", self.id),
            });
        }
        if let Some(pattern) = &self.cycle.pattern {
            validation::validate_regex("cycle.pattern", pattern)?;
        }
        for strategy in &self.cycle.strategies {
            match strategy {
                CycleStrategy::IndexMarker { url, .. }
                | CycleStrategy::Redirect { url }
                | CycleStrategy::Feed { url, .. } => {
                    validation::validate_url("cycle.strategies.url", url)?;
                }
                CycleStrategy::Fixed { cycle } => {
                    validation::validate_non_empty_string("cycle.strategies.cycle", cycle)?;
                }
            }
        }

        match (&self.locator.page_template, &self.locator.menu_template) {
            (None, None) => {
                return Err(ChartError::MissingConfigError {
                    field: format!("{}.locator.page_template", self.id),
                })
            }
            (page, menu) => {
                if let Some(template) = page {
                    validation::validate_url_template("locator.page_template", template)?;
                }
                if let Some(template) = menu {
                    validation::validate_url_template("locator.menu_template", template)?;
                }
            }
        }

        if self.extract.strategies.is_empty() {
            return Err(ChartError::MissingConfigError {
                field: format!("{}.extract.strategies", self.id),
            });
        }
        validation::validate_regex("extract.link_pattern", &self.extract.link_pattern)?;
        for pattern in self.extract.skip_names.iter().chain(&self.extract.filename_strip) {
            validation::validate_regex("extract", pattern)?;
        }
        if scraper::Selector::parse(&self.extract.title_selector).is_err() {
            return Err(ChartError::InvalidConfigValueError {
                field: "extract.title_selector".to_string(),
                value: self.extract.title_selector.clone(),
                reason: "Invalid CSS selector".to_string(),
            });
        }

        ChartClassifier::with_overrides(&self.classification).map(|_| ())
    }
}

impl Validate for SourceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// 替換環境變數 (例如 ${AIP_HOST})
pub(crate) fn substitute_env_vars(content: &str) -> Result<String> {
    let re = validation::validate_regex("environment", r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ESTONIA: &str = r#"
id = "estonia"
name = "EANS (Estonia)"
icao_prefixes = ["EE"]
url_base = "https://eaip.eans.ee/{cycle}/"

[headers]
Accept-Language = "en-US,en;q=0.9"

[cycle]
[[cycle.strategies]]
kind = "redirect"
url = "https://eaip.eans.ee/"

[locator]
page_template = "{base}html/eAIP/EE-AD-2.{icao}-en-GB.html"
"#;

    #[test]
    fn test_parse_basic_source_config() {
        let config = SourceConfig::from_toml_str(ESTONIA).unwrap();

        assert_eq!(config.id, "estonia");
        assert_eq!(config.display_name(), "EANS (Estonia)");
        assert!(matches!(
            config.cycle.strategies[0],
            CycleStrategy::Redirect { .. }
        ));
        assert_eq!(config.extract.strategies, default_extract_strategies());
        assert_eq!(config.locator.page_markers, default_page_markers());
        assert_eq!(config.header_pairs().len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_all_cycle_strategy_kinds() {
        let toml_content = r##"
id = "mixed"
url_base = "https://aip.example.com/{cycle}/"

[cycle]
pattern = '(\d{4}_\d{3}_\d{2}-[A-Z]{3}-\d{4})'

[[cycle.strategies]]
kind = "index_marker"
url = "https://aip.example.com/history.html"
labels = ["Currently Effective"]
styles = ["#ADFF2F"]

[[cycle.strategies]]
kind = "feed"
url = "https://aip.example.com/issues.json"
entries = "issues"

[[cycle.strategies]]
kind = "fixed"
cycle = "current"

[locator]
menu_template = "{base}eAIP/menu.html"

[extract]
strategies = ["structured_feed", "filename"]
require_icao_in_href = true

[classification]
diagram_keywords = ["MARKING"]
codes = { AGC = "AirportDiagram" }
"##;

        let config = SourceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.cycle.strategies.len(), 3);
        match &config.cycle.strategies[0] {
            CycleStrategy::IndexMarker { labels, styles, .. } => {
                assert_eq!(labels, &vec!["Currently Effective".to_string()]);
                assert_eq!(styles, &vec!["#ADFF2F".to_string()]);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
        match &config.cycle.strategies[1] {
            CycleStrategy::Feed {
                date_field,
                entries,
                cycle_field,
                ..
            } => {
                assert_eq!(date_field, "effectiveDate");
                assert_eq!(entries.as_deref(), Some("issues"));
                assert!(cycle_field.is_none());
            }
            other => panic!("unexpected strategy {:?}", other),
        }
        assert_eq!(
            config.classification.codes.get("AGC"),
            Some(&ChartCategory::AirportDiagram)
        );
        assert!(config.extract.require_icao_in_href);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_EAIP_HOST", "eaip.test.example");

        let content = ESTONIA.replace("eaip.eans.ee", "${TEST_EAIP_HOST}");
        let config = SourceConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.url_base, "https://eaip.test.example/{cycle}/");

        std::env::remove_var("TEST_EAIP_HOST");
    }

    #[test]
    fn test_config_validation_rejects_missing_locator_templates() {
        let content = ESTONIA.replace(
            "page_template = \"{base}html/eAIP/EE-AD-2.{icao}-en-GB.html\"",
            "",
        );
        let config = SourceConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ChartError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation_rejects_bad_regex() {
        let mut config = SourceConfig::from_toml_str(ESTONIA).unwrap();
        config.extract.link_pattern = "(".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_prefix() {
        let mut config = SourceConfig::from_toml_str(ESTONIA).unwrap();
        config.icao_prefixes = vec!["ee".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(ESTONIA.as_bytes()).unwrap();

        let config = SourceConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.id, "estonia");
    }
}
