use crate::utils::error::{ChartError, Result};
use regex::Regex;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ChartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ChartError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ChartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// Validates a URL template by filling every placeholder with a dummy value.
/// Templates starting with `{base}` are checked against a dummy base URL.
pub fn validate_url_template(field_name: &str, template: &str) -> Result<()> {
    let filled = template
        .replace("{base}", "https://base.invalid/")
        .replace("{icao}", "XXXX")
        .replace("{prefix}", "XX")
        .replace("{cycle}", "cycle")
        .replace("{date}", "2000-01-01");
    validate_url(field_name, &filled).map_err(|_| ChartError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: template.to_string(),
        reason: "Template does not expand to an http(s) URL".to_string(),
    })
}

pub fn validate_regex(field_name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ChartError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: pattern.to_string(),
        reason: format!("Invalid regular expression: {}", e),
    })
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ChartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ChartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_icao_prefix(field_name: &str, prefix: &str) -> Result<()> {
    let valid = (1..=4).contains(&prefix.len())
        && prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !valid {
        return Err(ChartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: prefix.to_string(),
            reason: "ICAO prefixes are 1-4 uppercase letters or digits".to_string(),
        });
    }
    Ok(())
}

/// Uppercases and checks a 4-character ICAO location indicator.
pub fn normalize_icao(value: &str) -> Result<String> {
    let icao = value.trim().to_ascii_uppercase();
    if icao.len() == 4 && icao.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(icao)
    } else {
        Err(ChartError::InvalidIcao {
            value: value.to_string(),
        })
    }
}
