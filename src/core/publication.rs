//! Finds the publication cycle currently in force for a source.

use crate::config::source_config::{CycleStrategy, SourceConfig};
use crate::core::session::FetchSession;
use crate::domain::model::PublicationCycle;
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::validate_regex;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const DEFAULT_CYCLE_PATTERN: &str =
    r"(\d{4}-\d{2}-\d{2}|\d{4}_\d{2}_\d{2}|\d{1,2}[-_ ][A-Za-z]{3}[-_ ]\d{4})";

static DATE_SHAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-_](\d{2})[-_](\d{2})|(\d{1,2})[-_ ]([A-Za-z]{3})[-_ ](\d{4})")
        .expect("date regex is valid")
});

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// A syntactically valid cycle token found by one of the strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleToken {
    pub id: String,
    pub date: Option<NaiveDate>,
}

/// Extracts the first date in any supported shape from a token.
pub fn parse_cycle_date(token: &str) -> Option<NaiveDate> {
    DATE_SHAPES.captures_iter(token).find_map(|caps| {
        if let (Some(y), Some(m), Some(d)) = (caps.get(1), caps.get(2), caps.get(3)) {
            NaiveDate::from_ymd_opt(
                y.as_str().parse().ok()?,
                m.as_str().parse().ok()?,
                d.as_str().parse().ok()?,
            )
        } else {
            let day: u32 = caps.get(4)?.as_str().parse().ok()?;
            let month = caps.get(5)?.as_str().to_ascii_uppercase();
            let month = MONTHS.iter().position(|m| *m == month)? as u32 + 1;
            let year: i32 = caps.get(6)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
    })
}

/// Token regex for one source.
#[derive(Debug, Clone)]
pub struct CyclePattern {
    regex: Regex,
    custom: bool,
}

impl CyclePattern {
    pub fn from_config(pattern: Option<&str>) -> Result<Self> {
        let regex = validate_regex("cycle.pattern", pattern.unwrap_or(DEFAULT_CYCLE_PATTERN))?;
        Ok(Self {
            regex,
            custom: pattern.is_some(),
        })
    }

    /// All valid tokens in `text`. With the default pattern a token must
    /// carry a real calendar date; a custom pattern only has to match.
    pub fn tokens(&self, text: &str) -> Vec<CycleToken> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let id = caps.get(1).or_else(|| caps.get(0))?.as_str().to_string();
                let date = parse_cycle_date(&id);
                (self.custom || date.is_some()).then_some(CycleToken { id, date })
            })
            .collect()
    }
}

/// Highest date wins; equal dates fall back to the larger token text.
pub fn latest(tokens: impl IntoIterator<Item = CycleToken>) -> Option<CycleToken> {
    tokens
        .into_iter()
        .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
}

pub struct PublicationResolver<'a> {
    session: &'a FetchSession<'a>,
    config: &'a SourceConfig,
    today: NaiveDate,
}

impl<'a> PublicationResolver<'a> {
    pub fn new(session: &'a FetchSession<'a>, config: &'a SourceConfig, today: NaiveDate) -> Self {
        Self {
            session,
            config,
            today,
        }
    }

    /// Tries each configured strategy in order. Transport failures abort;
    /// a strategy that simply finds nothing hands over to the next one.
    pub async fn resolve(&self) -> Result<PublicationCycle> {
        let pattern = CyclePattern::from_config(self.config.cycle.pattern.as_deref())?;

        for strategy in &self.config.cycle.strategies {
            let token = match strategy {
                CycleStrategy::IndexMarker {
                    url,
                    labels,
                    styles,
                } => self.from_index(url, labels, styles, &pattern).await?,
                CycleStrategy::Redirect { url } => self.from_redirect(url, &pattern).await?,
                CycleStrategy::Feed {
                    url,
                    entries,
                    date_field,
                    cycle_field,
                } => {
                    self.from_feed(url, entries.as_deref(), date_field, cycle_field.as_deref())
                        .await?
                }
                CycleStrategy::Fixed { cycle } => Some(CycleToken {
                    id: cycle.clone(),
                    date: parse_cycle_date(cycle),
                }),
            };

            match token {
                Some(token) => {
                    let cycle = self.build_cycle(token);
                    tracing::info!(
                        "{}: cycle {} via {} strategy",
                        self.config.id,
                        cycle.cycle_id,
                        strategy.kind()
                    );
                    return Ok(cycle);
                }
                None => tracing::debug!(
                    "{}: {} strategy found no cycle",
                    self.config.id,
                    strategy.kind()
                ),
            }
        }

        Err(ChartError::CycleNotFound {
            source_id: self.config.id.clone(),
        })
    }

    fn build_cycle(&self, token: CycleToken) -> PublicationCycle {
        let date = token
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| token.id.clone());
        let base_url = self
            .config
            .url_base
            .replace("{cycle}", &token.id)
            .replace("{date}", &date);
        PublicationCycle {
            source_id: self.config.id.clone(),
            cycle_id: token.id,
            base_url,
            effective_from: token.date,
        }
    }

    async fn from_index(
        &self,
        url: &str,
        labels: &[String],
        styles: &[String],
        pattern: &CyclePattern,
    ) -> Result<Option<CycleToken>> {
        let response = self.session.get(url).await?;
        if !response.is_success() {
            tracing::warn!("{}: index page {} returned {}", self.config.id, url, response.status);
            return Ok(None);
        }
        Ok(scan_index(&response.text(), labels, styles, pattern, self.today))
    }

    async fn from_redirect(&self, url: &str, pattern: &CyclePattern) -> Result<Option<CycleToken>> {
        let response = self.session.get(url).await?;
        if !response.is_success() {
            tracing::warn!("{}: landing page {} returned {}", self.config.id, url, response.status);
            return Ok(None);
        }
        Ok(latest(pattern.tokens(&response.final_url)))
    }

    async fn from_feed(
        &self,
        url: &str,
        entries: Option<&str>,
        date_field: &str,
        cycle_field: Option<&str>,
    ) -> Result<Option<CycleToken>> {
        let response = self.session.get(url).await?;
        if !response.is_success() {
            tracing::warn!("{}: feed {} returned {}", self.config.id, url, response.status);
            return Ok(None);
        }
        match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(feed) => Ok(scan_feed(&feed, entries, date_field, cycle_field, self.today)),
            Err(e) => {
                tracing::warn!("{}: feed {} is not JSON: {}", self.config.id, url, e);
                Ok(None)
            }
        }
    }
}

/// Scans an index/history page. Marked regions win; with no markers
/// configured the whole page is scanned and only issues already in force
/// are considered.
pub fn scan_index(
    html: &str,
    labels: &[String],
    styles: &[String],
    pattern: &CyclePattern,
    today: NaiveDate,
) -> Option<CycleToken> {
    let document = Html::parse_document(html);

    if labels.is_empty() && styles.is_empty() {
        let mut texts = hrefs_of(document.root_element());
        texts.push(text_of(document.root_element()));
        let tokens = texts
            .iter()
            .flat_map(|t| pattern.tokens(t))
            .filter(|t| t.date.map_or(true, |d| d <= today));
        return latest(tokens);
    }

    let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let styles: Vec<String> = styles.iter().map(|s| squash(&s.to_lowercase())).collect();
    let has_label = |text: &str| {
        let text = text.to_lowercase();
        labels.iter().any(|l| text.contains(l.as_str()))
    };
    let has_style = |el: ElementRef| {
        std::iter::once(el)
            .chain(el.descendants().filter_map(ElementRef::wrap))
            .filter_map(|e| e.value().attr("style"))
            .any(|style| {
                let style = squash(&style.to_lowercase());
                styles.iter().any(|s| style.contains(s.as_str()))
            })
    };

    let mut regions: Vec<String> = Vec::new();
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6, table, tr, a[href]") else {
        return None;
    };
    let mut heading_pending = false;

    for el in document.select(&selector) {
        match el.value().name() {
            "table" => {
                if heading_pending {
                    regions.extend(hrefs_of(el));
                    regions.push(text_of(el));
                    heading_pending = false;
                }
            }
            "tr" => {
                if has_label(&text_of(el)) || has_style(el) {
                    regions.extend(hrefs_of(el));
                    regions.push(text_of(el));
                }
            }
            "a" => {
                if has_label(&text_of(el)) {
                    regions.extend(hrefs_of(el));
                }
            }
            // a later heading closes the labelled section
            _ => heading_pending = has_label(&text_of(el)),
        }
    }

    latest(regions.iter().flat_map(|r| pattern.tokens(r)))
}

/// Picks the entry with the latest effective date on or before `today`.
pub fn scan_feed(
    feed: &serde_json::Value,
    entries: Option<&str>,
    date_field: &str,
    cycle_field: Option<&str>,
    today: NaiveDate,
) -> Option<CycleToken> {
    let list = match (entries, feed) {
        (Some(field), value) => value.get(field)?.as_array()?,
        (None, serde_json::Value::Array(items)) => items,
        (None, serde_json::Value::Object(map)) => map.values().find_map(|v| v.as_array())?,
        _ => return None,
    };

    let tokens = list.iter().filter_map(|entry| {
        let raw_date = scalar(entry.get(date_field)?)?;
        let date = parse_cycle_date(&raw_date)?;
        if date > today {
            return None;
        }
        let id = match cycle_field {
            Some(field) => scalar(entry.get(field)?)?,
            None => raw_date,
        };
        Some(CycleToken {
            id,
            date: Some(date),
        })
    });
    latest(tokens)
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn hrefs_of(el: ElementRef) -> Vec<String> {
    std::iter::once(el)
        .chain(el.descendants().filter_map(ElementRef::wrap))
        .filter_map(|e| e.value().attr("href"))
        .map(str::to_string)
        .collect()
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::ScriptedFetcher;
    use crate::utils::cancellation::CancellationToken;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn default_pattern() -> CyclePattern {
        CyclePattern::from_config(None).unwrap()
    }

    fn source(cycle_toml: &str) -> SourceConfig {
        let content = format!(
            r#"
id = "test"
url_base = "https://aip.example.com/{{cycle}}/"
{}
[locator]
page_template = "{{base}}{{icao}}.html"
"#,
            cycle_toml
        );
        SourceConfig::from_toml_str(&content).unwrap()
    }

    #[test]
    fn test_parse_cycle_date_shapes() {
        let jan22 = NaiveDate::from_ymd_opt(2026, 1, 22);
        assert_eq!(parse_cycle_date("2026-01-22"), jan22);
        assert_eq!(parse_cycle_date("001-2026_2026_01_22"), jan22);
        assert_eq!(parse_cycle_date("2026_001_22-JAN-2026"), jan22);
        assert_eq!(parse_cycle_date("27-Nov-2025-A"), NaiveDate::from_ymd_opt(2025, 11, 27));
        assert_eq!(parse_cycle_date("2026-02-30"), None);
        assert_eq!(parse_cycle_date("current"), None);
    }

    #[test]
    fn test_default_pattern_requires_real_dates() {
        let tokens = default_pattern().tokens("a/2026-01-22/b 2026-13-01 12 FOO 2020");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].id, "2026-01-22");
    }

    #[test]
    fn test_custom_pattern_keeps_folder_token() {
        let pattern =
            CyclePattern::from_config(Some(r"eAIPfiles/(\d{4}_\d{3}_\d{2}-[A-Z]{3}-\d{4})/")).unwrap();
        let tokens = pattern.tokens(r#"<a href="eAIPfiles/2026_001_22-JAN-2026/data/2026-01-22/html/index.html">"#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].id, "2026_001_22-JAN-2026");
        assert_eq!(tokens[0].date, NaiveDate::from_ymd_opt(2026, 1, 22));
    }

    #[test]
    fn test_history_page_without_markers_picks_latest_effective() {
        let html = r#"<table>
            <tr><td><a href="2025-11-01/html/index-en-GB.html">AIRAC 2025-11-01</a></td></tr>
            <tr><td><a href="2025-12-25/html/index-en-GB.html">AIRAC 2025-12-25</a></td></tr>
            <tr><td><a href="2026-01-22/html/index-en-GB.html">AIRAC 2026-01-22</a></td></tr>
            <tr><td><a href="2026-04-16/html/index-en-GB.html">Next issue 2026-04-16</a></td></tr>
        </table>"#;
        let token = scan_index(html, &[], &[], &default_pattern(), today()).unwrap();
        assert_eq!(token.id, "2026-01-22");
    }

    #[test]
    fn test_style_marker_wins_over_later_dates() {
        let html = r#"<table>
            <tr><td style="background-color: #ADFF2F"><a href="001-2026_2026_01_22/index.html">Effective</a></td></tr>
            <tr><td><a href="002-2026_2026_02_19/index.html">Next</a></td></tr>
        </table>"#;
        let styles = vec!["background-color:#adff2f".to_string()];
        let token = scan_index(html, &[], &styles, &default_pattern(), today()).unwrap();
        assert_eq!(token.id, "2026_01_22");
    }

    #[test]
    fn test_label_marker_on_heading_reads_following_table() {
        let html = r#"
            <h2>Currently Effective Issue</h2>
            <table><tr><td><a href="2025-12-02/html/index-en-MS.html">02 DEC 2025</a></td></tr></table>
            <h2>Next Issues</h2>
            <table><tr><td><a href="2026-01-29/html/index-en-MS.html">29 JAN 2026</a></td></tr></table>"#;
        let labels = vec!["Currently Effective".to_string()];
        let token = scan_index(html, &labels, &[], &default_pattern(), today()).unwrap();
        assert_eq!(token.id, "2025-12-02");
    }

    #[test]
    fn test_labelled_heading_without_table_does_not_reach_later_sections() {
        let html = r#"
            <h2>Currently Effective Issue</h2>
            <p>No issue is published at the moment.</p>
            <h2>Archive</h2>
            <table><tr><td><a href="2025-12-02/html/index-en-MS.html">02 DEC 2025</a></td></tr></table>"#;
        let labels = vec!["Currently Effective".to_string()];
        assert_eq!(scan_index(html, &labels, &[], &default_pattern(), today()), None);
    }

    #[test]
    fn test_label_marker_on_anchor() {
        let html = r#"<p><a href="./archive/2025-10-02/index.htm">2025-10-02</a>
            <a href="./current/2026-01-22/index.htm">Current version</a></p>"#;
        let labels = vec!["current version".to_string()];
        let token = scan_index(html, &labels, &[], &default_pattern(), today()).unwrap();
        assert_eq!(token.id, "2026-01-22");
    }

    #[test]
    fn test_markers_configured_but_absent() {
        let html = r#"<a href="2026-01-22/index.html">2026-01-22</a>"#;
        let labels = vec!["Currently Effective".to_string()];
        assert!(scan_index(html, &labels, &[], &default_pattern(), today()).is_none());
    }

    #[test]
    fn test_feed_picks_latest_not_in_future() {
        let feed = serde_json::json!({
            "issues": [
                {"effectiveDate": "2025-12-25", "id": "AIRAC 13/25"},
                {"effectiveDate": "2026-01-22", "id": "AIRAC 01/26"},
                {"effectiveDate": "2026-04-16", "id": "AIRAC 04/26"},
                {"effectiveDate": "n/a", "id": "broken"}
            ]
        });
        let token = scan_feed(&feed, None, "effectiveDate", Some("id"), today()).unwrap();
        assert_eq!(token.id, "AIRAC 01/26");

        let by_date = scan_feed(&feed, Some("issues"), "effectiveDate", None, today()).unwrap();
        assert_eq!(by_date.id, "2026-01-22");

        assert!(scan_feed(&serde_json::json!("x"), None, "effectiveDate", None, today()).is_none());
    }

    #[tokio::test]
    async fn test_resolver_falls_through_strategies() {
        let fetcher = ScriptedFetcher::new()
            .page("https://aip.example.com/history.html", 404, "")
            .redirect(
                "https://aip.example.com/",
                "https://aip.example.com/2026-01-22/html/index.html",
                "<html></html>",
            );
        let config = source(
            r#"
[cycle]
[[cycle.strategies]]
kind = "index_marker"
url = "https://aip.example.com/history.html"
[[cycle.strategies]]
kind = "redirect"
url = "https://aip.example.com/"
"#,
        );
        let cancel = CancellationToken::new();
        let session = FetchSession::new(&fetcher, vec![], &cancel);
        let cycle = PublicationResolver::new(&session, &config, today())
            .resolve()
            .await
            .unwrap();

        assert_eq!(cycle.cycle_id, "2026-01-22");
        assert_eq!(cycle.base_url, "https://aip.example.com/2026-01-22/");
        assert_eq!(cycle.effective_from, NaiveDate::from_ymd_opt(2026, 1, 22));
        assert_eq!(session.request_count(), 2);
    }

    #[tokio::test]
    async fn test_resolver_reports_cycle_not_found() {
        let fetcher = ScriptedFetcher::new().redirect(
            "https://aip.example.com/",
            "https://aip.example.com/landing",
            "",
        );
        let config = source(
            r#"
[cycle]
[[cycle.strategies]]
kind = "redirect"
url = "https://aip.example.com/"
"#,
        );
        let cancel = CancellationToken::new();
        let session = FetchSession::new(&fetcher, vec![], &cancel);
        let result = PublicationResolver::new(&session, &config, today()).resolve().await;
        assert!(matches!(result, Err(ChartError::CycleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_fixed_cycle_needs_no_fetch() {
        let fetcher = ScriptedFetcher::new();
        let config = source(
            r#"
[cycle]
[[cycle.strategies]]
kind = "fixed"
cycle = "current"
"#,
        );
        let cancel = CancellationToken::new();
        let session = FetchSession::new(&fetcher, vec![], &cancel);
        let cycle = PublicationResolver::new(&session, &config, today())
            .resolve()
            .await
            .unwrap();
        assert_eq!(cycle.cycle_id, "current");
        assert_eq!(cycle.effective_from, None);
        assert_eq!(session.request_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let fetcher = ScriptedFetcher::new().failing("https://aip.example.com/");
        let config = source(
            r#"
[cycle]
[[cycle.strategies]]
kind = "redirect"
url = "https://aip.example.com/"
[[cycle.strategies]]
kind = "fixed"
cycle = "current"
"#,
        );
        let cancel = CancellationToken::new();
        let session = FetchSession::new(&fetcher, vec![], &cancel);
        let result = PublicationResolver::new(&session, &config, today()).resolve().await;
        assert!(matches!(result, Err(ChartError::DocumentFetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let fetcher = ScriptedFetcher::new();
        let config = source(
            r#"
[cycle]
[[cycle.strategies]]
kind = "redirect"
url = "https://aip.example.com/"
"#,
        );
        let cancel = CancellationToken::new();
        cancel.cancel("shutdown");
        let session = FetchSession::new(&fetcher, vec![], &cancel);
        let result = PublicationResolver::new(&session, &config, today()).resolve().await;
        assert!(matches!(result, Err(ChartError::Cancelled { .. })));
        assert_eq!(fetcher.requests().len(), 0);
    }
}
