//! Finds the chart-index document for one airport inside a resolved cycle.

use crate::config::source_config::SourceConfig;
use crate::core::session::FetchSession;
use crate::core::url_normalizer;
use crate::domain::model::PublicationCycle;
use crate::utils::error::{ChartError, Result};
use scraper::{Html, Selector};

/// The airport document and, when the probe already downloaded it, its bytes.
#[derive(Debug, Clone)]
pub struct LocatedDocument {
    pub url: String,
    pub body: Option<Vec<u8>>,
}

/// Fills `{base}`, `{cycle}`, `{date}`, `{icao}` and `{prefix}` in a template.
pub fn expand_template(template: &str, cycle: &PublicationCycle, icao: &str) -> String {
    let date = cycle
        .effective_from
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| cycle.cycle_id.clone());
    let prefix: String = icao.chars().take(2).collect();

    template
        .replace("{base}", &cycle.base_url)
        .replace("{cycle}", &cycle.cycle_id)
        .replace("{date}", &date)
        .replace("{icao}", icao)
        .replace("{prefix}", &prefix)
}

pub struct DocumentLocator<'a> {
    session: &'a FetchSession<'a>,
    config: &'a SourceConfig,
}

impl<'a> DocumentLocator<'a> {
    pub fn new(session: &'a FetchSession<'a>, config: &'a SourceConfig) -> Self {
        Self { session, config }
    }

    pub async fn locate(&self, cycle: &PublicationCycle, icao: &str) -> Result<LocatedDocument> {
        if let Some(template) = &self.config.locator.page_template {
            let url = expand_template(template, cycle, icao);
            let response = self.session.get(&url).await?;

            if response.is_success() {
                tracing::debug!("{}: direct page found at {}", icao, response.final_url);
                return Ok(LocatedDocument {
                    url: response.final_url,
                    body: Some(response.body),
                });
            }
            if !matches!(response.status, 404 | 410) {
                return Err(ChartError::DocumentFetchFailed {
                    url,
                    reason: format!("HTTP status {}", response.status),
                });
            }
            tracing::info!("{}: {} returned {}, scanning menu", icao, url, response.status);
        }

        match &self.config.locator.menu_template {
            Some(template) => self.scan_menu(template, cycle, icao).await,
            None => Err(self.not_found(icao)),
        }
    }

    async fn scan_menu(
        &self,
        template: &str,
        cycle: &PublicationCycle,
        icao: &str,
    ) -> Result<LocatedDocument> {
        let menu_url = expand_template(template, cycle, icao);
        let response = self.session.get(&menu_url).await?;

        if matches!(response.status, 404 | 410) {
            return Err(self.not_found(icao));
        }
        if !response.is_success() {
            return Err(ChartError::DocumentFetchFailed {
                url: menu_url,
                reason: format!("HTTP status {}", response.status),
            });
        }

        let links = pick_airport_link(
            &response.text(),
            icao,
            &self.config.locator.page_markers,
            &self.config.locator.english_markers,
            self.config.primary_language.as_deref(),
        );

        for href in links {
            match url_normalizer::normalize(&href, &response.final_url) {
                Ok(url) => {
                    tracing::debug!("{}: menu entry {} -> {}", icao, href, url);
                    return Ok(LocatedDocument { url, body: None });
                }
                Err(e) => tracing::warn!("{}: unusable menu entry: {}", icao, e),
            }
        }

        Err(self.not_found(icao))
    }

    fn not_found(&self, icao: &str) -> ChartError {
        ChartError::AirportNotFound {
            icao: icao.to_string(),
            source_id: self.config.id.clone(),
        }
    }
}

/// Airport-page anchors of a menu document, best variant first.
///
/// An anchor qualifies when its href, title or text carries the ICAO code
/// together with an airport-page marker. English variants come first, then
/// the source's primary language, then the rest, each in document order.
pub fn pick_airport_link(
    html: &str,
    icao: &str,
    page_markers: &[String],
    english_markers: &[String],
    primary_language: Option<&str>,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let icao = icao.to_uppercase();
    let page_markers: Vec<String> = page_markers.iter().map(|m| m.to_uppercase()).collect();
    let english: Vec<String> = english_markers.iter().map(|m| m.to_lowercase()).collect();
    let primary = primary_language.map(str::to_lowercase);

    let mut found: Vec<(u8, String)> = document
        .select(&anchors)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let title = a.value().attr("title").unwrap_or("");
            let text = a.text().collect::<Vec<_>>().join(" ");
            let haystack = format!("{} {} {}", href, title, text);

            let upper = haystack.to_uppercase();
            if !upper.contains(&icao) || !page_markers.iter().any(|m| upper.contains(m.as_str())) {
                return None;
            }

            let lower = haystack.to_lowercase();
            let rank = if english.iter().any(|m| lower.contains(m.as_str())) {
                0
            } else if primary.as_deref().is_some_and(|m| lower.contains(m)) {
                1
            } else {
                2
            };
            Some((rank, href.to_string()))
        })
        .collect();

    found.sort_by_key(|(rank, _)| *rank);
    found.into_iter().map(|(_, href)| href).collect()
}
