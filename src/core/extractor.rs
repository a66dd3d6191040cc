//! Turns an airport document into raw chart candidates.
//!
//! Every strategy shares one contract: given a chart link and its place in
//! the document, return a name or nothing. For each link the source's
//! strategies are tried in declared order and the first one that names it
//! produces the candidate. Links no strategy can name are not candidates.

use crate::config::source_config::ExtractConfig;
use crate::core::url_normalizer::decoded_filename;
use crate::domain::model::{ChartCandidate, ExtractionStrategy, SourceRowRef};
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::validate_regex;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static BASE: LazyLock<Selector> = LazyLock::new(|| selector("base[href]"));
static CAPTIONS: LazyLock<Selector> = LazyLock::new(|| {
    selector("figcaption, caption, .Figure-title, .figure-title, .caption")
});
static GENERIC_LINK_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\[(]?\s*(?:pdf|view|open|download|chart|link|file|document|here|click here|see chart)\s*[\])]?(?:\s*\(.*\))?$",
    )
    .expect("generic link text regex is valid")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Compiled extraction settings for one source and airport.
#[derive(Debug)]
pub struct ExtractRules {
    icao: String,
    strategies: Vec<ExtractionStrategy>,
    link_pattern: Regex,
    require_icao_in_href: bool,
    filename_strip: Vec<Regex>,
    title_selector: Selector,
    titles_and_links: Selector,
}

impl ExtractRules {
    pub fn compile(config: &ExtractConfig, icao: &str) -> Result<Self> {
        let bad_selector = || ChartError::InvalidConfigValueError {
            field: "extract.title_selector".to_string(),
            value: config.title_selector.clone(),
            reason: "Invalid CSS selector".to_string(),
        };
        let title_selector = Selector::parse(&config.title_selector).map_err(|_| bad_selector())?;
        let titles_and_links = Selector::parse(&format!("{}, a[href]", config.title_selector))
            .map_err(|_| bad_selector())?;

        Ok(Self {
            icao: icao.to_uppercase(),
            strategies: config.strategies.clone(),
            link_pattern: validate_regex("extract.link_pattern", &config.link_pattern)?,
            require_icao_in_href: config.require_icao_in_href,
            filename_strip: config
                .filename_strip
                .iter()
                .map(|p| validate_regex("extract.filename_strip", p))
                .collect::<Result<_>>()?,
            title_selector,
            titles_and_links,
        })
    }

    fn icao_ok(&self, href: &str) -> bool {
        !self.require_icao_in_href || href.to_uppercase().contains(&self.icao)
    }

    fn is_chart_href(&self, href: &str) -> bool {
        self.link_pattern.is_match(href) && self.icao_ok(href)
    }

    fn starts_with_icao(&self, title: &str) -> bool {
        title.trim_start().to_uppercase().starts_with(&self.icao)
    }
}

/// Candidates plus the base URL their hrefs are relative to.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub base_url: String,
    pub candidates: Vec<ChartCandidate>,
}

/// One chart link and its surroundings.
struct LinkSite<'a> {
    anchor: ElementRef<'a>,
    href: String,
    row: Option<ElementRef<'a>>,
    position: SourceRowRef,
    preceding_title: Option<String>,
}

struct Naming {
    name: String,
    code: Option<String>,
}

pub struct ChartExtractor<'a> {
    rules: &'a ExtractRules,
}

impl<'a> ChartExtractor<'a> {
    pub fn new(rules: &'a ExtractRules) -> Self {
        Self { rules }
    }

    /// Never fails: a document without chart links yields no candidates.
    pub fn extract(&self, body: &[u8], document_url: &str) -> Extraction {
        let text = String::from_utf8_lossy(body);

        if self.rules.strategies.contains(&ExtractionStrategy::StructuredFeed) {
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(feed) = serde_json::from_str::<Value>(trimmed) {
                    return Extraction {
                        base_url: document_url.to_string(),
                        candidates: self.feed_candidates(&feed),
                    };
                }
            }
        }

        let document = Html::parse_document(&text);
        let base_url = base_href(&document, document_url);
        let sites = self.link_sites(&document);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for site in &sites {
            if !seen.insert(site.href.clone()) {
                continue;
            }
            let named = self
                .rules
                .strategies
                .iter()
                .find_map(|strategy| self.apply(*strategy, site).map(|n| (*strategy, n)));
            if let Some((strategy, naming)) = named {
                candidates.push(ChartCandidate {
                    raw_name: Some(naming.name),
                    raw_code: naming.code,
                    raw_href: site.href.clone(),
                    source_row_ref: site.position,
                    extraction_strategy: strategy,
                });
            } else {
                tracing::debug!("no strategy named {} ({})", site.href, site.position);
            }
        }

        tracing::debug!(
            "{}: {} chart links, {} candidates",
            document_url,
            sites.len(),
            candidates.len()
        );
        Extraction {
            base_url,
            candidates,
        }
    }

    fn link_sites<'d>(&self, document: &'d Html) -> Vec<LinkSite<'d>> {
        let rows: Vec<ElementRef> = document.select(&ROWS).collect();
        let mut sites = Vec::new();
        let mut current_title: Option<String> = None;

        for el in document.select(&self.rules.titles_and_links) {
            let href = match el.value().attr("href") {
                Some(href) if el.value().name() == "a" => href.trim(),
                _ => {
                    if self.rules.title_selector.matches(&el) {
                        current_title = Some(collapse(&text_of(el)));
                    }
                    continue;
                }
            };
            if !self.rules.is_chart_href(href) {
                continue;
            }

            let row = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "tr");
            let row_index = row.and_then(|r| rows.iter().position(|x| x.id() == r.id()));

            sites.push(LinkSite {
                anchor: el,
                href: href.to_string(),
                row,
                position: SourceRowRef {
                    link: sites.len(),
                    row: row_index,
                },
                preceding_title: current_title.clone(),
            });
        }
        sites
    }

    fn apply(&self, strategy: ExtractionStrategy, site: &LinkSite) -> Option<Naming> {
        match strategy {
            ExtractionStrategy::PairedRow => self.paired_row(site),
            ExtractionStrategy::SameRow => same_row(site),
            ExtractionStrategy::LinkText => link_text(site),
            ExtractionStrategy::Caption => caption(site),
            ExtractionStrategy::Filename => self.filename(site),
            ExtractionStrategy::StructuredFeed => self.structured_title(site),
        }
    }

    /// Name sits in the first cell of the row above a link-only row.
    fn paired_row(&self, site: &LinkSite) -> Option<Naming> {
        let row = site.row?;
        if row_label(row).is_some() {
            return None;
        }
        let previous = row
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "tr")?;
        let has_chart_link = previous.select(&ANCHORS).any(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| self.rules.is_chart_href(href.trim()))
        });
        if has_chart_link {
            return None;
        }
        let cell = cells(previous).next()?;
        named(&text_of(cell))
    }

    fn filename(&self, site: &LinkSite) -> Option<Naming> {
        let file = decoded_filename(&site.href)?;
        let stem = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem.to_string(),
            _ => file,
        };
        let stripped = self
            .rules
            .filename_strip
            .iter()
            .fold(stem.clone(), |acc, re| re.replace_all(&acc, "").into_owned());
        named(&stripped.replace('_', " ")).or_else(|| named(&stem.replace('_', " ")))
    }

    fn structured_title(&self, site: &LinkSite) -> Option<Naming> {
        let title = site.preceding_title.as_deref()?;
        if !self.rules.starts_with_icao(title) {
            return None;
        }
        named(title)
    }

    fn feed_candidates(&self, feed: &Value) -> Vec<ChartCandidate> {
        let mut entries = Vec::new();
        self.walk_feed(feed, false, &mut entries);

        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(_, href, _)| seen.insert(href.clone()))
            .enumerate()
            .map(|(index, (name, href, code))| ChartCandidate {
                raw_name: Some(name),
                raw_code: code,
                raw_href: href,
                source_row_ref: SourceRowRef {
                    link: index,
                    row: None,
                },
                extraction_strategy: ExtractionStrategy::StructuredFeed,
            })
            .collect()
    }

    /// Collects `(title, href, code)` from entries under this airport. An
    /// entry belongs to the airport when it, or an enclosing entry or key,
    /// is titled with the ICAO code.
    fn walk_feed(
        &self,
        value: &Value,
        in_airport: bool,
        out: &mut Vec<(String, String, Option<String>)>,
    ) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.walk_feed(item, in_airport, out);
                }
            }
            Value::Object(map) => {
                let field = |keys: &[&str]| {
                    keys.iter()
                        .find_map(|k| map.get(*k).and_then(Value::as_str))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                };
                let title = field(&["title", "name"]);
                let here = in_airport || title.is_some_and(|t| self.rules.starts_with_icao(t));

                if let (Some(title), Some(href)) = (title, field(&["url", "href", "link"])) {
                    if here && self.rules.icao_ok(href) {
                        out.push((
                            collapse(title),
                            href.to_string(),
                            field(&["code", "type"]).map(str::to_string),
                        ));
                    }
                }

                for (key, child) in map {
                    if child.is_array() || child.is_object() {
                        let keyed = key.eq_ignore_ascii_case(&self.rules.icao);
                        self.walk_feed(child, here || keyed, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// First non-link, non-URL cell of the link's own row.
fn same_row(site: &LinkSite) -> Option<Naming> {
    row_label(site.row?)
}

fn row_label(row: ElementRef) -> Option<Naming> {
    cells(row)
        .filter(|cell| cell.select(&ANCHORS).next().is_none())
        .map(|cell| collapse(&text_of(cell)))
        .find(|text| !text.is_empty() && !looks_like_url(text))
        .map(|name| Naming { name, code: None })
}

/// The anchor's own text, unless it is a generic label ("PDF", "view") or
/// just repeats the file name.
fn link_text(site: &LinkSite) -> Option<Naming> {
    let text = collapse(&text_of(site.anchor));
    if looks_like_url(&text) || is_generic_label(&text) || is_bare_filename(&text, &site.href) {
        return None;
    }
    named(&text)
}

fn is_generic_label(text: &str) -> bool {
    text.chars().filter(|c| c.is_alphanumeric()).count() < 2 || GENERIC_LINK_TEXT.is_match(text)
}

fn is_bare_filename(text: &str, href: &str) -> bool {
    let Some(file) = decoded_filename(href) else {
        return false;
    };
    let stem = file.rsplit_once('.').map_or(file.as_str(), |(stem, _)| stem);
    text.eq_ignore_ascii_case(&file) || text.eq_ignore_ascii_case(stem)
}

/// Caption of the closest figure-like container: `<figure>`, an element
/// whose class mentions "figure", or a captioned table.
fn caption(site: &LinkSite) -> Option<Naming> {
    site.anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|e| {
            matches!(e.value().name(), "figure" | "table")
                || e.value()
                    .classes()
                    .any(|c| c.to_ascii_lowercase().contains("figure"))
        })
        .find_map(|container| {
            container
                .select(&CAPTIONS)
                .find_map(|cap| named(&text_of(cap)))
        })
}

fn cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
}

fn base_href(document: &Html, document_url: &str) -> String {
    document
        .select(&BASE)
        .next()
        .and_then(|b| b.value().attr("href"))
        .and_then(|href| {
            url::Url::parse(document_url)
                .and_then(|doc| doc.join(href.trim()))
                .ok()
        })
        .map(|u| u.to_string())
        .unwrap_or_else(|| document_url.to_string())
}

fn named(text: &str) -> Option<Naming> {
    let name = collapse(text);
    (!name.is_empty()).then_some(Naming { name, code: None })
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("www.")
        || lower.ends_with(".pdf")
}
