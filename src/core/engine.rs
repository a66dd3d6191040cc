//! Resolution pipeline: cycle, document, candidates, charts.

use crate::config::source_config::SourceConfig;
use crate::core::classifier::ChartClassifier;
use crate::core::dedupe::dedupe_and_sort;
use crate::core::extractor::{ChartExtractor, ExtractRules};
use crate::core::locator::DocumentLocator;
use crate::core::publication::PublicationResolver;
use crate::core::session::FetchSession;
use crate::core::url_normalizer::{self, decoded_filename};
use crate::domain::model::{Chart, ChartCandidate, ChartSet, Diagnostic};
use crate::domain::ports::Fetcher;
use crate::utils::cancellation::CancellationToken;
use crate::utils::error::{ChartError, Result};
use crate::utils::validation::{normalize_icao, validate_regex};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static LIST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}[.)]\s+").expect("list number regex is valid"));
static ICAO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+[-–]\s*ICAO$").expect("suffix regex is valid"));

/// Shared chart resolution engine.
///
/// Holds no per-resolution state: every call to [`ChartEngine::resolve_charts`]
/// opens its own fetch session, so one engine can serve concurrent
/// resolutions for different sources and airports.
pub struct ChartEngine<F: Fetcher> {
    fetcher: F,
    cancel: CancellationToken,
    today: Option<NaiveDate>,
}

impl<F: Fetcher> ChartEngine<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cancel: CancellationToken::new(),
            today: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pins the date used to decide which publication is in force.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn resolve_charts(&self, config: &SourceConfig, icao: &str) -> Result<ChartSet> {
        let icao = normalize_icao(icao)?;
        let classifier = ChartClassifier::with_overrides(&config.classification)?;
        let rules = ExtractRules::compile(&config.extract, &icao)?;
        let skip_names = config
            .extract
            .skip_names
            .iter()
            .map(|p| validate_regex("extract.skip_names", p))
            .collect::<Result<Vec<_>>>()?;
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());

        tracing::info!("Resolving {} via {}", icao, config.display_name());
        let session = FetchSession::new(&self.fetcher, config.header_pairs(), &self.cancel);

        let cycle = PublicationResolver::new(&session, config, today)
            .resolve()
            .await?;
        let located = DocumentLocator::new(&session, config)
            .locate(&cycle, &icao)
            .await?;

        let (document_url, body) = match located.body {
            Some(body) => (located.url, body),
            None => {
                let response = session.get(&located.url).await?;
                if !response.is_success() {
                    return Err(ChartError::DocumentFetchFailed {
                        url: located.url,
                        reason: format!("HTTP status {}", response.status),
                    });
                }
                (response.final_url, response.body)
            }
        };

        let extraction = ChartExtractor::new(&rules).extract(&body, &document_url);

        let mut diagnostics = Vec::new();
        let charts: Vec<Chart> = extraction
            .candidates
            .into_iter()
            .filter_map(|candidate| {
                build_chart(
                    candidate,
                    &extraction.base_url,
                    &classifier,
                    &skip_names,
                    &mut diagnostics,
                )
            })
            .collect();

        let (charts, duplicates) = dedupe_and_sort(charts);
        diagnostics.extend(duplicates);
        if charts.is_empty() {
            diagnostics.push(Diagnostic::NoChartsExtracted {
                document_url: document_url.clone(),
            });
        }

        tracing::info!(
            "{}: {} charts from cycle {} ({} requests)",
            icao,
            charts.len(),
            cycle.cycle_id,
            session.request_count()
        );
        for diagnostic in &diagnostics {
            tracing::warn!("{}: {}", icao, diagnostic);
        }

        Ok(ChartSet {
            icao,
            source_id: config.id.clone(),
            cycle,
            document_url,
            charts,
            diagnostics,
        })
    }
}

/// Normalizes, names and classifies one candidate. Candidate-local problems
/// become diagnostics and drop only that candidate.
fn build_chart(
    candidate: ChartCandidate,
    base_url: &str,
    classifier: &ChartClassifier,
    skip_names: &[Regex],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Chart> {
    let url = match url_normalizer::normalize(&candidate.raw_href, base_url) {
        Ok(url) => url,
        Err(ChartError::MalformedUrl { href, reason }) => {
            diagnostics.push(Diagnostic::MalformedUrl { href, reason });
            return None;
        }
        Err(e) => {
            diagnostics.push(Diagnostic::MalformedUrl {
                href: candidate.raw_href,
                reason: e.to_string(),
            });
            return None;
        }
    };

    let mut name = candidate
        .raw_name
        .as_deref()
        .map(clean_name)
        .unwrap_or_default();
    if name.is_empty() {
        name = decoded_filename(&url)
            .map(|file| clean_name(&file))
            .unwrap_or_else(|| url.clone());
    }

    if skip_names.iter().any(|re| re.is_match(&name)) {
        diagnostics.push(Diagnostic::SkippedName {
            name,
            href: candidate.raw_href,
        });
        return None;
    }

    let category = classifier.classify(candidate.raw_code.as_deref(), &name);
    tracing::trace!(
        "{} [{}] {} -> {}",
        candidate.source_row_ref,
        candidate.extraction_strategy,
        name,
        category
    );
    Some(Chart {
        name,
        url,
        category,
    })
}

/// Collapses whitespace, drops list numbering and a trailing "- ICAO".
pub fn clean_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let unnumbered = LIST_NUMBER.replace(&collapsed, "");
    ICAO_SUFFIX.replace(&unnumbered, "").trim().to_string()
}
