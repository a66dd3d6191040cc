use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Five-way chart taxonomy. Declaration order is the canonical
/// presentation order used when sorting output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChartCategory {
    General,
    AirportDiagram,
    #[serde(rename = "SID")]
    Sid,
    #[serde(rename = "STAR")]
    Star,
    Approach,
}

impl ChartCategory {
    pub const ALL: [ChartCategory; 5] = [
        ChartCategory::General,
        ChartCategory::AirportDiagram,
        ChartCategory::Sid,
        ChartCategory::Star,
        ChartCategory::Approach,
    ];

    /// Position in the presentation order (General first, Approach last).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Precedence when one name matches several families. Higher wins.
    pub fn specificity(self) -> u8 {
        match self {
            ChartCategory::Sid => 4,
            ChartCategory::Star => 3,
            ChartCategory::Approach => 2,
            ChartCategory::AirportDiagram => 1,
            ChartCategory::General => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartCategory::General => "General",
            ChartCategory::AirportDiagram => "AirportDiagram",
            ChartCategory::Sid => "SID",
            ChartCategory::Star => "STAR",
            ChartCategory::Approach => "Approach",
        }
    }
}

impl fmt::Display for ChartCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The publication that is in force for a source at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationCycle {
    pub source_id: String,
    pub cycle_id: String,
    pub base_url: String,
    pub effective_from: Option<NaiveDate>,
}

/// Name-finding strategies for chart links, applied in source-declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    PairedRow,
    SameRow,
    LinkText,
    Caption,
    Filename,
    StructuredFeed,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStrategy::PairedRow => "paired_row",
            ExtractionStrategy::SameRow => "same_row",
            ExtractionStrategy::LinkText => "link_text",
            ExtractionStrategy::Caption => "caption",
            ExtractionStrategy::Filename => "filename",
            ExtractionStrategy::StructuredFeed => "structured_feed",
        };
        f.write_str(name)
    }
}

/// Where in the document a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRowRef {
    /// Index of the link among all chart links, in document order.
    pub link: usize,
    /// Index of the enclosing table row, when there is one.
    pub row: Option<usize>,
}

impl fmt::Display for SourceRowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "link[{}]/row[{}]", self.link, row),
            None => write!(f, "link[{}]", self.link),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartCandidate {
    pub raw_name: Option<String>,
    pub raw_code: Option<String>,
    pub raw_href: String,
    pub source_row_ref: SourceRowRef,
    pub extraction_strategy: ExtractionStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    pub url: String,
    pub category: ChartCategory,
}

/// Non-fatal findings recorded while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The document was fetched but holds no chart links.
    NoChartsExtracted { document_url: String },
    MalformedUrl { href: String, reason: String },
    SkippedName { name: String, href: String },
    DuplicateUrl { url: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoChartsExtracted { document_url } => {
                write!(f, "no charts found in {}", document_url)
            }
            Diagnostic::MalformedUrl { href, reason } => {
                write!(f, "skipped malformed link '{}': {}", href, reason)
            }
            Diagnostic::SkippedName { name, href } => {
                write!(f, "skipped '{}' ({})", name, href)
            }
            Diagnostic::DuplicateUrl { url } => write!(f, "duplicate chart {}", url),
        }
    }
}

/// Result of one successful resolution.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub icao: String,
    pub source_id: String,
    pub cycle: PublicationCycle,
    pub document_url: String,
    pub charts: Vec<Chart>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChartSet {
    /// Advisory flag: the airport page exists but lists no charts.
    pub fn has_no_charts(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NoChartsExtracted { .. }))
    }

    pub fn by_category(&self) -> BTreeMap<ChartCategory, Vec<Chart>> {
        let mut grouped: BTreeMap<ChartCategory, Vec<Chart>> = BTreeMap::new();
        for chart in &self.charts {
            grouped.entry(chart.category).or_default().push(chart.clone());
        }
        grouped
    }
}

/// Serializable summary handed to API and CLI consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ChartsReport {
    pub icao_code: String,
    pub source: String,
    pub source_name: Option<String>,
    pub cycle: String,
    pub effective_from: Option<NaiveDate>,
    pub document_url: String,
    pub charts: BTreeMap<ChartCategory, Vec<Chart>>,
    pub total_count: usize,
    pub advisories: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ChartsReport {
    pub fn from_chart_set(set: &ChartSet, source_name: Option<&str>) -> Self {
        Self {
            icao_code: set.icao.clone(),
            source: set.source_id.clone(),
            source_name: source_name.map(str::to_string),
            cycle: set.cycle.cycle_id.clone(),
            effective_from: set.cycle.effective_from,
            document_url: set.document_url.clone(),
            charts: set.by_category(),
            total_count: set.charts.len(),
            advisories: set.diagnostics.iter().map(ToString::to_string).collect(),
            fetched_at: Utc::now(),
        }
    }
}
