//! Maps chart names and codes onto the five-way taxonomy.
//!
//! Tier 1 looks for standardized chart codes (`SID`, `IAC`, `ADC`, ...).
//! Tier 2 looks for keyword families in the fixed order
//! SID > STAR > Approach > AirportDiagram. Anything else is `General`.
//! Matching is done on whole words of the uppercased `code + name` text.

use crate::config::source_config::ClassificationOverrides;
use crate::domain::model::ChartCategory;
use crate::utils::error::{ChartError, Result};
use std::collections::HashMap;

const CODE_TABLE: &[(&str, ChartCategory)] = &[
    ("SID", ChartCategory::Sid),
    ("SIDS", ChartCategory::Sid),
    ("DP", ChartCategory::Sid),
    ("STAR", ChartCategory::Star),
    ("STARS", ChartCategory::Star),
    ("IAC", ChartCategory::Approach),
    ("IAP", ChartCategory::Approach),
    ("APP", ChartCategory::Approach),
    ("VAC", ChartCategory::Approach),
    ("FASDB", ChartCategory::Approach),
    ("ADC", ChartCategory::AirportDiagram),
    ("APDC", ChartCategory::AirportDiagram),
    ("AGMC", ChartCategory::AirportDiagram),
    ("GMC", ChartCategory::AirportDiagram),
    ("AOC", ChartCategory::General),
    ("PATC", ChartCategory::General),
    ("MSA", ChartCategory::General),
    ("ATCSMAC", ChartCategory::General),
];

const SID_KEYWORDS: &[&str] = &[
    "DEPARTURE",
    "STANDARD DEPARTURE",
    "OMNIDIRECTIONAL DEPARTURE",
    "SIDR",
];

const STAR_KEYWORDS: &[&str] = &["ARRIVAL", "STANDARD ARRIVAL", "TERMINAL ARRIVAL"];

const APPROACH_KEYWORDS: &[&str] = &[
    "APPROACH", "ILS", "LOC", "VOR", "NDB", "RNP", "RNAV", "GNSS", "GPS", "GLS", "DME", "TACAN",
    "VISUAL", "LPV", "CIRCLING",
];

const DIAGRAM_KEYWORDS: &[&str] = &[
    "AERODROME CHART",
    "AIRPORT CHART",
    "AIRPORT DIAGRAM",
    "GROUND MOVEMENT",
    "TAXI",
    "TAXIWAY",
    "TAXI ROUTE",
    "PARKING",
    "DOCKING",
    "APRON",
    "HOT SPOT",
    "HOT SPOTS",
    "LAHSO",
];

/// Keyword families in the order they are tested.
const FAMILY_ORDER: [ChartCategory; 4] = [
    ChartCategory::Sid,
    ChartCategory::Star,
    ChartCategory::Approach,
    ChartCategory::AirportDiagram,
];

#[derive(Debug, Clone)]
pub struct ChartClassifier {
    codes: HashMap<String, ChartCategory>,
    families: Vec<(ChartCategory, Vec<String>)>,
}

impl Default for ChartClassifier {
    fn default() -> Self {
        let codes = CODE_TABLE
            .iter()
            .map(|(code, category)| (code.to_string(), *category))
            .collect();
        let families = FAMILY_ORDER
            .iter()
            .map(|category| {
                let words = builtin_keywords(*category)
                    .iter()
                    .map(|k| fold(k))
                    .collect();
                (*category, words)
            })
            .collect();
        Self { codes, families }
    }
}

fn builtin_keywords(category: ChartCategory) -> &'static [&'static str] {
    match category {
        ChartCategory::Sid => SID_KEYWORDS,
        ChartCategory::Star => STAR_KEYWORDS,
        ChartCategory::Approach => APPROACH_KEYWORDS,
        ChartCategory::AirportDiagram => DIAGRAM_KEYWORDS,
        ChartCategory::General => &[],
    }
}

impl ChartClassifier {
    /// Builds a classifier with per-source additions.
    ///
    /// Overrides may add keywords and codes but cannot redefine a built-in
    /// code, move a built-in keyword to another family, nor map a code to a
    /// less specific category than any family whose keywords contain that
    /// word. Codes are checked before keywords when classifying, so such a
    /// code would otherwise demote every chart named with that keyword.
    pub fn with_overrides(overrides: &ClassificationOverrides) -> Result<Self> {
        let mut classifier = Self::default();

        let additions = [
            (ChartCategory::Sid, &overrides.sid_keywords),
            (ChartCategory::Star, &overrides.star_keywords),
            (ChartCategory::Approach, &overrides.approach_keywords),
            (ChartCategory::AirportDiagram, &overrides.diagram_keywords),
        ];
        for (category, keywords) in additions {
            for keyword in keywords {
                let folded = fold(keyword);
                if folded.is_empty() {
                    return Err(override_error(keyword, "empty keyword"));
                }
                if let Some(owner) = classifier.builtin_family_of(&folded) {
                    if owner != category {
                        return Err(override_error(
                            keyword,
                            &format!("already belongs to the {} family", owner),
                        ));
                    }
                }
                if let Some((_, words)) = classifier.families.iter_mut().find(|(c, _)| *c == category)
                {
                    words.push(folded);
                }
            }
        }

        for (code, category) in &overrides.codes {
            let folded = fold(code);
            if folded.is_empty() {
                return Err(override_error(code, "empty chart code"));
            }
            if let Some(existing) = classifier.codes.get(&folded) {
                if existing != category {
                    return Err(override_error(code, "redefines a built-in chart code"));
                }
                continue;
            }
            if let Some(owner) = classifier.most_specific_family_using(&folded) {
                if category.specificity() < owner.specificity() {
                    return Err(override_error(
                        code,
                        &format!("would demote {} keywords to {}", owner, category),
                    ));
                }
            }
            classifier.codes.insert(folded, *category);
        }

        Ok(classifier)
    }

    /// Total and deterministic: the same `(code, name)` always yields the
    /// same category, and unknown input falls back to `General`.
    pub fn classify(&self, code: Option<&str>, name: &str) -> ChartCategory {
        let text = fold(&format!("{} {}", code.unwrap_or(""), name));
        if text.is_empty() {
            return ChartCategory::General;
        }

        let by_code = text
            .split(' ')
            .filter_map(|token| self.codes.get(token))
            .max_by_key(|category| category.specificity());
        if let Some(category) = by_code {
            return *category;
        }

        let padded = format!(" {} ", text);
        for (category, words) in &self.families {
            if words.iter().any(|w| padded.contains(&format!(" {} ", w))) {
                return *category;
            }
        }

        ChartCategory::General
    }

    /// Most specific keyword family with a keyword containing any word of
    /// `folded` as a whole word.
    fn most_specific_family_using(&self, folded: &str) -> Option<ChartCategory> {
        let tokens: Vec<&str> = folded.split(' ').collect();
        self.families
            .iter()
            .filter(|(_, words)| {
                words
                    .iter()
                    .any(|w| w.split(' ').any(|part| tokens.contains(&part)))
            })
            .map(|(category, _)| *category)
            .max_by_key(|category| category.specificity())
    }

    fn builtin_family_of(&self, folded: &str) -> Option<ChartCategory> {
        FAMILY_ORDER
            .into_iter()
            .find(|category| builtin_keywords(*category).iter().any(|k| fold(k) == folded))
    }
}

/// Uppercases and turns every run of non-alphanumerics into one space.
fn fold(text: &str) -> String {
    text.to_uppercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn override_error(value: &str, reason: &str) -> ChartError {
    ChartError::InvalidConfigValueError {
        field: "classification".to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
