use crate::domain::model::{Chart, Diagnostic};
use std::collections::HashSet;

/// Keeps the first chart per URL and returns the dropped duplicates as
/// diagnostics.
pub fn dedupe(charts: Vec<Chart>) -> (Vec<Chart>, Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(charts.len());
    let mut diagnostics = Vec::new();

    for chart in charts {
        if seen.insert(chart.url.clone()) {
            kept.push(chart);
        } else {
            diagnostics.push(Diagnostic::DuplicateUrl { url: chart.url });
        }
    }
    (kept, diagnostics)
}

/// Canonical order: category rank, then name. The sort is stable, so equal
/// keys keep extraction order.
pub fn sort_charts(charts: &mut [Chart]) {
    charts.sort_by(|a, b| {
        a.category
            .rank()
            .cmp(&b.category.rank())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn dedupe_and_sort(charts: Vec<Chart>) -> (Vec<Chart>, Vec<Diagnostic>) {
    let (mut kept, diagnostics) = dedupe(charts);
    sort_charts(&mut kept);
    (kept, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ChartCategory;

    fn chart(name: &str, url: &str, category: ChartCategory) -> Chart {
        Chart {
            name: name.to_string(),
            url: url.to_string(),
            category,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let charts = vec![
            chart("ILS RWY09", "https://x/a.pdf", ChartCategory::Approach),
            chart("Aerodrome", "https://x/b.pdf", ChartCategory::AirportDiagram),
            chart("Something else", "https://x/a.pdf", ChartCategory::General),
        ];
        let (kept, diagnostics) = dedupe(charts);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "ILS RWY09");
        assert_eq!(kept[0].category, ChartCategory::Approach);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::DuplicateUrl {
                url: "https://x/a.pdf".to_string()
            }]
        );
    }

    #[test]
    fn test_canonical_order() {
        let charts = vec![
            chart("ILS RWY09", "https://x/1.pdf", ChartCategory::Approach),
            chart("STAR RWY27", "https://x/2.pdf", ChartCategory::Star),
            chart("sid RWY27", "https://x/3.pdf", ChartCategory::Sid),
            chart("SID RWY09", "https://x/4.pdf", ChartCategory::Sid),
            chart("Bird hazard", "https://x/5.pdf", ChartCategory::General),
            chart("ADC", "https://x/6.pdf", ChartCategory::AirportDiagram),
        ];
        let (sorted, _) = dedupe_and_sort(charts);
        let names: Vec<&str> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Bird hazard", "ADC", "SID RWY09", "sid RWY27", "STAR RWY27", "ILS RWY09"]
        );
    }

    #[test]
    fn test_dropping_items_keeps_relative_order() {
        let charts = vec![
            chart("B", "https://x/b.pdf", ChartCategory::Sid),
            chart("A", "https://x/a.pdf", ChartCategory::Sid),
            chart("C", "https://x/c.pdf", ChartCategory::Approach),
        ];
        let (full, _) = dedupe_and_sort(charts.clone());
        let (partial, _) = dedupe_and_sort(vec![charts[0].clone(), charts[2].clone()]);

        let full_names: Vec<&str> = full
            .iter()
            .filter(|c| c.name != "A")
            .map(|c| c.name.as_str())
            .collect();
        let partial_names: Vec<&str> = partial.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(full_names, partial_names);
    }
}
