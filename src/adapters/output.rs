use crate::domain::model::{ChartSet, ChartsReport};
use crate::utils::error::{ChartError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

pub fn render(set: &ChartSet, source_name: Option<&str>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(set, source_name)),
        OutputFormat::Json => render_json(set, source_name),
        OutputFormat::Csv => render_csv(set),
    }
}

pub fn render_json(set: &ChartSet, source_name: Option<&str>) -> Result<String> {
    let report = ChartsReport::from_chart_set(set, source_name);
    Ok(serde_json::to_string_pretty(&report)?)
}

/// `category,name,url`, one row per chart in canonical order.
pub fn render_csv(set: &ChartSet) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["category", "name", "url"])?;
    for chart in &set.charts {
        writer.write_record([chart.category.label(), chart.name.as_str(), chart.url.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|e| ChartError::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn render_table(set: &ChartSet, source_name: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} | {} | cycle {} | {} charts",
        set.icao,
        source_name.unwrap_or(&set.source_id),
        set.cycle.cycle_id,
        set.charts.len()
    );

    for (category, charts) in set.by_category() {
        let _ = writeln!(out, "\n{} ({})", category, charts.len());
        for chart in charts {
            let _ = writeln!(out, "  {:<48} {}", chart.name, chart.url);
        }
    }

    for diagnostic in &set.diagnostics {
        let _ = writeln!(out, "! {}", diagnostic);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Chart, ChartCategory, Diagnostic, PublicationCycle};

    fn sample() -> ChartSet {
        ChartSet {
            icao: "EVRA".to_string(),
            source_id: "latvia".to_string(),
            cycle: PublicationCycle {
                source_id: "latvia".to_string(),
                cycle_id: "2026-01-22".to_string(),
                base_url: "https://ais.example.lv/2026-01-22/".to_string(),
                effective_from: None,
            },
            document_url: "https://ais.example.lv/2026-01-22/EVRA.html".to_string(),
            charts: vec![
                Chart {
                    name: "Aerodrome Chart, ICAO".to_string(),
                    url: "https://ais.example.lv/adc.pdf".to_string(),
                    category: ChartCategory::AirportDiagram,
                },
                Chart {
                    name: "ILS RWY 18".to_string(),
                    url: "https://ais.example.lv/ils18.pdf".to_string(),
                    category: ChartCategory::Approach,
                },
            ],
            diagnostics: vec![Diagnostic::DuplicateUrl {
                url: "https://ais.example.lv/adc.pdf".to_string(),
            }],
        }
    }

    #[test]
    fn test_csv_quotes_names() {
        let csv = render_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "category,name,url");
        assert_eq!(
            lines[1],
            "AirportDiagram,\"Aerodrome Chart, ICAO\",https://ais.example.lv/adc.pdf"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_json_report_groups_by_category() {
        let json = render(&sample(), Some("LGS Latvia"), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["icao_code"], "EVRA");
        assert_eq!(value["source_name"], "LGS Latvia");
        assert_eq!(value["total_count"], 2);
        assert_eq!(value["charts"]["Approach"][0]["name"], "ILS RWY 18");
        assert_eq!(value["advisories"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_table_lists_categories_and_advisories() {
        let table = render_table(&sample(), None);
        assert!(table.starts_with("EVRA | latvia | cycle 2026-01-22 | 2 charts"));
        assert!(table.contains("AirportDiagram (1)"));
        assert!(table.contains("! duplicate chart https://ais.example.lv/adc.pdf"));
    }
}
