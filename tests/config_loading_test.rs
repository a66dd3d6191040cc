use aerodrome_charts::config::CycleStrategy;
use aerodrome_charts::domain::model::ExtractionStrategy;
use aerodrome_charts::utils::validation::Validate;
use aerodrome_charts::{ChartError, SourceCatalog, SourceConfig};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_bundled_catalog_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/sources.toml");
    let catalog = SourceCatalog::from_file(path).unwrap();

    catalog.validate().unwrap();
    assert!(catalog.sources().len() >= 5);
    assert_eq!(catalog.route("EETN").unwrap().id, "estonia");
    assert_eq!(catalog.route("evra").unwrap().id, "latvia");
    assert_eq!(catalog.route("WMKK").unwrap().id, "malaysia");
    assert_eq!(catalog.route("LYBE").unwrap().id, "serbia");

    let maldives = catalog.get("maldives").unwrap();
    assert_eq!(
        maldives.extract.strategies,
        vec![ExtractionStrategy::StructuredFeed]
    );
    let finland = catalog.get("finland").unwrap();
    assert!(matches!(
        finland.cycle.strategies[0],
        CycleStrategy::IndexMarker { .. }
    ));
}

#[test]
fn test_catalog_from_temp_file_with_env_substitution() {
    std::env::set_var("CHARTS_TEST_AIP_HOST", "aip.test.example");

    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
[[sources]]
id = "test"
icao_prefixes = ["ZZ"]
url_base = "https://${{CHARTS_TEST_AIP_HOST}}/{{cycle}}/"
[sources.cycle]
[[sources.cycle.strategies]]
kind = "feed"
url = "https://${{CHARTS_TEST_AIP_HOST}}/issues.json"
cycle_field = "id"
[sources.locator]
page_template = "{{base}}{{icao}}.html"
"#
    )
    .unwrap();

    let catalog = SourceCatalog::from_file(temp_file.path()).unwrap();
    catalog.validate().unwrap();

    let source = catalog.route("ZZZZ").unwrap();
    assert_eq!(source.url_base, "https://aip.test.example/{cycle}/");
    match &source.cycle.strategies[0] {
        CycleStrategy::Feed {
            url, date_field, ..
        } => {
            assert_eq!(url, "https://aip.test.example/issues.json");
            assert_eq!(date_field, "effectiveDate");
        }
        other => panic!("unexpected strategy {:?}", other),
    }

    std::env::remove_var("CHARTS_TEST_AIP_HOST");
}

#[test]
fn test_invalid_source_is_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
id = "broken"
url_base = "not a url"
[cycle]
strategies = []
[locator]
page_template = "{{base}}{{icao}}.html"
"#
    )
    .unwrap();

    let config = SourceConfig::from_file(temp_file.path()).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ChartError::InvalidConfigValueError { .. })
    ));
}

#[test]
fn test_missing_catalog_file() {
    let result = SourceCatalog::from_file("/nonexistent/sources.toml");
    assert!(matches!(result, Err(ChartError::IoError(_))));
}

#[test]
fn test_malformed_toml() {
    let result = SourceCatalog::from_toml_str("[[sources]\nid = ");
    assert!(matches!(
        result,
        Err(ChartError::ConfigValidationError { .. })
    ));
}
