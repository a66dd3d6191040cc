use aerodrome_charts::adapters::output;
use aerodrome_charts::utils::error::ErrorSeverity;
use aerodrome_charts::utils::{logger, validation::Validate};
use aerodrome_charts::{ChartEngine, ChartError, ChartSet, CliConfig, HttpFetcher, SourceCatalog};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting aerodrome-charts CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        report_failure(None, &e);
        std::process::exit(exit_code(e.severity()));
    }

    let catalog = SourceCatalog::from_file(&config.sources)
        .with_context(|| format!("loading source catalog {}", config.sources))?;
    if let Err(e) = catalog.validate() {
        report_failure(None, &e);
        std::process::exit(exit_code(e.severity()));
    }
    tracing::info!("📋 Loaded {} sources from {}", catalog.sources().len(), config.sources);

    if config.list_sources {
        for source in catalog.sources() {
            println!(
                "{:<16} {:<32} {}",
                source.id,
                source.display_name(),
                source.icao_prefixes.join(",")
            );
        }
        return Ok(());
    }

    let fetcher = HttpFetcher::new(config.timeout).context("building HTTP client")?;
    let engine = Arc::new(ChartEngine::new(fetcher));

    // Ctrl-C 取消進行中的解析
    let cancel = engine.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel("interrupted");
        }
    });

    // 每個機場一個任務，各自擁有自己的 fetch session
    let mut tasks = Vec::new();
    for (icao, source) in config.plan(&catalog) {
        let engine = Arc::clone(&engine);
        let source = source.cloned();
        tasks.push((
            icao.clone(),
            tokio::spawn(async move {
                let source = source?;
                let set = engine.resolve_charts(&source, &icao).await?;
                Ok::<_, ChartError>((set, source.name.clone()))
            }),
        ));
    }

    let mut worst: Option<ErrorSeverity> = None;
    for (icao, task) in tasks {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                tracing::error!("❌ {} task failed: {}", icao, join_error);
                worst = worst.max(Some(ErrorSeverity::Critical));
                continue;
            }
        };

        let failure = emit(&icao, outcome, |set, source_name| {
            output::render(set, source_name, config.format)
        });
        worst = worst.max(failure);
    }

    if let Some(severity) = worst {
        let code = exit_code(severity);
        if code > 0 {
            std::process::exit(code);
        }
    }

    tracing::info!("✅ Done");
    Ok(())
}

// 輸出單一機場的結果；失敗只影響該機場
fn emit<R>(
    icao: &str,
    outcome: Result<(ChartSet, Option<String>), ChartError>,
    render: R,
) -> Option<ErrorSeverity>
where
    R: Fn(&ChartSet, Option<&str>) -> Result<String, ChartError>,
{
    let (set, source_name) = match outcome {
        Ok(resolved) => resolved,
        Err(e) => {
            report_failure(Some(icao), &e);
            return Some(e.severity());
        }
    };

    if set.has_no_charts() {
        tracing::warn!("⚠️ {}: airport page lists no charts", icao);
    }
    match render(&set, source_name.as_deref()) {
        Ok(text) => {
            println!("{}", text);
            None
        }
        Err(e) => {
            report_failure(Some(icao), &e);
            Some(e.severity())
        }
    }
}

fn report_failure(icao: Option<&str>, e: &ChartError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {}{} (Category: {:?}, Severity: {:?})",
        icao.map(|i| format!("{}: ", i)).unwrap_or_default(),
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    match icao {
        Some(icao) => eprintln!("❌ {}: {}", icao, e.user_friendly_message()),
        None => eprintln!("❌ {}", e.user_friendly_message()),
    }
    eprintln!("💡 {}", e.recovery_suggestion());
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 可重試錯誤
        ErrorSeverity::High => 1,     // 解析錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}
