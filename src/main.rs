use clap::Parser;
use intern_radar::domain::ports::Storage;
use intern_radar::utils::error::{ErrorSeverity, RadarError};
use intern_radar::utils::output::{render_csv, render_json};
use intern_radar::utils::{logger, validation::Validate};
use intern_radar::{CliArgs, LocalStorage, OutputFormat, RadarConfig, SearchEngine, SearchRequest};
use std::io::Write;

fn load_config(args: &CliArgs) -> Result<RadarConfig, RadarError> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path);
            RadarConfig::from_file(path)?
        }
        None => RadarConfig::default(),
    };
    config.apply_env_overrides()?;
    args.apply_to(&mut config);
    Ok(config)
}

async fn run(args: &CliArgs) -> Result<(), RadarError> {
    args.validate()?;
    let config = load_config(args)?;

    if args.monitor {
        tracing::info!("🔍 System monitoring requested");
    }
    let engine = SearchEngine::from_config(config, args.monitor)?;
    tracing::info!("🧭 Sources: {}", engine.source_names().join(", "));

    let mut request = SearchRequest::new(args.query.clone(), args.profile());
    if let Some(location) = args.location.as_deref() {
        request = request.with_location(location);
    }

    let report = engine.search(&request).await?;
    if report.fallback_used {
        eprintln!("⚠️ No live listings found; showing labeled sample listings instead");
    }

    let body = match args.format {
        OutputFormat::Json => render_json(&report.listings)?,
        OutputFormat::Csv => render_csv(&report.listings)?,
    };

    match args.output.as_deref() {
        Some(path) => {
            LocalStorage::new(".").write_file(path, &body).await?;
            tracing::info!("📁 Wrote {} listings to {}", report.listings.len(), path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);
    tracing::info!("Starting intern-radar");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Search failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}
