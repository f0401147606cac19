use clap::Parser;
use purpleair_etl::core::ConfigProvider;
use purpleair_etl::utils::error::ErrorSeverity;
use purpleair_etl::utils::{logger, validation::Validate};
use purpleair_etl::{AirQualityPipeline, EtlEngine, Granularity, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "PurpleAir cleaning pipeline driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "purpleair-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override granularity from config
    #[arg(long, value_enum)]
    granularity: Option<Granularity>,

    /// Show what would be processed without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, config.json_logs());
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(granularity) = args.granularity {
        config.resample.granularity = granularity;
        tracing::info!("🔧 Granularity overridden to: {}", granularity);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config)?;

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = AirQualityPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run() {
        Ok(summary) => {
            for path in &summary.written {
                println!("📁 {}", path);
            }
            for failure in &summary.report.failures {
                eprintln!("❌ {}: {}", failure.file_name, failure.error);
                eprintln!("💡 建議: {}", failure.error.recovery_suggestion());
            }
            if summary.report.has_failures() {
                std::process::exit(1);
            }
            println!("✅ ETL process completed successfully!");
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) -> anyhow::Result<()> {
    let settings = config.settings()?;

    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        tracing::info!("  Description: {}", description);
    }
    tracing::info!("  Input files: {}", config.input_files().len());
    tracing::info!("  Granularity: {}", settings.granularity);
    tracing::info!("  Timezone: {}", settings.timezone.name());
    tracing::info!(
        "  Correction: {} * pm2.5_atm - {} * humidity + {}",
        settings.correction.pm25,
        settings.correction.humidity,
        settings.correction.intercept
    );
    match settings.cutoff_year() {
        Some(year) => tracing::info!("  Year cutoff: rows in {} or earlier dropped", year),
        None => tracing::info!("  Year cutoff: none"),
    }
    tracing::info!("  Output: {}", config.output_path());
    if let Some(archive) = config.archive_name() {
        tracing::info!("  Archive: {}", archive);
    }
    Ok(())
}

fn perform_dry_run(config: &TomlConfig) {
    let granularity = config.granularity();
    for path in config.input_files() {
        let exists = std::path::Path::new(path).exists();
        let stem = path
            .rsplit(['/', '\\'])
            .next()
            .and_then(|name| name.split('.').next())
            .unwrap_or(path);
        tracing::info!(
            "  {} {} -> {}",
            if exists { "✅" } else { "❌ (missing)" },
            path,
            purpleair_etl::core::csv_io::output_name(stem, granularity)
        );
    }
}
