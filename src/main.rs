use clap::Parser;
use purpleair_etl::core::ConfigProvider;
use purpleair_etl::utils::error::ErrorSeverity;
use purpleair_etl::utils::{logger, validation::Validate};
use purpleair_etl::{AirQualityPipeline, CliConfig, EtlEngine, LocalStorage};

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting purpleair-etl ({} mode)", config.granularity);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let output_path = config.output_path().to_string();
    let pipeline = AirQualityPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run() {
        Ok(summary) => {
            for path in &summary.written {
                println!("📁 {}/{}", output_path, path);
            }
            for failure in &summary.report.failures {
                eprintln!(
                    "❌ {}: {}",
                    failure.file_name,
                    failure.error.user_friendly_message()
                );
                eprintln!("💡 建議: {}", failure.error.recovery_suggestion());
            }

            if summary.report.has_failures() {
                tracing::warn!(
                    "{} of {} files failed",
                    summary.report.failures.len(),
                    summary.report.failures.len() + summary.report.processed.len()
                );
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
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            std::process::exit(exit_code);
        }
    }
}
