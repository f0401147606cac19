use crate::core::csv_io::default_archive_name;
use crate::core::ConfigProvider;
use crate::domain::model::{DailyAggregation, DateRange, Granularity};
use crate::domain::settings::{
    parse_timezone, CorrectionCoefficients, CutoffPolicy, PipelineSettings,
    DEFAULT_HOURLY_CUTOFF_YEAR, DEFAULT_TIMEZONE, MAX_CUTOFF_YEAR, MIN_CUTOFF_YEAR,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineInfo,
    pub input: InputConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    pub resample: ResampleConfig,
    pub filter: Option<FilterConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionConfig {
    pub pm25_coefficient: Option<f64>,
    pub humidity_coefficient: Option<f64>,
    pub intercept: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleConfig {
    pub granularity: Granularity,
    pub apply_cutoff: Option<bool>,
    pub hourly_cutoff_year: Option<i32>,
    pub daily_cutoff_year: Option<i32>,
    pub daily_aggregation: Option<DailyAggregation>,
}

/// Dates are quoted strings (`"2024-01-01"`), not TOML date literals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub archive: Option<ArchiveConfig>,
    pub write_summary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timezone_name(&self) -> &str {
        self.normalize
            .timezone
            .as_deref()
            .unwrap_or(DEFAULT_TIMEZONE)
    }

    pub fn granularity(&self) -> Granularity {
        self.resample.granularity
    }

    pub fn correction_coefficients(&self) -> CorrectionCoefficients {
        let defaults = CorrectionCoefficients::default();
        CorrectionCoefficients {
            pm25: self.correction.pm25_coefficient.unwrap_or(defaults.pm25),
            humidity: self.correction.humidity_coefficient.unwrap_or(defaults.humidity),
            intercept: self.correction.intercept.unwrap_or(defaults.intercept),
        }
    }

    pub fn cutoff_policy(&self) -> CutoffPolicy {
        if !self.resample.apply_cutoff.unwrap_or(true) {
            return CutoffPolicy::disabled();
        }
        CutoffPolicy {
            hourly_min_year_exclusive: Some(
                self.resample
                    .hourly_cutoff_year
                    .unwrap_or(DEFAULT_HOURLY_CUTOFF_YEAR),
            ),
            daily_min_year_exclusive: self.resample.daily_cutoff_year,
        }
    }

    pub fn date_range(&self) -> DateRange {
        self.filter
            .as_ref()
            .map(|f| DateRange {
                start: f.start_date,
                end: f.end_date,
            })
            .unwrap_or_default()
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_non_empty_list("input.files", &self.input.files)?;
        validation::validate_file_extensions("input.files", &self.input.files, &["csv"])?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        parse_timezone(self.timezone_name())?;

        let coefficients = self.correction_coefficients();
        validation::validate_finite("correction.pm25_coefficient", coefficients.pm25)?;
        validation::validate_finite("correction.humidity_coefficient", coefficients.humidity)?;
        validation::validate_finite("correction.intercept", coefficients.intercept)?;

        for (field, year) in [
            ("resample.hourly_cutoff_year", self.resample.hourly_cutoff_year),
            ("resample.daily_cutoff_year", self.resample.daily_cutoff_year),
        ] {
            if let Some(year) = year {
                validation::validate_range(field, year, MIN_CUTOFF_YEAR, MAX_CUTOFF_YEAR)?;
            }
        }

        validation::validate_date_range("filter", &self.date_range())?;

        if let Some(ArchiveConfig {
            filename: Some(name),
            ..
        }) = &self.load.archive
        {
            validation::validate_archive_name("load.archive.filename", name)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_files(&self) -> &[String] {
        &self.input.files
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn settings(&self) -> Result<PipelineSettings> {
        let mut settings =
            PipelineSettings::new(self.granularity()).with_timezone_name(self.timezone_name())?;
        settings.correction = self.correction_coefficients();
        settings.cutoff = self.cutoff_policy();
        settings.daily_aggregation = self.resample.daily_aggregation.unwrap_or_default();
        settings.date_range = self.date_range();
        Ok(settings)
    }

    fn archive_name(&self) -> Option<String> {
        let archive = self.load.archive.as_ref().filter(|a| a.enabled)?;
        Some(
            archive
                .filename
                .clone()
                .unwrap_or_else(|| default_archive_name(self.granularity())),
        )
    }

    fn write_summary(&self) -> bool {
        self.load.write_summary.unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
