use crate::core::csv_io::default_archive_name;
use crate::core::ConfigProvider;
use crate::domain::model::{DailyAggregation, DateRange, Granularity};
use crate::domain::settings::{
    parse_timezone, CutoffPolicy, PipelineSettings, DEFAULT_HOURLY_CUTOFF_YEAR, DEFAULT_TIMEZONE,
    MAX_CUTOFF_YEAR, MIN_CUTOFF_YEAR,
};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "purpleair-etl")]
#[command(about = "Clean PurpleAir CSV exports into continuous hourly or daily series")]
pub struct CliConfig {
    /// Input CSV files (comma separated or repeated)
    #[arg(short, long = "input", value_delimiter = ',', required = true)]
    pub input_files: Vec<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_enum, default_value_t = Granularity::Hourly)]
    pub granularity: Granularity,

    /// IANA timezone the series is normalized to
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Bundle all outputs into one ZIP archive
    #[arg(long)]
    pub archive: bool,

    #[arg(long)]
    pub archive_name: Option<String>,

    /// Hourly rows in this year or earlier are dropped
    #[arg(long, default_value_t = DEFAULT_HOURLY_CUTOFF_YEAR)]
    pub hourly_cutoff_year: i32,

    #[arg(long)]
    pub daily_cutoff_year: Option<i32>,

    /// Keep rows from every year
    #[arg(long)]
    pub no_cutoff: bool,

    #[arg(long, value_enum, default_value_t = DailyAggregation::First)]
    pub daily_aggregation: DailyAggregation,

    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Also write processing_summary.json
    #[arg(long)]
    pub summary: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory after each stage")]
    pub monitor: bool,
}

impl CliConfig {
    fn cutoff_policy(&self) -> CutoffPolicy {
        if self.no_cutoff {
            CutoffPolicy::disabled()
        } else {
            CutoffPolicy {
                hourly_min_year_exclusive: Some(self.hourly_cutoff_year),
                daily_min_year_exclusive: self.daily_cutoff_year,
            }
        }
    }

    fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

impl ConfigProvider for CliConfig {
    fn input_files(&self) -> &[String] {
        &self.input_files
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn settings(&self) -> Result<PipelineSettings> {
        let mut settings =
            PipelineSettings::new(self.granularity).with_timezone_name(&self.timezone)?;
        settings.cutoff = self.cutoff_policy();
        settings.daily_aggregation = self.daily_aggregation;
        settings.date_range = self.date_range();
        Ok(settings)
    }

    fn archive_name(&self) -> Option<String> {
        self.archive.then(|| {
            self.archive_name
                .clone()
                .unwrap_or_else(|| default_archive_name(self.granularity))
        })
    }

    fn write_summary(&self) -> bool {
        self.summary
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_list("input", &self.input_files)?;
        validation::validate_file_extensions("input", &self.input_files, &["csv"])?;
        validation::validate_path("output_path", &self.output_path)?;
        parse_timezone(&self.timezone)?;
        validation::validate_range(
            "hourly_cutoff_year",
            self.hourly_cutoff_year,
            MIN_CUTOFF_YEAR,
            MAX_CUTOFF_YEAR,
        )?;
        if let Some(year) = self.daily_cutoff_year {
            validation::validate_range(
                "daily_cutoff_year",
                year,
                MIN_CUTOFF_YEAR,
                MAX_CUTOFF_YEAR,
            )?;
        }
        validation::validate_date_range("start_date/end_date", &self.date_range())?;
        if let Some(name) = &self.archive_name {
            validation::validate_archive_name("archive_name", name)?;
        }
        Ok(())
    }
}
