pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{cli::LocalStorage, toml_config::TomlConfig};

pub use crate::core::{
    correction::correct,
    etl::{EtlEngine, RunSummary},
    pipeline::{clean_table, process_batch, process_file, AirQualityPipeline},
    resample::{resample, resample_daily, resample_hourly},
    timezone::normalize,
};
pub use crate::domain::model::{Granularity, SourceFile, Table, Value};
pub use crate::domain::settings::PipelineSettings;
pub use crate::utils::error::{EtlError, Result};
