use crate::domain::model::{BatchReport, ExtractedFiles};
use crate::domain::settings::PipelineSettings;
use crate::utils::error::Result;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn input_files(&self) -> &[String];
    fn output_path(&self) -> &str;
    fn settings(&self) -> Result<PipelineSettings>;
    /// `None` disables the ZIP bundle.
    fn archive_name(&self) -> Option<String>;
    fn write_summary(&self) -> bool;
}

pub trait Pipeline: Send + Sync {
    /// Unreadable inputs are reported per file, not as an error.
    fn extract(&self) -> Result<ExtractedFiles>;
    fn transform(&self, extracted: ExtractedFiles) -> Result<BatchReport>;
    /// Returns the storage paths that were written.
    fn load(&self, report: &BatchReport) -> Result<Vec<String>>;
}
