use crate::core::csv_io::{build_archive, output_name, read_table, write_table};
use crate::core::{correction, resample, timezone};
use crate::domain::model::{
    BatchReport, ExtractedFiles, FileFailure, PipelineWarning, ProcessedFile, SourceFile, Table,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::domain::settings::PipelineSettings;
use crate::utils::error::Result;
use serde::Serialize;

/// Cleaned table plus the non-fatal conditions met on the way.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub table: Table,
    pub warnings: Vec<PipelineWarning>,
}

/// Runs normalize -> correct -> resample on an already ingested table.
pub fn clean_table(table: Table, settings: &PipelineSettings) -> Result<CleanedTable> {
    let mut table = table;
    let mut warnings = Vec::new();

    if table.is_empty() {
        warnings.push(PipelineWarning::EmptyInput);
    }

    timezone::normalize_in_place(&mut table, &settings.timezone)?;
    correction::correct_in_place(&mut table, &settings.correction)?;

    let resampled = resample::resample(&table, settings)?;
    warnings.extend(resampled.warnings);

    Ok(CleanedTable {
        table: resampled.table,
        warnings,
    })
}

/// Ingests, cleans and serializes one uploaded file.
pub fn process_file(file: &SourceFile, settings: &PipelineSettings) -> Result<ProcessedFile> {
    let table = read_table(&file.bytes)?;
    let input_rows = table.len();
    tracing::debug!("📥 {}: read {} rows", file.name, input_rows);

    let cleaned = clean_table(table, settings)?;
    for warning in &cleaned.warnings {
        tracing::warn!("⚠️ {}: {}", file.name, warning);
    }

    let csv = write_table(&cleaned.table)?;
    Ok(ProcessedFile {
        source_name: file.name.clone(),
        output_name: output_name(file.stem(), settings.granularity),
        input_rows,
        table: cleaned.table,
        csv,
        warnings: cleaned.warnings,
    })
}

/// Processes every file independently; one bad file never aborts the others.
pub fn process_batch(files: &[SourceFile], settings: &PipelineSettings) -> BatchReport {
    let mut report = BatchReport {
        granularity: Some(settings.granularity),
        ..Default::default()
    };

    for file in files {
        match process_file(file, settings) {
            Ok(processed) => {
                tracing::info!(
                    "✅ {} -> {} ({} rows in, {} rows out)",
                    file.name,
                    processed.output_name,
                    processed.input_rows,
                    processed.table.len()
                );
                report.processed.push(processed);
            }
            Err(error) => {
                tracing::error!("❌ {} failed: {}", file.name, error);
                report.failures.push(FileFailure {
                    file_name: file.name.clone(),
                    error,
                });
            }
        }
    }

    report
}

#[derive(Debug, Serialize)]
pub struct ProcessingSummary {
    pub granularity: Option<String>,
    pub files: Vec<FileSummary>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub source: String,
    pub output: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub source: String,
    pub error: String,
}

impl From<&BatchReport> for ProcessingSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            granularity: report.granularity.map(|g| g.to_string()),
            files: report
                .processed
                .iter()
                .map(|f| FileSummary {
                    source: f.source_name.clone(),
                    output: f.output_name.clone(),
                    input_rows: f.input_rows,
                    output_rows: f.table.len(),
                    warnings: f.warnings.clone(),
                })
                .collect(),
            failures: report
                .failures
                .iter()
                .map(|f| FailureSummary {
                    source: f.file_name.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

pub const SUMMARY_FILE: &str = "processing_summary.json";

pub struct AirQualityPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AirQualityPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for AirQualityPipeline<S, C> {
    fn extract(&self) -> Result<ExtractedFiles> {
        let mut extracted = ExtractedFiles::default();
        for path in self.config.input_files() {
            tracing::debug!("Reading input file: {}", path);
            match self.storage.read_file(path) {
                Ok(bytes) => extracted.files.push(SourceFile::new(path.clone(), bytes)),
                Err(error) => {
                    tracing::error!("❌ {} unreadable: {}", path, error);
                    extracted.failures.push(FileFailure {
                        file_name: path.clone(),
                        error,
                    });
                }
            }
        }
        Ok(extracted)
    }

    fn transform(&self, extracted: ExtractedFiles) -> Result<BatchReport> {
        let settings = self.config.settings()?;
        let mut report = process_batch(&extracted.files, &settings);

        // 讀取失敗的檔案排在前面
        let mut failures = extracted.failures;
        failures.append(&mut report.failures);
        report.failures = failures;
        Ok(report)
    }

    fn load(&self, report: &BatchReport) -> Result<Vec<String>> {
        let mut written = Vec::new();

        for file in &report.processed {
            self.storage
                .write_file(&file.output_name, file.csv.as_bytes())?;
            written.push(file.output_name.clone());
        }

        if let Some(archive_name) = self.config.archive_name() {
            if report.processed.is_empty() {
                tracing::warn!("No processed files, skipping archive {}", archive_name);
            } else {
                let zip_data = build_archive(&report.processed)?;
                tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
                self.storage.write_file(&archive_name, &zip_data)?;
                written.push(archive_name);
            }
        }

        if self.config.write_summary() {
            let summary = ProcessingSummary::from(report);
            let json = serde_json::to_string_pretty(&summary)?;
            self.storage.write_file(SUMMARY_FILE, json.as_bytes())?;
            written.push(SUMMARY_FILE.to_string());
        }

        Ok(written)
    }
}
