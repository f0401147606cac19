use crate::core::Pipeline;
use crate::domain::model::BatchReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug)]
pub struct RunSummary {
    pub report: BatchReport,
    pub written: Vec<String>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting ETL process...");

        tracing::info!("Extracting data...");
        let extracted = self.pipeline.extract()?;
        tracing::info!(
            "Extracted {} files ({} unreadable)",
            extracted.files.len(),
            extracted.failures.len()
        );
        self.monitor.log_stats("extract");

        tracing::info!("Transforming data...");
        let report = self.pipeline.transform(extracted)?;
        tracing::info!(
            "Transformed {} files ({} failed)",
            report.processed.len(),
            report.failures.len()
        );
        self.monitor.log_stats("transform");

        tracing::info!("Loading data...");
        let written = self.pipeline.load(&report)?;
        tracing::info!("Wrote {} outputs", written.len());
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(RunSummary { report, written })
    }
}
