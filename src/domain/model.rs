use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TIME_STAMP: &str = "time_stamp";
pub const PM25_ATM: &str = "pm2.5_atm";
pub const HUMIDITY: &str = "humidity";
pub const PM25_CORR: &str = "pm2.5_corr";

/// A single cell. Ingested cells stay `Text` until a stage needs them typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Timestamp(DateTime<Tz>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell; unparseable text and NaN read as missing.
    pub fn as_f64(&self) -> Option<f64> {
        let number = match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Null | Value::Timestamp(_) => None,
        };
        number.filter(|n| !n.is_nan())
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Tz>> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// CSV rendering: nulls become empty fields.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            // `{:?}` keeps the trailing `.0` on whole floats
            Value::Number(n) => format!("{:?}", n),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Ordered rows sharing one column schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| EtlError::SchemaError {
            column: name.to_string(),
        })
    }

    /// Returns the index of `name`, appending an all-null column when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }

    /// Suffix appended to the uploaded file's stem for each output entry.
    pub fn output_suffix(&self) -> String {
        format!("_processed_data_{}.csv", self.as_str())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How rows landing in the same daily slot are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DailyAggregation {
    #[default]
    First,
    Mean,
}

/// Inclusive range of local calendar dates kept after resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// One uploaded file as handed over by the caller.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Name up to the first `.`, used to derive output entry names.
    pub fn stem(&self) -> &str {
        let file_name = self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name);
        file_name.split('.').next().unwrap_or(file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The file had a header but no data rows.
    EmptyInput,
    /// Rows without a usable time_stamp could not be placed on the grid.
    UntimedRows { count: usize },
    /// Hourly rows between grid instants were dropped.
    OffGridRows { count: usize },
    /// Rows sharing a grid slot with an earlier row were dropped or aggregated.
    DuplicateSlots { count: usize },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::EmptyInput => write!(f, "input has no data rows"),
            PipelineWarning::UntimedRows { count } => {
                write!(f, "{} rows without time_stamp skipped", count)
            }
            PipelineWarning::OffGridRows { count } => {
                write!(f, "{} rows between hourly grid instants dropped", count)
            }
            PipelineWarning::DuplicateSlots { count } => {
                write!(f, "{} rows collapsed into an earlier grid slot", count)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub source_name: String,
    pub output_name: String,
    pub input_rows: usize,
    pub table: Table,
    pub csv: String,
    pub warnings: Vec<PipelineWarning>,
}

/// Files read by the extract stage, plus the ones that could not be read.
#[derive(Debug, Default)]
pub struct ExtractedFiles {
    pub files: Vec<SourceFile>,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: EtlError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub granularity: Option<Granularity>,
    pub processed: Vec<ProcessedFile>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
