pub mod correction;
pub mod csv_io;
pub mod etl;
pub mod pipeline;
pub mod resample;
pub mod timezone;

pub use crate::domain::model::{
    BatchReport, ExtractedFiles, ProcessedFile, SourceFile, Table, Value,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
