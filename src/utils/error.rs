use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cannot parse time_stamp at row {row}: '{value}'")]
    TimestampParseError { row: usize, value: String },

    #[error("Required column '{column}' is missing")]
    SchemaError { column: String },

    #[error("Unknown timezone: {name}")]
    UnknownTimezoneError { name: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Schema,
    Configuration,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::TimestampParseError { .. } | EtlError::CsvError(_) => ErrorCategory::Input,
            EtlError::SchemaError { .. } => ErrorCategory::Schema,
            EtlError::UnknownTimezoneError { .. }
            | EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Storage,
            EtlError::SerializationError(_) => ErrorCategory::Processing,
        }
    }

    /// 單一檔案的讀取或輸入問題只影響該檔案，設定或寫出錯誤則會中止整個執行
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Schema => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::TimestampParseError { .. } => {
                "Check that time_stamp values use ISO-8601 (e.g. 2024-01-01T05:00:00Z)".to_string()
            }
            EtlError::SchemaError { column } => format!(
                "Make sure the CSV header contains '{}' (expected columns: time_stamp, pm2.5_atm, humidity)",
                column
            ),
            EtlError::CsvError(_) => {
                "Verify the file is a comma separated export with a single header row".to_string()
            }
            EtlError::UnknownTimezoneError { .. } => {
                "Use an IANA timezone name such as America/New_York".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Review the command line flags or the TOML configuration file".to_string()
            }
            EtlError::IoError(_) | EtlError::ZipError(_) => {
                "Check that the input files exist and the output directory is writable".to_string()
            }
            EtlError::SerializationError(_) => {
                "Re-run with --verbose to see which stage failed".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::TimestampParseError { row, value } => {
                format!("Row {} has an unreadable timestamp: '{}'", row, value)
            }
            EtlError::SchemaError { column } => {
                format!("The file has no '{}' column", column)
            }
            EtlError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_high_severity() {
        let err = EtlError::TimestampParseError {
            row: 3,
            value: "yesterday".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("yesterday"));
    }

    #[test]
    fn test_schema_error_names_column() {
        let err = EtlError::SchemaError {
            column: "humidity".to_string(),
        };
        assert_eq!(err.to_string(), "Required column 'humidity' is missing");
        assert!(err.recovery_suggestion().contains("humidity"));
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::UnknownTimezoneError {
            name: "Mars/Olympus".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
