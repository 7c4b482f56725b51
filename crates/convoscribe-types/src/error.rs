use thiserror::Error;

/// Errors from reading timestamped log records off disk.
///
/// The engine itself never fails; these belong to the input adapters that
/// turn files into `LogLine`s.
#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("io error: {0}")]
    Io(String),

    #[error("invalid record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("invalid timestamp on line {line}: '{value}'")]
    InvalidTimestamp { line: usize, value: String },
}

impl From<std::io::Error> for LogSourceError {
    fn from(err: std::io::Error) -> Self {
        LogSourceError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timestamp_display() {
        let err = LogSourceError::InvalidTimestamp {
            line: 3,
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "invalid timestamp on line 3: 'yesterday'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LogSourceError = io.into();
        assert!(err.to_string().contains("gone"));
    }
}
