//! Timestamped log record source.
//!
//! The engine takes timestamps from its caller, never from line text. This
//! adapter is that caller for files on disk: each non-blank line is either a
//! JSON object
//!
//! ```text
//! {"timestamp": "2025-03-01T10:00:01Z", "text": "...", "session_id": "..."}
//! ```
//!
//! or plain text led by a timestamp, either RFC 3339 or the logger-style
//! `2025-03-01 10:00:01.123` (read as UTC).

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use convoscribe_types::error::LogSourceError;
use convoscribe_types::log::LogLine;
use serde::Deserialize;

const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Deserialize)]
struct JsonRecord {
    timestamp: String,
    text: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Lines read from one source, plus how many records were rejected.
#[derive(Debug, Clone, Default)]
pub struct LogBatch {
    pub lines: Vec<LogLine>,
    pub skipped: usize,
}

/// Read every record in `path`.
///
/// Unreadable files are an error; individual malformed records are logged
/// and counted in [`LogBatch::skipped`].
pub async fn read_log_lines(path: &Path) -> Result<LogBatch, LogSourceError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut batch = LogBatch::default();

    for (idx, text) in content.lines().enumerate() {
        match parse_log_record(idx + 1, text) {
            Ok(Some(line)) => batch.lines.push(line),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping log record");
                batch.skipped += 1;
            }
        }
    }

    tracing::debug!(
        path = %path.display(),
        lines = batch.lines.len(),
        skipped = batch.skipped,
        "Read log records"
    );
    Ok(batch)
}

/// Parse one record. Blank lines yield `Ok(None)`.
///
/// `line` is the 1-based line number, used only for error reporting.
pub fn parse_log_record(line: usize, text: &str) -> Result<Option<LogLine>, LogSourceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with('{') {
        let record: JsonRecord =
            serde_json::from_str(trimmed).map_err(|e| LogSourceError::InvalidRecord {
                line,
                reason: e.to_string(),
            })?;
        let timestamp = parse_timestamp(line, &record.timestamp)?;
        return Ok(Some(LogLine {
            session_id: record.session_id,
            timestamp,
            raw_text: record.text,
        }));
    }

    let (token, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
    if let Ok(ts) = DateTime::parse_from_rfc3339(token) {
        return Ok(Some(LogLine::new(ts.with_timezone(&Utc), rest.trim_start())));
    }

    match NaiveDateTime::parse_and_remainder(trimmed, NAIVE_FORMAT) {
        Ok((naive, rest)) => Ok(Some(LogLine::new(naive.and_utc(), rest.trim_start()))),
        Err(_) => Err(LogSourceError::InvalidTimestamp {
            line,
            value: token.to_owned(),
        }),
    }
}

fn parse_timestamp(line: usize, value: &str) -> Result<DateTime<Utc>, LogSourceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(value, NAIVE_FORMAT).map(|n| n.and_utc()))
        .map_err(|_| LogSourceError::InvalidTimestamp {
            line,
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 1).unwrap()
    }

    #[test]
    fn test_parses_json_record() {
        let text = r#"{"timestamp": "2025-03-01T10:00:01Z", "text": "Generating TTS [Hi]", "session_id": "abc"}"#;
        let line = parse_log_record(1, text).unwrap().unwrap();
        assert_eq!(line.timestamp, t0());
        assert_eq!(line.raw_text, "Generating TTS [Hi]");
        assert_eq!(line.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parses_rfc3339_prefix() {
        let line = parse_log_record(1, "2025-03-01T15:30:01+05:30 Generating TTS [Hi]")
            .unwrap()
            .unwrap();
        assert_eq!(line.timestamp, t0());
        assert_eq!(line.raw_text, "Generating TTS [Hi]");
        assert!(line.session_id.is_none());
    }

    #[test]
    fn test_parses_logger_style_prefix() {
        let line = parse_log_record(1, "2025-03-01 10:00:01.250 | DEBUG | context [")
            .unwrap()
            .unwrap();
        assert_eq!(line.timestamp, t0() + chrono::Duration::milliseconds(250));
        assert_eq!(line.raw_text, "| DEBUG | context [");
    }

    #[test]
    fn test_blank_line_is_none() {
        assert!(parse_log_record(1, "   ").unwrap().is_none());
    }

    #[test]
    fn test_bad_timestamp_is_reported() {
        let err = parse_log_record(7, "yesterday Generating TTS [Hi]").unwrap_err();
        assert!(matches!(
            err,
            LogSourceError::InvalidTimestamp { line: 7, ref value } if value == "yesterday"
        ));
    }

    #[test]
    fn test_bad_json_is_reported() {
        let err = parse_log_record(2, r#"{"text": "missing timestamp"}"#).unwrap_err();
        assert!(matches!(err, LogSourceError::InvalidRecord { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_read_log_lines_skips_bad_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipeline.log");
        tokio::fs::write(
            &path,
            "2025-03-01T10:00:01Z first\n\nnot-a-time second\n2025-03-01T10:00:02Z third\n",
        )
        .await
        .unwrap();

        let batch = read_log_lines(&path).await.unwrap();
        assert_eq!(batch.skipped, 1);
        let texts: Vec<&str> = batch.lines.iter().map(|l| l.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_read_log_lines_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = read_log_lines(&tmp.path().join("missing.log")).await;
        assert!(matches!(result, Err(LogSourceError::Io(_))));
    }
}
