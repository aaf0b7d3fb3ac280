//! AuditLogger - Append-only record of package operations
//!
//! Features:
//! - One line per completed or failed operation
//! - File and parent directory created on first use
//! - Open, append, close on every write; no handle is kept between records
//! - Exclusive advisory lock around each append so concurrent writers never
//!   interleave partial lines
//! - Best effort: write failures are logged and swallowed

use crate::core::config::FkConfig;
use crate::core::traits::{ExecutionResult, Operation, OperationKind};
use chrono::{DateTime, SecondsFormat, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Longest outcome summary kept in a record, in characters
const MAX_SUMMARY_CHARS: usize = 240;

/// Separator used when a multi-line value is flattened onto one line
const LINE_JOINER: &str = " | ";

/// One audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub outcome: String,
}

impl AuditRecord {
    /// Describe the result of an operation
    pub fn for_result(operation: &Operation, result: &ExecutionResult) -> Self {
        let success = result.is_success();
        let description = match (operation.kind(), success) {
            (OperationKind::Install, true) => "Package installed",
            (OperationKind::Install, false) => "Error installing package",
            (OperationKind::Remove, true) => "Package removed",
            (OperationKind::Remove, false) => "Error removing package",
            (OperationKind::Update, true) => "System updated",
            (OperationKind::Update, false) => "Error updating system",
            (OperationKind::Search, true) => "Search completed",
            (OperationKind::Search, false) => "Error searching packages",
        };

        let text = result.text();
        let last_line = text.lines().map(str::trim).rev().find(|l| !l.is_empty());

        let mut parts: Vec<&str> = Vec::new();
        if let Some(target) = operation.target().filter(|t| !t.is_empty()) {
            parts.push(target);
        }
        if let Some(line) = last_line {
            parts.push(line);
        }

        let outcome = if parts.is_empty() {
            (if success { "ok" } else { "failed" }).to_string()
        } else {
            truncate_chars(&parts.join(" - "), MAX_SUMMARY_CHARS)
        };

        Self {
            timestamp: Utc::now(),
            description: description.to_string(),
            outcome,
        }
    }

    /// `<RFC 3339 timestamp> <description>: <outcome>`
    pub fn to_line(&self) -> String {
        format!(
            "{} {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.description,
            self.outcome
        )
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}

/// Collapse a value onto a single line
fn flatten(line: &str) -> String {
    line.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(LINE_JOINER)
}

/// Append-only audit log writer
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    /// Create a logger writing to `path`
    ///
    /// Nothing is touched on disk until the first record.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &FkConfig) -> Self {
        Self::new(config.audit_log_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline
    ///
    /// Embedded newlines are flattened so one call always yields one line.
    /// Never fails: problems are reported through `tracing` only.
    pub async fn record(&self, line: &str) {
        let path = self.path.clone();
        let line = flatten(line);

        match tokio::task::spawn_blocking(move || append_line(&path, &line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to write audit record");
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "audit writer task failed");
            }
        }
    }

    /// Append the record describing an operation's result
    pub async fn record_result(&self, operation: &Operation, result: &ExecutionResult) {
        let record = AuditRecord::for_result(operation, result);
        self.record(&record.to_line()).await;
    }

    /// Last `count` lines of the log, oldest first
    ///
    /// A missing log reads as empty.
    pub async fn tail(&self, count: usize) -> anyhow::Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(count);
        Ok(lines.into_iter().skip(skip).collect())
    }
}

/// Open, lock, append one complete line, and close
fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    FileExt::lock_exclusive(&file)?;

    let mut buffer = Vec::with_capacity(line.len() + 1);
    buffer.extend_from_slice(line.as_bytes());
    buffer.push(b'\n');

    let written = file.write_all(&buffer).and_then(|()| file.flush());
    let unlocked = FileExt::unlock(&file);
    written.and(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{Backend, FailureCause};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_creates_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("share").join("fkinstall.log");
        let logger = AuditLogger::new(&path);

        logger.record("first entry").await;
        logger.record("second entry").await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first entry\nsecond entry\n");
    }

    #[tokio::test]
    async fn test_record_flattens_multiline_values() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("audit.log"));

        logger.record("line one\nline two\n").await;

        let lines = logger.tail(10).await.unwrap();
        assert_eq!(lines, vec!["line one | line two"]);
    }

    #[tokio::test]
    async fn test_record_never_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let logger = AuditLogger::new(blocker.join("audit.log"));
        logger.record("ignored").await;

        assert!(!blocker.join("audit.log").exists());
    }

    #[tokio::test]
    async fn test_concurrent_records_stay_intact() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::new(dir.path().join("audit.log")));
        let payload = "x".repeat(8192);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let logger = Arc::clone(&logger);
                let line = format!("{i:02} {payload}");
                tokio::spawn(async move { logger.record(&line).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let lines = logger.tail(100).await.unwrap();
        assert_eq!(lines.len(), 16);
        for line in lines {
            assert_eq!(line.len(), 3 + payload.len());
            assert!(line.ends_with(&payload));
        }
    }

    #[tokio::test]
    async fn test_tail_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("missing.log"));
        assert!(logger.tail(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("audit.log"));
        for i in 0..5 {
            logger.record(&format!("entry {i}")).await;
        }

        assert_eq!(logger.tail(2).await.unwrap(), vec!["entry 3", "entry 4"]);
    }

    #[test]
    fn test_record_for_successful_install() {
        let op = Operation::install("vim", Backend::Alternate);
        let result = ExecutionResult::success(b"resolving...\ninstalling vim...\n\n".to_vec());

        let record = AuditRecord::for_result(&op, &result);
        assert_eq!(record.description, "Package installed");
        assert_eq!(record.outcome, "vim - installing vim...");
        assert!(record.to_line().contains(" Package installed: vim - installing vim..."));
    }

    #[test]
    fn test_record_for_failed_update() {
        let op = Operation::update(Backend::Primary);
        let result = ExecutionResult::failure(
            b"Sorry, try again.\nsudo: 3 incorrect password attempts\n".to_vec(),
            FailureCause::NonZeroExit { code: Some(1) },
        );

        let record = AuditRecord::for_result(&op, &result);
        assert_eq!(record.description, "Error updating system");
        assert_eq!(record.outcome, "sudo: 3 incorrect password attempts");
    }

    #[test]
    fn test_record_without_details() {
        let op = Operation::update(Backend::Alternate);
        let record = AuditRecord::for_result(&op, &ExecutionResult::success(Vec::new()));
        assert_eq!(record.outcome, "ok");
        assert!(!record.to_line().contains('\n'));
    }

    #[test]
    fn test_summary_is_truncated() {
        let long = "y".repeat(1000);
        let op = Operation::remove("vim");
        let result = ExecutionResult::success(long.into_bytes());

        let record = AuditRecord::for_result(&op, &result);
        assert_eq!(record.outcome.chars().count(), MAX_SUMMARY_CHARS + 3);
        assert!(record.outcome.ends_with("..."));
    }
}
