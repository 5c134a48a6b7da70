// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Append-only audit log.
//!
//! Every action the adoption engine takes lands here as one timestamped line:
//!
//! ```text
//! 2025-11-02T17:40:11Z ADOPTED .zshrc -> zsh
//! 2025-11-02T17:40:11Z SENSITIVE .ssh left untouched
//! ```
//!
//! The log is advisory, not authoritative state. It is never mutated or
//! truncated programmatically; `status` only counts keywords and shows a
//! recent tail.

use chrono::{SecondsFormat, Utc};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Keyword categorizing an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuditKind {
    Adopted,
    Sensitive,
    Skipped,
    Info,
    Warn,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adopted => "ADOPTED",
            Self::Sensitive => "SENSITIVE",
            Self::Skipped => "SKIPPED",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        }
    }

    pub fn all() -> &'static [AuditKind] {
        &[
            Self::Adopted,
            Self::Sensitive,
            Self::Skipped,
            Self::Info,
            Self::Warn,
        ]
    }
}

impl Display for AuditKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// One appended audit record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub kind: AuditKind,
    pub path: String,
    pub package: Option<String>,
}

impl AuditEntry {
    fn now(kind: AuditKind, path: impl Into<String>, package: Option<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            kind,
            path: path.into(),
            package,
        }
    }
}

impl Display for AuditEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match &self.package {
            Some(package) => write!(
                fmt,
                "{} {} {} -> {}",
                self.timestamp, self.kind, self.path, package
            ),
            None => write!(fmt, "{} {} {}", self.timestamp, self.kind, self.path),
        }
    }
}

/// Keyword counts over the whole log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub adopted: usize,
    pub sensitive: usize,
    pub skipped: usize,
    pub info: usize,
    pub warn: usize,
}

/// Handle to the append-only log file.
#[derive(Clone, Debug)]
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Open the audit log, creating its parent directory if needed.
    ///
    /// The log file itself is created on first append.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Append`] if the parent directory cannot be
    ///   created.
    pub fn open(log_path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent() {
            mkdirp::mkdirp(parent).map_err(|err| AuditError::Append {
                source: err,
                log_path: log_path.clone(),
            })?;
        }

        Ok(Self { log_path })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Append`] if the line cannot be written.
    pub fn append(
        &self,
        kind: AuditKind,
        path: impl Into<String>,
        package: Option<String>,
    ) -> Result<AuditEntry> {
        let entry = AuditEntry::now(kind, path, package);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|err| AuditError::Append {
                source: err,
                log_path: self.log_path.clone(),
            })?;
        writeln!(file, "{entry}").map_err(|err| AuditError::Append {
            source: err,
            log_path: self.log_path.clone(),
        })?;

        Ok(entry)
    }

    /// Count entries per keyword over the whole log.
    ///
    /// A log that does not exist yet reads as all zero.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Read`] if the log exists but cannot be read.
    pub fn summary(&self) -> Result<AuditSummary> {
        let mut summary = AuditSummary::default();
        for line in self.lines()? {
            let keyword = line.split_whitespace().nth(1);
            match keyword {
                Some("ADOPTED") => summary.adopted += 1,
                Some("SENSITIVE") => summary.sensitive += 1,
                Some("SKIPPED") => summary.skipped += 1,
                Some("INFO") => summary.info += 1,
                Some("WARN") => summary.warn += 1,
                _ => continue,
            }
        }

        Ok(summary)
    }

    /// Last `count` lines of the log, oldest first.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Read`] if the log exists but cannot be read.
    pub fn tail(&self, count: usize) -> Result<Vec<String>> {
        let lines = self.lines()?;
        let skip = lines.len().saturating_sub(count);

        Ok(lines.into_iter().skip(skip).collect())
    }

    fn lines(&self) -> Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        read_to_string(&self.log_path)
            .map_err(|err| AuditError::Read {
                source: err,
                log_path: self.log_path.clone(),
            })
            .map(|content| content.lines().map(str::to_owned).collect())
    }
}

/// Audit log error types.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Log line cannot be appended.
    #[error("failed to append to audit log at {:?}", log_path.display())]
    Append {
        #[source]
        source: std::io::Error,
        log_path: PathBuf,
    },

    /// Log cannot be read back.
    #[error("failed to read audit log at {:?}", log_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        log_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = AuditError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_then_summarize_and_tail() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::open(tmp.path().join("state/audit.log")).unwrap();

        log.append(AuditKind::Adopted, ".zshrc", Some("zsh".into())).unwrap();
        log.append(AuditKind::Sensitive, ".ssh", None).unwrap();
        log.append(AuditKind::Adopted, ".vimrc", Some("vim".into())).unwrap();
        log.append(AuditKind::Warn, ".junk", None).unwrap();

        let summary = log.summary().unwrap();
        assert_eq!(summary.adopted, 2);
        assert_eq!(summary.sensitive, 1);
        assert_eq!(summary.warn, 1);
        assert_eq!(summary.skipped, 0);

        let tail = log.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail[0].contains("ADOPTED .vimrc -> vim"));
        assert!(tail[1].contains("WARN .junk"));
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::open(tmp.path().join("audit.log")).unwrap();

        assert_eq!(log.summary().unwrap(), AuditSummary::default());
        assert!(log.tail(10).unwrap().is_empty());
    }
}
