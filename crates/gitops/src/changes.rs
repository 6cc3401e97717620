//! Parser for the change list produced by the diff step.
//!
//! One entry per line, status letter first:
//! ```text
//! M uchicago/values.yaml
//! A mwt2-squid/values.yaml
//! D retired-site/values.yaml
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Change status reported by the diff producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    /// `M`
    Modified,
    /// `A`
    Added,
    /// `D`
    Deleted,
}

impl ChangeStatus {
    /// Parse a status token. Only single-letter `M`, `A` and `D` are accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Self::Modified),
            "A" => Some(Self::Added),
            "D" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The status letter.
    pub fn code(&self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// How the file changed.
    pub status: ChangeStatus,
    /// Path relative to the repository root.
    pub path: String,
}

impl ChangeRecord {
    /// Convenience constructor.
    pub fn new(status: ChangeStatus, path: impl Into<String>) -> Self {
        Self {
            status,
            path: path.into(),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.path)
    }
}

/// One non-blank line of the change list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeLine {
    /// A well-formed entry.
    Record(ChangeRecord),
    /// A path preceded by a status the system does not know.
    UnknownStatus {
        /// 1-based line number.
        line: usize,
        /// Status token as written.
        status: String,
        /// Path that followed it.
        path: String,
    },
    /// A line without a path.
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Line content.
        content: String,
    },
}

/// Parse change list text. Blank lines are dropped.
pub fn parse_change_list(content: &str) -> Vec<ChangeLine> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_line(line.trim(), idx + 1))
        .collect()
}

/// Read and parse a change list file.
pub fn read_change_list(path: &Path) -> Result<Vec<ChangeLine>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ChangeList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_change_list(&content))
}

fn parse_line(line: &str, line_num: usize) -> ChangeLine {
    let (status, path) = match line.split_once(char::is_whitespace) {
        Some((s, p)) if !p.trim().is_empty() => (s, p.trim()),
        _ => {
            return ChangeLine::Malformed {
                line: line_num,
                content: line.to_string(),
            };
        }
    };

    match ChangeStatus::from_code(status) {
        Some(status) => ChangeLine::Record(ChangeRecord::new(status, path)),
        None => ChangeLine::UnknownStatus {
            line: line_num,
            status: status.to_string(),
            path: path.to_string(),
        },
    }
}
