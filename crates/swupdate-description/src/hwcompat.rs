//! Hardware-compatibility matching.

use crate::DescriptionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix marking a hardware-compatibility entry as a regular expression.
pub const REGEX_PREFIX: &str = "#RE:";

/// Board name and hardware revision, as in `/etc/hwrevision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwRevision {
    pub board: String,
    pub revision: String,
}

impl FromStr for HwRevision {
    type Err = DescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(board), Some(revision), None) => Ok(Self {
                board: board.to_string(),
                revision: revision.to_string(),
            }),
            _ => Err(DescriptionError::InvalidRevision(s.trim().to_string())),
        }
    }
}

impl fmt::Display for HwRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.board, self.revision)
    }
}

/// Check `revision` against a hardware-compatibility list.
///
/// An empty list accepts any revision. Entries starting with `#RE:` are
/// regular expressions; all others must match exactly.
pub fn is_compatible<S: AsRef<str>>(list: &[S], revision: &str) -> Result<bool, DescriptionError> {
    if list.is_empty() {
        return Ok(true);
    }
    for entry in list {
        let entry = entry.as_ref();
        let matched = match entry.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => Regex::new(pattern)
                .map_err(|source| DescriptionError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?
                .is_match(revision),
            None => entry == revision,
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}
