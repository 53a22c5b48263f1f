//! Subtitle entries and consistency checks

use crate::timecode::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One subtitle unit.
///
/// The serialized field names match what the transcription service
/// exchanges: `{index, startTime, endTime, text}` with `HH:MM:SS,mmm` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleEntry {
    /// 1-based sequence number
    #[serde(default)]
    pub index: usize,

    pub start_time: Timestamp,

    pub end_time: Timestamp,

    pub text: String,
}

impl SubtitleEntry {
    pub fn new<S: Into<String>>(index: usize, start: Timestamp, end: Timestamp, text: S) -> Self {
        Self {
            index,
            start_time: start,
            end_time: end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.end_time.saturating_sub(self.start_time))
    }

    /// Whether the entry is on screen at `ts` (start inclusive, end exclusive).
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start_time && ts < self.end_time
    }
}

/// Rewrite every index so that it equals position + 1.
pub fn renumber(entries: &mut [SubtitleEntry]) {
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.index = i + 1;
    }
}

/// A consistency problem found by [`check`]. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    InvertedTiming { position: usize },
    EmptyText { position: usize },
    Overlap { position: usize, previous_end: Timestamp },
    OutOfOrder { position: usize },
    IndexMismatch { position: usize, index: usize },
}

impl Issue {
    pub fn position(&self) -> usize {
        match self {
            Issue::InvertedTiming { position }
            | Issue::EmptyText { position }
            | Issue::Overlap { position, .. }
            | Issue::OutOfOrder { position }
            | Issue::IndexMismatch { position, .. } => *position,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::InvertedTiming { position } => {
                write!(f, "entry {}: start is not before end", position)
            }
            Issue::EmptyText { position } => write!(f, "entry {}: text is empty", position),
            Issue::Overlap {
                position,
                previous_end,
            } => write!(
                f,
                "entry {}: starts before the previous entry ends at {}",
                position, previous_end
            ),
            Issue::OutOfOrder { position } => {
                write!(f, "entry {}: starts before the previous entry", position)
            }
            Issue::IndexMismatch { position, index } => {
                write!(f, "entry {}: numbered {}", position, index)
            }
        }
    }
}

/// Lint a subtitle list.
pub fn check(entries: &[SubtitleEntry]) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let position = i + 1;

        if entry.index != position {
            issues.push(Issue::IndexMismatch {
                position,
                index: entry.index,
            });
        }
        if entry.start_time >= entry.end_time {
            issues.push(Issue::InvertedTiming { position });
        }
        if entry.text.trim().is_empty() {
            issues.push(Issue::EmptyText { position });
        }
        if let Some(previous) = i.checked_sub(1).map(|p| &entries[p]) {
            if entry.start_time < previous.start_time {
                issues.push(Issue::OutOfOrder { position });
            } else if entry.start_time < previous.end_time {
                issues.push(Issue::Overlap {
                    position,
                    previous_end: previous.end_time,
                });
            }
        }
    }

    issues
}
