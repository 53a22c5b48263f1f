//! SubRip (SRT) reading and writing

use crate::error::{Result, SubtitleError};
use crate::subtitle::SubtitleEntry;
use crate::timecode::Timestamp;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs;
use tracing::{debug, warn};

fn block_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("block separator pattern is valid"))
}

fn timing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\S+)\s*-->\s*(\S+)").expect("timing line pattern is valid")
    })
}

/// Parse SRT text into entries.
///
/// Blocks without a `-->` line are skipped. The index line is optional; an
/// entry without one gets its position in the file.
pub fn parse_srt(input: &str) -> Result<Vec<SubtitleEntry>> {
    let normalized = input
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut entries = Vec::new();

    for (block_no, block) in block_separator().split(normalized.trim()).enumerate() {
        let lines: Vec<&str> = block.lines().collect();
        let Some(timing_pos) = lines.iter().position(|line| line.contains("-->")) else {
            if !block.trim().is_empty() {
                warn!("Skipping SRT block {} without a timing line", block_no + 1);
            }
            continue;
        };

        let caps = timing_line().captures(lines[timing_pos]).ok_or_else(|| {
            SubtitleError::Parse(format!(
                "block {}: malformed timing line '{}'",
                block_no + 1,
                lines[timing_pos]
            ))
        })?;

        let start_time = caps[1].parse::<Timestamp>().map_err(|e| {
            SubtitleError::Parse(format!("block {}: start time: {}", block_no + 1, e))
        })?;
        let end_time = caps[2].parse::<Timestamp>().map_err(|e| {
            SubtitleError::Parse(format!("block {}: end time: {}", block_no + 1, e))
        })?;

        let index = lines[..timing_pos]
            .iter()
            .rev()
            .find_map(|line| line.trim().parse::<usize>().ok())
            .unwrap_or(entries.len() + 1);

        let text = lines[timing_pos + 1..]
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        entries.push(SubtitleEntry {
            index,
            start_time,
            end_time,
            text: text.trim().to_string(),
        });
    }

    debug!("Parsed {} SRT entries", entries.len());
    Ok(entries)
}

/// Format entries as SRT, keeping each entry's own index.
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                entry.index, entry.start_time, entry.end_time, entry.text
            )
        })
        .collect()
}

/// Read and parse an SRT file
pub async fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        SubtitleError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.display(), e),
        ))
    })?;
    parse_srt(&content)
}

/// Write entries to an SRT file
pub async fn write_srt_file<P: AsRef<Path>>(path: P, entries: &[SubtitleEntry]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_srt(entries)).await?;
    debug!("Wrote {} entries to {:?}", entries.len(), path);
    Ok(())
}
