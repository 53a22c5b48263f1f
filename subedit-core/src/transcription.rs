//! The transcription/translation service seam

use crate::{
    audio::AudioClip,
    error::{Result, SubtitleError},
    subtitle::{renumber, SubtitleEntry},
    timecode::TimeRange,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// An external service that turns audio into subtitles and translates them
#[async_trait]
pub trait SubtitleService: Send + Sync {
    /// Transcribe `audio`, limited to `range` when given. Timestamps are
    /// absolute positions in the clip.
    async fn transcribe(
        &self,
        audio: &AudioClip,
        range: Option<TimeRange>,
    ) -> Result<Vec<SubtitleEntry>>;

    /// Translate the text of `entries` into `target_language`. The result has
    /// the same length and timestamps as the input.
    async fn translate(
        &self,
        entries: &[SubtitleEntry],
        target_language: &str,
    ) -> Result<Vec<SubtitleEntry>>;
}

/// Clean up a raw transcript.
///
/// Blank entries are dropped, times are clamped into `range`, entries left
/// with no duration are dropped, and the rest is sorted and renumbered.
pub fn normalize_transcript(
    entries: Vec<SubtitleEntry>,
    range: Option<TimeRange>,
) -> Vec<SubtitleEntry> {
    let received = entries.len();

    let mut kept: Vec<SubtitleEntry> = entries
        .into_iter()
        .filter_map(|mut entry| {
            entry.text = entry.text.trim().to_string();
            if entry.text.is_empty() {
                return None;
            }
            if let Some(range) = range {
                entry.start_time = entry.start_time.clamp(range.start(), range.end());
                entry.end_time = entry.end_time.clamp(range.start(), range.end());
            }
            (entry.start_time < entry.end_time).then_some(entry)
        })
        .collect();

    kept.sort_by_key(|e| e.start_time);
    renumber(&mut kept);

    if kept.len() != received {
        warn!(
            "Dropped {} of {} transcript entries (blank or outside the range)",
            received - kept.len(),
            received
        );
    }
    kept
}

/// Put the original numbering and timing back onto translated entries.
pub fn restore_timing(
    original: &[SubtitleEntry],
    translated: Vec<SubtitleEntry>,
) -> Result<Vec<SubtitleEntry>> {
    if original.len() != translated.len() {
        return Err(SubtitleError::Api(format!(
            "translation returned {} entries for {} subtitles",
            translated.len(),
            original.len()
        )));
    }

    let restored = original
        .iter()
        .zip(translated)
        .map(|(source, target)| {
            if target.start_time != source.start_time || target.end_time != source.end_time {
                debug!("Translation moved entry {}, restoring its timing", source.index);
            }
            SubtitleEntry {
                index: source.index,
                start_time: source.start_time,
                end_time: source.end_time,
                text: target.text.trim().to_string(),
            }
        })
        .collect();

    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Timestamp;

    use pretty_assertions::assert_eq;

    fn entry(index: usize, start: u64, end: u64, text: &str) -> SubtitleEntry {
        SubtitleEntry::new(
            index,
            Timestamp::from_millis(start),
            Timestamp::from_millis(end),
            text,
        )
    }

    #[test]
    fn test_normalize_without_range() {
        let raw = vec![
            entry(2, 2_000, 3_000, " second "),
            entry(1, 0, 1_000, "first"),
            entry(3, 4_000, 5_000, "  "),
            entry(4, 6_000, 6_000, "zero length"),
        ];
        assert_eq!(
            normalize_transcript(raw, None),
            vec![entry(1, 0, 1_000, "first"), entry(2, 2_000, 3_000, "second")]
        );
    }

    #[test]
    fn test_normalize_clamps_to_range() {
        let range = TimeRange::new(Timestamp::from_millis(10_000), Timestamp::from_millis(20_000))
            .unwrap();
        let raw = vec![
            entry(1, 9_000, 11_000, "straddles start"),
            entry(2, 12_000, 13_000, "inside"),
            entry(3, 19_500, 25_000, "straddles end"),
            entry(4, 21_000, 22_000, "outside"),
        ];
        assert_eq!(
            normalize_transcript(raw, Some(range)),
            vec![
                entry(1, 10_000, 11_000, "straddles start"),
                entry(2, 12_000, 13_000, "inside"),
                entry(3, 19_500, 20_000, "straddles end"),
            ]
        );
    }

    #[test]
    fn test_restore_timing() {
        let original = vec![entry(1, 0, 1_000, "hello"), entry(2, 1_000, 2_000, "world")];
        let translated = vec![entry(0, 5, 900, " hallo "), entry(9, 1_000, 2_000, "Welt")];
        assert_eq!(
            restore_timing(&original, translated).unwrap(),
            vec![entry(1, 0, 1_000, "hallo"), entry(2, 1_000, 2_000, "Welt")]
        );
    }

    #[test]
    fn test_restore_timing_length_mismatch() {
        let original = vec![entry(1, 0, 1_000, "hello")];
        let err = restore_timing(&original, vec![]).unwrap_err();
        assert_eq!(
            err,
            SubtitleError::Api("translation returned 0 entries for 1 subtitles".to_string())
        );
    }
}
