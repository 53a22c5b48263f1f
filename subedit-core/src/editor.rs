//! Subtitle editing with undo/redo and selection
//!
//! [`SubtitleEditor`] keeps every version of the subtitle list in a bounded
//! [`History`]. Each successful edit pushes exactly one snapshot and leaves
//! the list numbered 1..=n. A failed edit changes nothing.
//!
//! Positions passed to the editor are 0-based; the `index` field of each
//! entry is the 1-based SRT number.

use crate::config::{EditorConfig, SplitTiming};
use crate::error::{Result, SubtitleError};
use crate::history::History;
use crate::subtitle::{renumber, SubtitleEntry};
use crate::timecode::{TimeRange, Timestamp};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Where to cut the text of an entry being split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAt {
    /// At the whitespace closest to the middle of the text, or at the middle
    /// character when the text has no whitespace
    Middle,
    /// Before the character at this offset
    Char(usize),
}

/// Subtitle list editor
#[derive(Debug, Clone)]
pub struct SubtitleEditor {
    history: History<Vec<SubtitleEntry>>,
    selection: BTreeSet<usize>,
    config: EditorConfig,
}

impl SubtitleEditor {
    /// Create an editor over `entries`, sorted by start time and renumbered
    pub fn new(entries: Vec<SubtitleEntry>, config: EditorConfig) -> Self {
        Self {
            history: History::new(prepare(entries), config.history_limit),
            selection: BTreeSet::new(),
            config,
        }
    }

    /// Replace the list and forget all history
    pub fn load(&mut self, entries: Vec<SubtitleEntry>) {
        self.history.reset(prepare(entries));
        self.selection.clear();
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        self.history.current()
    }

    pub fn entry(&self, pos: usize) -> Option<&SubtitleEntry> {
        self.entries().get(pos)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Number of undo steps available
    pub fn undo_depth(&self) -> usize {
        self.history.pointer()
    }

    /// Apply `edit` to a copy of the current list and record it.
    ///
    /// Unchanged results are not recorded.
    fn commit<F>(&mut self, op: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<SubtitleEntry>) -> Result<()>,
    {
        let mut next = self.history.current().clone();
        edit(&mut next)?;
        renumber(&mut next);

        if next == *self.history.current() {
            debug!("{}: no change", op);
            return Ok(());
        }

        self.history.push(next);
        debug!(
            "{}: {} entries, history {}/{}",
            op,
            self.len(),
            self.history.pointer() + 1,
            self.history.len()
        );
        Ok(())
    }

    fn check_position(&self, pos: usize) -> Result<()> {
        check_position(pos, self.len())
    }

    /// Replace the text of one entry
    pub fn update_text<S: Into<String>>(&mut self, pos: usize, text: S) -> Result<()> {
        self.check_position(pos)?;
        let text = text.into();
        self.commit("update_text", |entries| {
            entries[pos].text = text;
            Ok(())
        })
    }

    /// Move the start of an entry, keeping its end
    pub fn set_start(&mut self, pos: usize, start: Timestamp) -> Result<()> {
        self.check_position(pos)?;
        let end = self.entries()[pos].end_time;
        self.set_timing(pos, start, end)
    }

    /// Move the end of an entry, keeping its start
    pub fn set_end(&mut self, pos: usize, end: Timestamp) -> Result<()> {
        self.check_position(pos)?;
        let start = self.entries()[pos].start_time;
        self.set_timing(pos, start, end)
    }

    /// Set both times of an entry.
    ///
    /// With cascading enabled, a start that runs into the previous entry
    /// trims that entry's end, and an end that runs into the following
    /// entries pushes them later while keeping their durations.
    pub fn set_timing(&mut self, pos: usize, start: Timestamp, end: Timestamp) -> Result<()> {
        self.check_position(pos)?;
        if start >= end {
            return Err(SubtitleError::InvalidEdit(format!(
                "entry {}: start {} must be before end {}",
                pos + 1,
                start,
                end
            )));
        }

        let cascade = self.config.cascade_timing;
        self.commit("set_timing", |entries| {
            entries[pos].start_time = start;
            entries[pos].end_time = end;
            if cascade {
                trim_previous(entries, pos)?;
                push_following(entries, pos);
            }
            Ok(())
        })
    }

    /// Split one entry in two
    pub fn split(&mut self, pos: usize, at: SplitAt) -> Result<()> {
        self.check_position(pos)?;
        let timing = self.config.split_timing;
        self.commit("split", |entries| {
            let (first, second) = split_entry(&entries[pos], at, timing)?;
            entries[pos] = first;
            entries.insert(pos + 1, second);
            Ok(())
        })?;
        self.selection.clear();
        Ok(())
    }

    /// Merge an entry with the one after it
    pub fn merge(&mut self, pos: usize) -> Result<()> {
        self.check_position(pos)?;
        if pos + 1 >= self.len() {
            return Err(SubtitleError::InvalidEdit(format!(
                "entry {} is the last entry and has nothing to merge with",
                pos + 1
            )));
        }
        self.merge_range(pos, pos + 1)
    }

    /// Merge the entries `first..=last` into one
    pub fn merge_range(&mut self, first: usize, last: usize) -> Result<()> {
        self.check_position(first)?;
        self.check_position(last)?;
        if first >= last {
            return Err(SubtitleError::InvalidEdit(
                "merging needs at least two entries".to_string(),
            ));
        }

        let separator = self.config.merge_separator.clone();
        self.commit("merge", |entries| {
            let merged = merge_entries(&entries[first..=last], &separator);
            entries.drain(first..=last);
            entries.insert(first, merged);
            Ok(())
        })?;
        self.selection.clear();
        Ok(())
    }

    /// Remove one entry
    pub fn delete(&mut self, pos: usize) -> Result<()> {
        self.check_position(pos)?;
        self.commit("delete", |entries| {
            entries.remove(pos);
            Ok(())
        })?;
        self.selection.clear();
        Ok(())
    }

    /// Insert an empty entry right after `pos`.
    ///
    /// It starts where `pos` ends and lasts the configured default duration,
    /// cut short by the next entry. Returns the new entry's position.
    pub fn insert_after(&mut self, pos: usize) -> Result<usize> {
        self.check_position(pos)?;
        let start = self.entries()[pos].end_time;
        let mut end = start.add_millis(self.config.default_duration_ms);
        if let Some(next) = self.entries().get(pos + 1) {
            end = end.min(next.start_time);
        }
        if end <= start {
            return Err(SubtitleError::InvalidEdit(format!(
                "no room for a new entry after entry {}",
                pos + 1
            )));
        }

        self.commit("insert", |entries| {
            entries.insert(pos + 1, SubtitleEntry::new(0, start, end, String::new()));
            Ok(())
        })?;
        self.selection.clear();
        Ok(pos + 1)
    }

    /// Insert an entry at the position given by its start time
    pub fn add(&mut self, entry: SubtitleEntry) -> Result<usize> {
        if entry.start_time >= entry.end_time {
            return Err(SubtitleError::InvalidEdit(format!(
                "start {} must be before end {}",
                entry.start_time, entry.end_time
            )));
        }
        let pos = self
            .entries()
            .partition_point(|e| e.start_time <= entry.start_time);

        self.commit("add", |entries| {
            entries.insert(pos, entry);
            Ok(())
        })?;
        self.selection.clear();
        Ok(pos)
    }

    /// Shift entries `from..` by `offset_ms` milliseconds
    pub fn shift(&mut self, from: usize, offset_ms: i64) -> Result<()> {
        self.check_position(from)?;
        let cascade = self.config.cascade_timing;
        self.commit("shift", |entries| {
            for (i, entry) in entries.iter_mut().enumerate().skip(from) {
                let (Some(start), Some(end)) = (
                    entry.start_time.checked_add_signed(offset_ms),
                    entry.end_time.checked_add_signed(offset_ms),
                ) else {
                    return Err(SubtitleError::InvalidEdit(format!(
                        "shifting by {} ms would move entry {} before 00:00:00,000",
                        offset_ms,
                        i + 1
                    )));
                };
                entry.start_time = start;
                entry.end_time = end;
            }
            if cascade {
                trim_previous(entries, from)?;
            }
            Ok(())
        })
    }

    /// Replace the whole list as one undoable step
    pub fn replace_all(&mut self, entries: Vec<SubtitleEntry>) -> Result<()> {
        let prepared = prepare(entries);
        self.commit("replace_all", |entries| {
            *entries = prepared;
            Ok(())
        })?;
        self.selection.clear();
        Ok(())
    }

    /// Swap the entries overlapping `range` for `replacement`.
    ///
    /// Used after re-transcribing part of the audio. Returns how many entries
    /// were removed.
    pub fn replace_range(
        &mut self,
        range: TimeRange,
        replacement: Vec<SubtitleEntry>,
    ) -> Result<usize> {
        let removed = self
            .entries()
            .iter()
            .filter(|e| range.overlaps(e.start_time, e.end_time))
            .count();
        self.commit("replace_range", |entries| {
            entries.retain(|e| !range.overlaps(e.start_time, e.end_time));
            entries.extend(replacement);
            entries.sort_by_key(|e| e.start_time);
            Ok(())
        })?;
        self.selection.clear();

        info!("Replaced {} entries in {}", removed, range);
        Ok(removed)
    }

    /// Step back one edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo().is_some();
        self.clamp_selection();
        undone
    }

    /// Re-apply an undone edit. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo().is_some();
        self.clamp_selection();
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn clamp_selection(&mut self) {
        let len = self.len();
        self.selection.retain(|&pos| pos < len);
    }

    /// Select exactly one entry
    pub fn select(&mut self, pos: usize) -> Result<()> {
        self.check_position(pos)?;
        self.selection.clear();
        self.selection.insert(pos);
        Ok(())
    }

    /// Add or remove one entry from the selection
    pub fn toggle(&mut self, pos: usize) -> Result<()> {
        self.check_position(pos)?;
        if !self.selection.remove(&pos) {
            self.selection.insert(pos);
        }
        Ok(())
    }

    /// Select every entry between `a` and `b`, inclusive, in either order
    pub fn select_range(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_position(a)?;
        self.check_position(b)?;
        self.selection = (a.min(b)..=a.max(b)).collect();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected positions in ascending order
    pub fn selected(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    pub fn is_selected(&self, pos: usize) -> bool {
        self.selection.contains(&pos)
    }

    /// Merge the selected entries, which must be adjacent
    pub fn merge_selection(&mut self) -> Result<()> {
        let selected = self.selected();
        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return Err(SubtitleError::InvalidEdit("nothing is selected".to_string()));
        };
        if selected.len() < 2 {
            return Err(SubtitleError::InvalidEdit(
                "select at least two entries to merge".to_string(),
            ));
        }
        if last - first + 1 != selected.len() {
            return Err(SubtitleError::InvalidEdit(
                "only adjacent entries can be merged".to_string(),
            ));
        }

        self.merge_range(first, last)?;
        self.selection.insert(first);
        Ok(())
    }

    /// Delete every selected entry
    pub fn delete_selection(&mut self) -> Result<()> {
        if self.selection.is_empty() {
            return Err(SubtitleError::InvalidEdit("nothing is selected".to_string()));
        }

        let selected = std::mem::take(&mut self.selection);
        let result = self.commit("delete_selection", |entries| {
            let mut pos = 0;
            entries.retain(|_| {
                let keep = !selected.contains(&pos);
                pos += 1;
                keep
            });
            Ok(())
        });
        if result.is_err() {
            self.selection = selected;
        }
        result
    }

    /// Position of the entry shown at `ts`, if any
    pub fn entry_at(&self, ts: Timestamp) -> Option<usize> {
        self.entries().iter().position(|e| e.contains(ts))
    }
}

impl Default for SubtitleEditor {
    fn default() -> Self {
        Self::new(Vec::new(), EditorConfig::default())
    }
}

fn prepare(mut entries: Vec<SubtitleEntry>) -> Vec<SubtitleEntry> {
    entries.sort_by_key(|e| e.start_time);
    renumber(&mut entries);
    entries
}

fn check_position(pos: usize, len: usize) -> Result<()> {
    if pos >= len {
        return Err(SubtitleError::InvalidEdit(format!(
            "no entry {} (the list has {} entries)",
            pos + 1,
            len
        )));
    }
    Ok(())
}

/// Pull the previous entry's end back to `entries[pos]`'s start if they overlap.
fn trim_previous(entries: &mut [SubtitleEntry], pos: usize) -> Result<()> {
    let Some(prev_pos) = pos.checked_sub(1) else {
        return Ok(());
    };
    let start = entries[pos].start_time;
    let previous = &mut entries[prev_pos];
    if previous.end_time <= start {
        return Ok(());
    }
    if start <= previous.start_time {
        return Err(SubtitleError::InvalidEdit(format!(
            "entry {} would start before entry {} begins at {}",
            pos + 1,
            prev_pos + 1,
            previous.start_time
        )));
    }
    previous.end_time = start;
    Ok(())
}

/// Push entries after `pos` later until none overlaps its predecessor.
fn push_following(entries: &mut [SubtitleEntry], pos: usize) {
    for next in pos + 1..entries.len() {
        let previous_end = entries[next - 1].end_time;
        let entry = &mut entries[next];
        if entry.start_time >= previous_end {
            break;
        }
        let delta = previous_end.saturating_sub(entry.start_time);
        entry.start_time = entry.start_time.add_millis(delta);
        entry.end_time = entry.end_time.add_millis(delta);
    }
}

fn middle_cut(chars: &[char]) -> usize {
    let middle = chars.len() / 2;
    chars
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .min_by_key(|&i| i.abs_diff(middle))
        .unwrap_or(middle)
}

fn split_entry(
    entry: &SubtitleEntry,
    at: SplitAt,
    timing: SplitTiming,
) -> Result<(SubtitleEntry, SubtitleEntry)> {
    let chars: Vec<char> = entry.text.chars().collect();
    let cut = match at {
        SplitAt::Middle => middle_cut(&chars),
        SplitAt::Char(offset) => offset,
    };
    if cut == 0 || cut >= chars.len() {
        return Err(SubtitleError::InvalidEdit(format!(
            "entry {}: cannot split {} characters at offset {}",
            entry.index,
            chars.len(),
            cut
        )));
    }

    let head: String = chars[..cut].iter().collect();
    let tail: String = chars[cut..].iter().collect();
    let (head, tail) = (head.trim_end(), tail.trim_start());
    if head.is_empty() || tail.is_empty() {
        return Err(SubtitleError::InvalidEdit(format!(
            "entry {}: both halves of a split need text",
            entry.index
        )));
    }

    let duration = entry.end_time.saturating_sub(entry.start_time);
    if duration < 2 {
        return Err(SubtitleError::InvalidEdit(format!(
            "entry {}: too short to split",
            entry.index
        )));
    }
    let offset = match timing {
        SplitTiming::Proportional => duration * cut as u64 / chars.len() as u64,
        SplitTiming::Midpoint => duration / 2,
    };
    let cut_time = entry.start_time.add_millis(offset.clamp(1, duration - 1));

    Ok((
        SubtitleEntry::new(entry.index, entry.start_time, cut_time, head),
        SubtitleEntry::new(entry.index + 1, cut_time, entry.end_time, tail),
    ))
}

fn merge_entries(entries: &[SubtitleEntry], separator: &str) -> SubtitleEntry {
    let start = entries.iter().map(|e| e.start_time).min().unwrap_or_default();
    let end = entries.iter().map(|e| e.end_time).max().unwrap_or_default();
    let text = entries
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator);
    SubtitleEntry::new(0, start, end, text)
}
