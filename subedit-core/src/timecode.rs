//! Subtitle timestamps and time ranges

use crate::error::{Result, SubtitleError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// A point on the media timeline with millisecond precision.
///
/// Displays as `HH:MM:SS,mmm`, the SubRip notation. Parsing also accepts a
/// `.` before the fraction and the short `MM:SS,mmm` form, which is what
/// the transcription service returns for short clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Round a number of seconds to the nearest millisecond. Negative and
    /// non-finite values map to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self((seconds * 1000.0).round() as u64)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub const fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Add a signed offset, returning `None` if the result would be negative.
    pub fn checked_add_signed(self, offset_ms: i64) -> Option<Self> {
        self.0.checked_add_signed(offset_ms).map(Self)
    }

    pub const fn saturating_sub(self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }

    pub const fn add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:[,.](\d{1,3}))?$")
            .expect("timestamp pattern is valid")
    })
}

impl FromStr for Timestamp {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let caps = timestamp_regex()
            .captures(trimmed)
            .ok_or_else(|| SubtitleError::Timestamp(format!("'{}'", trimmed)))?;

        let out_of_range =
            || SubtitleError::Timestamp(format!("'{}' is out of range", trimmed));
        let number = |i: usize| -> Result<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse::<u64>().map_err(|_| out_of_range()),
                None => Ok(0),
            }
        };

        let hours = number(1)?;
        let minutes = number(2)?;
        let seconds = number(3)?;
        if minutes >= 60 || seconds >= 60 {
            return Err(SubtitleError::Timestamp(format!(
                "'{}' has minutes or seconds out of range",
                trimmed
            )));
        }

        // "5" means 500 ms and "05" means 50 ms
        let millis = match caps.get(4) {
            Some(fraction) => {
                let digits = fraction.as_str();
                number(4)? * 10u64.pow(3 - digits.len() as u32)
            }
            None => 0,
        };

        hours
            .checked_mul(MILLIS_PER_HOUR)
            .and_then(|total| total.checked_add(minutes * MILLIS_PER_MINUTE))
            .and_then(|total| total.checked_add(seconds * MILLIS_PER_SECOND))
            .and_then(|total| total.checked_add(millis))
            .map(Self)
            .ok_or_else(out_of_range)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / MILLIS_PER_HOUR;
        let minutes = (self.0 % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let secs = (self.0 % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let millis = self.0 % MILLIS_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A closed interval on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange(pub Timestamp, pub Timestamp);

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if end < start {
            return Err(SubtitleError::Timestamp(format!(
                "range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self(start, end))
    }

    pub const fn start(&self) -> Timestamp {
        self.0
    }

    pub const fn end(&self) -> Timestamp {
        self.1
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.0 && ts <= self.1
    }

    /// Whether the half-open span `[start, end)` shares any time with this range.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        start < self.1 && end > self.0
    }

    pub const fn len(&self) -> Duration {
        Duration::from_millis(self.1.saturating_sub(self.0))
    }

    pub const fn is_empty(&self) -> bool {
        self.1.as_millis() == self.0.as_millis()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("00:00:00,000", 0)]
    #[case("00:01:01,500", 61_500)]
    #[case("01:01:01,123", 3_661_123)]
    #[case("00:00:02.250", 2_250)]
    #[case("01:05,5", 65_500)]
    #[case("00:00:01,05", 1_050)]
    #[case("00:00:07", 7_000)]
    #[case(" 00:00:03,000 ", 3_000)]
    #[case("120:00:00,000", 432_000_000)]
    fn test_parse_timestamp(#[case] input: &str, #[case] millis: u64) {
        assert_eq!(input.parse::<Timestamp>(), Ok(Timestamp::from_millis(millis)));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("00:61:00,000")]
    #[case("00:00:60,000")]
    #[case("00:00:01,0000")]
    #[case("-00:00:01,000")]
    #[case("99999999999999999999:00:00,000")]
    #[case("9999999999999:00:00,000")]
    fn test_parse_invalid_timestamp(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Timestamp>(),
            Err(SubtitleError::Timestamp(_))
        ));
    }

    #[rstest]
    #[case(0, "00:00:00,000")]
    #[case(61_500, "00:01:01,500")]
    #[case(3_661_123, "01:01:01,123")]
    #[case(432_000_000, "120:00:00,000")]
    fn test_format_timestamp(#[case] millis: u64, #[case] expected: &str) {
        assert_eq!(Timestamp::from_millis(millis).to_string(), expected);
    }

    #[test]
    fn test_from_secs_rounds_to_millis() {
        assert_eq!(Timestamp::from_secs_f64(1.2345), Timestamp::from_millis(1235));
        assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
    }

    #[test]
    fn test_signed_offsets() {
        let ts = Timestamp::from_millis(1_000);
        assert_eq!(ts.checked_add_signed(-400), Some(Timestamp::from_millis(600)));
        assert_eq!(ts.checked_add_signed(-1_001), None);
    }

    #[test]
    fn test_serde_uses_srt_notation() {
        let json = serde_json::to_string(&Timestamp::from_millis(61_500)).unwrap();
        assert_eq!(json, "\"00:01:01,500\"");
        let back: Timestamp = serde_json::from_str("\"00:01:01.5\"").unwrap();
        assert_eq!(back, Timestamp::from_millis(61_500));
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::new(Timestamp::from_millis(1_000), Timestamp::from_millis(5_000))
            .unwrap();
        assert!(range.contains(Timestamp::from_millis(5_000)));
        assert!(!range.contains(Timestamp::from_millis(999)));
        assert!(range.overlaps(Timestamp::from_millis(4_000), Timestamp::from_millis(6_000)));
        assert!(!range.overlaps(Timestamp::from_millis(5_000), Timestamp::from_millis(6_000)));
        assert_eq!(range.len(), Duration::from_secs(4));

        assert!(TimeRange::new(Timestamp::from_millis(2), Timestamp::from_millis(1)).is_err());
    }
}
