//! subedit core library
//!
//! Subtitle editing primitives: SRT reading and writing, a bounded
//! undo/redo history, segment editing (split, merge, cascading time
//! changes, selection) and a Gemini client for transcription and
//! translation.

pub mod audio;
pub mod config;
pub mod editor;
pub mod error;
pub mod gemini;
pub mod history;
pub mod srt;
pub mod subtitle;
pub mod timecode;
pub mod transcription;

pub use audio::{AudioClip, AudioFormat};
pub use config::{EditorConfig, GeminiConfig, SplitTiming, SubEditConfig};
pub use editor::{SplitAt, SubtitleEditor};
pub use error::{Result, SubtitleError};
pub use gemini::GeminiClient;
pub use history::History;
pub use srt::{parse_srt, read_srt_file, to_srt, write_srt_file};
pub use subtitle::{check, Issue, SubtitleEntry};
pub use timecode::{TimeRange, Timestamp};
use tracing::info;
pub use transcription::SubtitleService;

async fn resolve_config(config: Option<SubEditConfig>) -> Result<SubEditConfig> {
    match config {
        Some(config) => Ok(config),
        None => SubEditConfig::load().await,
    }
}

/// High-level transcription function
pub async fn transcribe_audio_file<P: AsRef<std::path::Path>>(
    audio_path: P,
    range: Option<TimeRange>,
    config: Option<SubEditConfig>,
) -> Result<Vec<SubtitleEntry>> {
    let config = resolve_config(config).await?;

    // Initialize the client first so a missing key fails before reading audio
    let client = GeminiClient::new(config.gemini)?;

    info!("Loading audio file: {:?}", audio_path.as_ref());
    let audio = AudioClip::load(audio_path).await?;

    client.transcribe(&audio, range).await
}

/// High-level translation function
pub async fn translate_subtitles(
    entries: &[SubtitleEntry],
    target_language: &str,
    config: Option<SubEditConfig>,
) -> Result<Vec<SubtitleEntry>> {
    let config = resolve_config(config).await?;
    let client = GeminiClient::new(config.gemini)?;
    client.translate(entries, target_language).await
}
