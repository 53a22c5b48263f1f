//! Audio files sent to the transcription service

use crate::error::{Result, SubtitleError};
use std::path::Path;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tokio::fs;
use tracing::debug;

/// Audio containers the service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Aac,
    Ogg,
    Flac,
    Webm,
}

impl AudioFormat {
    /// MIME type sent alongside the audio bytes
    pub const fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mp3",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Webm => "audio/webm",
        }
    }

    /// Detect the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        extension.parse().map_err(|_| {
            SubtitleError::Configuration(format!(
                "Unsupported audio file {} (expected one of: {})",
                path.display(),
                Self::iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// An audio file held in memory
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// File name, used in log messages
    pub name: String,
}

impl AudioClip {
    pub fn new<S: Into<String>>(bytes: Vec<u8>, format: AudioFormat, name: S) -> Self {
        Self {
            bytes,
            format,
            name: name.into(),
        }
    }

    /// Read an audio file, detecting its format from the extension
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = AudioFormat::from_path(path)?;
        let bytes = fs::read(path).await.map_err(|e| {
            SubtitleError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read audio file {}: {}", path.display(), e),
            ))
        })?;
        if bytes.is_empty() {
            return Err(SubtitleError::Configuration(format!(
                "Audio file {} is empty",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("Loaded {} ({} bytes, {})", name, bytes.len(), format.mime_type());

        Ok(Self {
            bytes,
            format,
            name,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
