//! Gemini API client
//!
//! Both operations go through `generateContent` with a JSON response schema.
//! Audio is sent inline as base64, so clips are capped by
//! `GeminiConfig::max_inline_bytes`.

use crate::{
    audio::AudioClip,
    config::GeminiConfig,
    error::{Result, SubtitleError},
    subtitle::SubtitleEntry,
    timecode::TimeRange,
    transcription::{normalize_transcript, restore_timing, SubtitleService},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SubtitleError::Configuration(format!(
                    "No Gemini API key configured. Set {} or add it to the config file",
                    crate::config::API_KEY_ENV
                ))
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        endpoint(&self.config)
    }

    /// Send a request body and return the text of the first candidate
    async fn generate(&self, body: &Value) -> Result<String> {
        debug!("POST {}", self.endpoint());
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SubtitleError::Api(format!(
                "Gemini request failed: HTTP {}: {}",
                status,
                text.trim()
            )));
        }

        let raw: Value = response.json().await?;
        response_text(&raw)
    }
}

#[async_trait]
impl SubtitleService for GeminiClient {
    async fn transcribe(
        &self,
        audio: &AudioClip,
        range: Option<TimeRange>,
    ) -> Result<Vec<SubtitleEntry>> {
        if audio.len() > self.config.max_inline_bytes {
            return Err(SubtitleError::Configuration(format!(
                "{} is {} bytes; the inline limit is {} bytes",
                audio.name,
                audio.len(),
                self.config.max_inline_bytes
            )));
        }

        info!(
            "Transcribing {}{} with {}",
            audio.name,
            range.map(|r| format!(" ({})", r)).unwrap_or_default(),
            self.config.model
        );
        let body = transcription_request(audio, range, self.config.temperature);
        let text = self.generate(&body).await?;
        let entries = parse_entries(&text)?;
        Ok(normalize_transcript(entries, range))
    }

    async fn translate(
        &self,
        entries: &[SubtitleEntry],
        target_language: &str,
    ) -> Result<Vec<SubtitleEntry>> {
        let batch_size = self.config.translation_batch_size.max(1);
        let batches = entries.len().div_ceil(batch_size);
        let mut translated = Vec::with_capacity(entries.len());

        for (i, batch) in entries.chunks(batch_size).enumerate() {
            info!(
                "Translating batch {}/{} ({} entries) into {}",
                i + 1,
                batches,
                batch.len(),
                target_language
            );
            let body = translation_request(batch, target_language, self.config.temperature)?;
            let text = self.generate(&body).await?;
            translated.extend(restore_timing(batch, parse_entries(&text)?)?);
        }

        Ok(translated)
    }
}

/// URL of the `generateContent` method for the configured model
pub fn endpoint(config: &GeminiConfig) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        config.base_url.trim_end_matches('/'),
        config.model
    )
}

fn entries_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "index": { "type": "INTEGER" },
                "startTime": { "type": "STRING" },
                "endTime": { "type": "STRING" },
                "text": { "type": "STRING" }
            },
            "required": ["index", "startTime", "endTime", "text"]
        }
    })
}

fn generation_config(temperature: f32) -> Value {
    json!({
        "temperature": temperature,
        "responseMimeType": "application/json",
        "responseSchema": entries_schema()
    })
}

/// Instructions for a transcription request
pub fn transcription_prompt(range: Option<TimeRange>) -> String {
    let scope = match range {
        Some(range) => format!(
            "Only transcribe speech between {} and {}. Timestamps must be absolute \
             positions in the full recording, not offsets from {}.",
            range.start(),
            range.end(),
            range.start()
        ),
        None => "Transcribe the whole recording.".to_string(),
    };

    format!(
        concat!(
            "You are a professional subtitler.\n",
            "{}\n",
            "Return a JSON array of subtitle segments with fields index, startTime, endTime, text.\n",
            "Rules:\n",
            "- Times use the SRT format HH:MM:SS,mmm.\n",
            "- Segments are in chronological order and do not overlap.\n",
            "- Keep each segment short enough to read: at most two lines, about 7 seconds.\n",
            "- Write the speech in its original language. No commentary or markdown."
        ),
        scope
    )
}

/// Instructions for a translation request
pub fn translation_prompt(entries_json: &str, target_language: &str) -> String {
    format!(
        concat!(
            "Translate the text of these subtitles into {}.\n",
            "Return a JSON array with exactly the same number of items, in the same order, ",
            "with index, startTime and endTime copied unchanged.\n",
            "Only translate the text field. No commentary or markdown.\n\n",
            "Subtitles JSON:\n{}"
        ),
        target_language, entries_json
    )
}

/// Request body carrying the audio inline
pub fn transcription_request(audio: &AudioClip, range: Option<TimeRange>, temperature: f32) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": audio.format.mime_type(),
                        "data": STANDARD.encode(&audio.bytes)
                    }
                },
                { "text": transcription_prompt(range) }
            ]
        }],
        "generationConfig": generation_config(temperature)
    })
}

/// Request body for translating one batch
pub fn translation_request(
    entries: &[SubtitleEntry],
    target_language: &str,
    temperature: f32,
) -> Result<Value> {
    let entries_json = serde_json::to_string(entries)?;
    Ok(json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": translation_prompt(&entries_json, target_language) }]
        }],
        "generationConfig": generation_config(temperature)
    }))
}

/// Concatenate the text parts of the first candidate
pub fn response_text(raw: &Value) -> Result<String> {
    if let Some(reason) = raw
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(SubtitleError::Api(format!("Gemini blocked the request: {}", reason)));
    }

    let parts = raw
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SubtitleError::Api(
                "unexpected Gemini response shape (missing candidates[0].content.parts)"
                    .to_string(),
            )
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        let reason = raw
            .pointer("/candidates/0/finishReason")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(SubtitleError::Api(format!(
            "Gemini returned no text (finish reason: {})",
            reason
        )));
    }
    Ok(text)
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the entries out of a model response.
///
/// Accepts a bare array or an object wrapping the array in `subtitles`.
pub fn parse_entries(text: &str) -> Result<Vec<SubtitleEntry>> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| SubtitleError::Api(format!("Gemini output was not valid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove("subtitles").ok_or_else(|| {
            SubtitleError::Api("Gemini output has no subtitle array".to_string())
        })?,
        _ => {
            return Err(SubtitleError::Api(
                "Gemini output is not a subtitle array".to_string(),
            ))
        }
    };

    serde_json::from_value(items)
        .map_err(|e| SubtitleError::Api(format!("Gemini output has malformed subtitles: {}", e)))
}
