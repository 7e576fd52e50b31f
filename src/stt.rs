use std::path::Path;

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::dto::Segment;

/// Span assigned to the whole transcript when the API returns no
/// per-segment breakdown.
const DEFAULT_SPAN_SECS: f64 = 60.0;

/// Client for the OpenAI Whisper transcription API.
pub struct WhisperApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: Option<String>,
    segments: Option<Vec<ApiSegment>>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

impl WhisperApiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model: "whisper-1".to_string(),
        }
    }

    /// Transcribe an audio file, requesting segment-level timestamps.
    pub async fn transcribe_file(&self, path: &Path, filename: &str) -> Result<Vec<Segment>> {
        let audio_data = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read audio file: {}", e))?;

        info!(
            "Sending {} bytes of audio to Whisper API (model {})",
            audio_data.len(),
            self.model
        );

        let file_part = reqwest::multipart::Part::bytes(audio_data)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| anyhow!("Invalid audio mime type: {}", e))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("language", "en")
            .text("timestamp_granularities[]", "segment")
            .part("file", file_part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow!("Transcription request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(anyhow!("Whisper API returned {}: {}", status, body));
        }

        let transcription: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Whisper response: {}", e))?;

        let segments = to_segments(transcription);
        info!("Transcription completed: {} segments", segments.len());
        Ok(segments)
    }
}

/// Transcribe, converting any failure into a single synthetic segment that
/// carries the failure message. Transcription errors never propagate past
/// this point.
pub async fn transcribe_or_placeholder(
    client: &WhisperApiClient,
    path: &Path,
    filename: &str,
) -> Vec<Segment> {
    match client.transcribe_file(path, filename).await {
        Ok(segments) => segments,
        Err(e) => {
            warn!("Transcription failed, returning placeholder segment: {e:#}");
            vec![Segment::untranslated(
                0.0,
                DEFAULT_SPAN_SECS,
                format!("Transcription failed: {e}"),
            )]
        }
    }
}

fn to_segments(transcription: VerboseTranscription) -> Vec<Segment> {
    match transcription.segments {
        Some(api_segments) if !api_segments.is_empty() => api_segments
            .into_iter()
            .map(|seg| Segment::untranslated(seg.start, seg.end, seg.text.trim()))
            .collect(),
        _ => {
            debug!("API returned no segment breakdown, using full text");
            let text = transcription.text.unwrap_or_default();
            vec![Segment::untranslated(
                0.0,
                DEFAULT_SPAN_SECS,
                text.trim(),
            )]
        }
    }
}

fn mime_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_json_segments() {
        let raw = r#"{
            "text": " Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.4, "text": " Hello there."},
                {"id": 1, "start": 2.4, "end": 4.8, "text": " General Kenobi."}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(raw).unwrap();
        let segments = to_segments(parsed);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello there.");
        assert_eq!(segments[1].start, 2.4);
        assert_eq!(segments[1].end, 4.8);
    }

    #[test]
    fn test_missing_segment_breakdown_spans_default_duration() {
        let raw = r#"{"text": "One long utterance."}"#;
        let parsed: VerboseTranscription = serde_json::from_str(raw).unwrap();
        let segments = to_segments(parsed);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, DEFAULT_SPAN_SECS);
        assert_eq!(segments[0].text, "One long utterance.");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for("clip.mp3"), "audio/mpeg");
        assert_eq!(mime_for("audio.wav"), "audio/wav");
        assert_eq!(mime_for("mystery"), "application/octet-stream");
    }
}
