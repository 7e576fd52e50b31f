use serde::{Deserialize, Serialize};

/// One timed unit of transcript text with its Chinese translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub translation: String,
}

impl Segment {
    pub fn untranslated(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            translation: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptDto {
    pub title: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscribeRequest {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub audio_base64: Option<String>,
    pub filename: Option<String>,
    pub subtitle_text: Option<String>,
}

/// Placeholder transcript returned when no speech-to-text API key is
/// configured and the request carries no captions to parse.
pub fn demo_transcript(title: &str) -> TranscriptDto {
    TranscriptDto {
        title: format!("[DEMO] {title}"),
        segments: vec![
            Segment {
                start: 0.0,
                end: 5.0,
                text: "Please provide an OpenAI API key for real transcription.".to_string(),
                translation: "请提供OpenAI API密钥以进行真实转写。".to_string(),
            },
            Segment {
                start: 5.0,
                end: 10.0,
                text: "Set OPENAI_API_KEY or pass api_key in the request body.".to_string(),
                translation: "请设置OPENAI_API_KEY环境变量或在请求中提供api_key。".to_string(),
            },
        ],
    }
}
