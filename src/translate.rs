use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, warn};
use serde_json::Value;

use crate::dto::Segment;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the unauthenticated Google translate endpoint (the same one
/// the `googletrans` package wraps).
pub struct Translator {
    client: reqwest::Client,
    base_url: String,
    target_lang: String,
}

impl Translator {
    pub fn new(base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            target_lang: "zh-CN".to_string(),
        }
    }

    pub async fn translate(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "en"),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Translation request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Translation service returned {}",
                response.status()
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse translation response: {}", e))?;

        join_translation_chunks(&body)
            .ok_or_else(|| anyhow!("Unexpected translation response shape"))
    }

    /// Fill the translation field of every segment that does not have one
    /// yet. A failed segment falls back to its source text; siblings are
    /// unaffected.
    pub async fn translate_segments(&self, segments: &mut [Segment]) {
        for segment in segments.iter_mut() {
            if !segment.translation.is_empty() {
                continue;
            }
            match self.translate(&segment.text).await {
                Ok(translation) => {
                    debug!("Translated {} chars", segment.text.len());
                    segment.translation = translation;
                }
                Err(e) => {
                    warn!("Translation failed, keeping source text: {e:#}");
                    segment.translation = segment.text.clone();
                }
            }
        }
    }
}

/// The endpoint answers with nested arrays: the first element is a list of
/// `[translated, source, ...]` chunks. Concatenate the translated pieces.
fn join_translation_chunks(body: &Value) -> Option<String> {
    let chunks = body.get(0)?.as_array()?;
    let mut out = String::new();
    for chunk in chunks {
        if let Some(piece) = chunk.get(0).and_then(Value::as_str) {
            out.push_str(piece);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_translation_chunks() {
        let body: Value = serde_json::from_str(
            r#"[[["你好，","Hello, ",null,null,10],["世界","world",null,null,10]],null,"en"]"#,
        )
        .unwrap();
        assert_eq!(join_translation_chunks(&body).unwrap(), "你好，世界");
    }

    #[test]
    fn test_unexpected_shape_is_rejected() {
        let body: Value = serde_json::from_str(r#"{"error": "nope"}"#).unwrap();
        assert!(join_translation_chunks(&body).is_none());
    }

    #[tokio::test]
    async fn test_failed_segment_falls_back_to_source_text() {
        // Nothing listens here, so every request fails fast.
        let translator = Translator::new(Some("http://127.0.0.1:9".to_string()));
        let mut segments = vec![
            Segment::untranslated(0.0, 5.0, "Hello"),
            Segment::untranslated(5.0, 10.0, "World"),
        ];

        translator.translate_segments(&mut segments).await;

        assert_eq!(segments[0].translation, "Hello");
        assert_eq!(segments[1].translation, "World");
    }

    #[tokio::test]
    async fn test_existing_translations_are_kept() {
        let translator = Translator::new(Some("http://127.0.0.1:9".to_string()));
        let mut segments = vec![Segment {
            start: 0.0,
            end: 5.0,
            text: "Hello".to_string(),
            translation: "已翻译".to_string(),
        }];

        translator.translate_segments(&mut segments).await;

        assert_eq!(segments[0].translation, "已翻译");
    }
}
