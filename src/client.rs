use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::config::{ClientConfig, ClientInput};

pub async fn send_transcription_request(config: &ClientConfig) -> Result<Value> {
    let client = reqwest::Client::new();

    let mut body = serde_json::Map::new();
    if let Some(ref key) = config.api_key {
        body.insert("api_key".to_string(), Value::String(key.clone()));
    }

    match &config.input {
        ClientInput::Url(url) => {
            println!("🔗 Video URL: {url}");
            body.insert("url".to_string(), Value::String(url.clone()));
        }
        ClientInput::AudioFile(file) => {
            if !Path::new(file).exists() {
                return Err(anyhow!("Audio file not found: {}", file));
            }
            let audio_data =
                fs::read(file).map_err(|e| anyhow!("Failed to read audio file: {}", e))?;
            println!("📁 Audio file: {} ({} bytes)", file, audio_data.len());

            let filename = Path::new(file)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.mp3");
            body.insert(
                "audio_base64".to_string(),
                Value::String(BASE64.encode(&audio_data)),
            );
            body.insert("filename".to_string(), Value::String(filename.to_string()));
        }
        ClientInput::SubtitleFile(file) => {
            let text = fs::read_to_string(file)
                .map_err(|e| anyhow!("Failed to read subtitle file: {}", e))?;
            println!("📄 Subtitle file: {} ({} chars)", file, text.len());
            body.insert("subtitle_text".to_string(), Value::String(text));
        }
    }

    println!(
        "🚀 Sending transcription request to: {}/api/v1/transcribe",
        config.server_url
    );

    let response = client
        .post(format!("{}/api/v1/transcribe", config.server_url))
        .json(&Value::Object(body))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        return Err(anyhow!(
            "Server returned error {}: {}",
            status,
            response_text
        ));
    }

    let json: Value = serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    Ok(json)
}

pub async fn check_server_health(server_url: &str) -> Result<()> {
    let client = reqwest::Client::new();

    println!("🔍 Checking server health at: {server_url}/api/v1/health");

    let response = client
        .get(format!("{server_url}/api/v1/health"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

pub async fn run_client(config: ClientConfig) -> Result<()> {
    println!("🎬 Duo Transcribe Client");
    println!("========================");

    if let Err(e) = check_server_health(&config.server_url).await {
        eprintln!("❌ {e}");
        eprintln!("💡 Make sure the server is running: duo-transcribe serve");
        return Err(e);
    }

    match send_transcription_request(&config).await {
        Ok(result) => {
            println!("\n✅ Transcription completed!");
            print_transcript(&result);
        }
        Err(e) => {
            eprintln!("❌ Transcription failed: {e}");
            return Err(e);
        }
    }

    Ok(())
}

fn print_transcript(result: &Value) {
    if let Some(title) = result["title"].as_str() {
        println!("📝 {title}");
    }

    let Some(segments) = result["segments"].as_array() else {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        return;
    };

    for segment in segments {
        let start = segment["start"].as_f64().unwrap_or(0.0);
        let end = segment["end"].as_f64().unwrap_or(0.0);
        let text = segment["text"].as_str().unwrap_or("");
        let translation = segment["translation"].as_str().unwrap_or("");

        println!("[{} - {}] {}", format_time(start), format_time(end), text);
        if !translation.is_empty() {
            println!("{:>14} {}", "", translation);
        }
    }
}

/// `M:SS`, or `H:MM:SS` once an hour is reached.
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.4), "1:05");
        assert_eq!(format_time(3725.0), "1:02:05");
    }
}
