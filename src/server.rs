use actix_cors::Cors;
use actix_multipart::{Field, Multipart};
use actix_web::{App, Either, HttpResponse, HttpServer, Responder, get, middleware::Logger, post, web};
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};

use crate::captions::parse_captions;
use crate::config::ServiceConfig;
use crate::dto::{TranscribeRequest, TranscriptDto, demo_transcript};
use crate::source::{self, ResolvedUrl, Source};
use crate::stt::{self, WhisperApiClient};
use crate::translate::Translator;

pub struct AppState {
    pub config: ServiceConfig,
}

fn health_body() -> serde_json::Value {
    serde_json::json!({
        "message": "Bilingual transcription service is running",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

fn error_body(code: u16, message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": message.into(),
        "code": code,
    })
}

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(health_body())
}

#[get("/api/v1/health")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(health_body())
}

#[post("/api/v1/transcribe")]
pub async fn transcribe(
    data: web::Data<AppState>,
    payload: Either<web::Json<TranscribeRequest>, Multipart>,
) -> impl Responder {
    debug!("Transcription request received");

    let (request, multipart_audio) = match payload {
        Either::Left(json) => (json.into_inner(), None),
        Either::Right(multipart) => match read_multipart_request(multipart).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to read multipart form: {e}");
                return HttpResponse::BadRequest()
                    .json(error_body(400, "Failed to read multipart form"));
            }
        },
    };

    let (request_source, api_key) = match into_source(request, multipart_audio) {
        Ok(parts) => parts,
        Err(message) => {
            warn!("Rejecting request: {message}");
            return HttpResponse::BadRequest().json(error_body(400, message));
        }
    };

    match run_pipeline(&data.config, request_source, api_key).await {
        Ok(transcript) => {
            info!(
                "Transcription completed: \"{}\", {} segments",
                transcript.title,
                transcript.segments.len()
            );
            HttpResponse::Ok().json(transcript)
        }
        Err(e) => {
            error!("Transcription pipeline failed: {e:#}");
            HttpResponse::InternalServerError().json(error_body(500, e.to_string()))
        }
    }
}

/// The linear request pipeline: resolve the source, obtain segments, fill
/// translations, assemble the response. Temp files are removed before the
/// response leaves.
async fn run_pipeline(
    config: &ServiceConfig,
    request_source: Source,
    api_key: Option<String>,
) -> Result<TranscriptDto> {
    let api_key = api_key.or_else(|| config.api_key.clone());

    let (title, mut segments, temp_dir) = match request_source {
        Source::Captions(text) => ("Pasted subtitles".to_string(), parse_captions(&text), None),

        Source::Audio { data, filename } => {
            let Some(key) = api_key else {
                info!("No API key for uploaded audio, serving demo transcript");
                return Ok(demo_transcript(&filename));
            };
            let (dir, path) = source::stage_upload(data, &filename).await?;
            let whisper = WhisperApiClient::new(key, config.whisper_base_url.clone());
            let segments = stt::transcribe_or_placeholder(&whisper, &path, &filename).await;
            (filename, segments, Some(dir))
        }

        Source::Url(url) => match source::resolve_url(&url, api_key.is_some()).await {
            Ok(ResolvedUrl::Captions { title, text }) => (title, parse_captions(&text), None),
            Ok(ResolvedUrl::Audio { title, dir, path }) => match api_key {
                Some(key) => {
                    let filename = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("audio.mp3")
                        .to_string();
                    let whisper = WhisperApiClient::new(key, config.whisper_base_url.clone());
                    let segments = stt::transcribe_or_placeholder(&whisper, &path, &filename).await;
                    (title, segments, Some(dir))
                }
                None => {
                    source::cleanup(dir);
                    info!("No API key for downloaded audio, serving demo transcript");
                    return Ok(demo_transcript(&title));
                }
            },
            Err(e) if api_key.is_none() => {
                info!("URL resolution failed without an API key, serving demo transcript: {e:#}");
                return Ok(demo_transcript("Demo Video"));
            }
            Err(e) => return Err(e),
        },
    };

    let translator = Translator::new(config.translate_base_url.clone());
    translator.translate_segments(&mut segments).await;

    if let Some(dir) = temp_dir {
        source::cleanup(dir);
    }

    Ok(TranscriptDto { title, segments })
}

/// Pick the input modality. Uploaded bytes win over pasted text, which
/// wins over a URL; empty strings count as absent.
fn into_source(
    request: TranscribeRequest,
    multipart_audio: Option<Vec<u8>>,
) -> Result<(Source, Option<String>), String> {
    let TranscribeRequest {
        url,
        api_key,
        audio_base64,
        filename,
        subtitle_text,
    } = request;

    let api_key = api_key.filter(|k| !k.trim().is_empty());
    let filename = filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| "upload.mp3".to_string());

    if let Some(data) = multipart_audio {
        if data.is_empty() {
            return Err("Uploaded audio file is empty".to_string());
        }
        return Ok((Source::Audio { data, filename }, api_key));
    }

    if let Some(text) = subtitle_text.filter(|t| !t.trim().is_empty()) {
        return Ok((Source::Captions(text), api_key));
    }

    if let Some(encoded) = audio_base64.filter(|a| !a.trim().is_empty()) {
        let data = BASE64
            .decode(encoded.trim())
            .map_err(|e| format!("Invalid audio_base64: {e}"))?;
        return Ok((Source::Audio { data, filename }, api_key));
    }

    if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
        return Ok((Source::Url(url), api_key));
    }

    Err("Missing input: provide url, audio_base64, or subtitle_text".to_string())
}

async fn read_multipart_request(
    mut payload: Multipart,
) -> Result<(TranscribeRequest, Option<Vec<u8>>), actix_web::Error> {
    let mut request = TranscribeRequest::default();
    let mut audio_data: Option<Vec<u8>> = None;

    while let Some(field) = payload.try_next().await.unwrap_or(None) {
        match field.name() {
            Some("audio") => {
                let data = read_field_data(field).await?;
                debug!("Audio data received: {} bytes", data.len());
                audio_data = Some(data);
            }
            Some("api_key") => request.api_key = read_text_field(field).await,
            Some("url") => request.url = read_text_field(field).await,
            Some("subtitle_text") => request.subtitle_text = read_text_field(field).await,
            Some("filename") => request.filename = read_text_field(field).await,
            _ => continue,
        }
    }

    Ok((request, audio_data))
}

async fn read_field_data(mut field: Field) -> Result<Vec<u8>, actix_web::Error> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        data.extend_from_slice(&chunk);
    }
    debug!("Read field data: {} bytes", data.len());
    Ok(data)
}

async fn read_text_field(field: Field) -> Option<String> {
    let data = read_field_data(field).await.ok()?;
    let text = String::from_utf8(data).ok()?;
    let text = text.trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

pub async fn run_server(host: String, port: u16) -> std::io::Result<()> {
    let config = ServiceConfig::default();

    if config.api_key.is_some() {
        info!("Speech-to-text API key loaded from environment");
    } else {
        warn!("No OPENAI_API_KEY configured; keyless requests get demo transcripts");
    }

    let app_state = web::Data::new(AppState { config });

    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(50 * 1024 * 1024)) // 50MB
            .app_data(web::PayloadConfig::new(100 * 1024 * 1024))
            .app_data(
                actix_multipart::form::MultipartFormConfig::default()
                    .total_limit(100 * 1024 * 1024), // 100MB
            )
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(index)
            .service(health_check)
            .service(transcribe)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use serde_json::Value;

    fn test_state() -> web::Data<AppState> {
        web::Data::new(AppState {
            config: ServiceConfig {
                api_key: None,
                whisper_base_url: "http://127.0.0.1:9".to_string(),
                // Closed port: every translation call fails fast and falls
                // back to the source text.
                translate_base_url: Some("http://127.0.0.1:9".to_string()),
            },
        })
    }

    #[actix_web::test]
    async fn test_health_reports_healthy() {
        let app = test::init_service(App::new().service(health_check).service(index)).await;

        for uri in ["/", "/api/v1/health"] {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert!(resp.status().is_success());
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["status"], "healthy");
            assert!(body["version"].is_string());
        }
    }

    #[actix_web::test]
    async fn test_missing_input_is_rejected() {
        let app =
            test::init_service(App::new().app_data(test_state()).service(transcribe)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
        assert_eq!(body["code"], 400);
    }

    #[actix_web::test]
    async fn test_invalid_base64_is_rejected() {
        let app =
            test::init_service(App::new().app_data(test_state()).service(transcribe)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .set_json(serde_json::json!({"audio_base64": "not base64!!!"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_pasted_subtitles_survive_translator_outage() {
        let app =
            test::init_service(App::new().app_data(test_state()).service(transcribe)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .set_json(serde_json::json!({"subtitle_text": "0:00 Hello\n0:05 World"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["title"], "Pasted subtitles");

        let segments = body["segments"].as_array().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0]["start"], 0.0);
        assert_eq!(segments[0]["end"], 5.0);
        assert_eq!(segments[0]["text"], "Hello");
        // Translator is unreachable, so each segment keeps its source text.
        assert_eq!(segments[0]["translation"], "Hello");
        assert_eq!(segments[1]["translation"], "World");
    }

    #[actix_web::test]
    async fn test_upload_without_key_gets_demo_transcript() {
        let app =
            test::init_service(App::new().app_data(test_state()).service(transcribe)).await;

        let encoded = BASE64.encode(b"pretend this is audio");
        let req = test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .set_json(serde_json::json!({"audio_base64": encoded, "filename": "clip.mp3"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["title"], "[DEMO] clip.mp3");
        assert!(!body["segments"].as_array().unwrap().is_empty());
    }
}
