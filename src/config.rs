use dotenv::dotenv;

const DEFAULT_WHISPER_BASE_URL: &str = "https://api.openai.com/v1";

/// Service-wide configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Default speech-to-text API key; a request body key takes precedence.
    pub api_key: Option<String>,
    pub whisper_base_url: String,
    /// Overridable so tests can point the translator at a closed port.
    pub translate_base_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        dotenv().ok();
        Self {
            api_key: env_var("OPENAI_API_KEY"),
            whisper_base_url: env_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_WHISPER_BASE_URL.to_string()),
            translate_base_url: env_var("TRANSLATE_BASE_URL"),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// What the CLI client is about to send.
#[derive(Debug)]
pub enum ClientInput {
    Url(String),
    AudioFile(String),
    SubtitleFile(String),
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub input: ClientInput,
    pub api_key: Option<String>,
}

impl ClientConfig {
    pub fn new(server_url: String, input: ClientInput, api_key: Option<String>) -> Self {
        Self {
            server_url,
            input,
            api_key,
        }
    }
}
