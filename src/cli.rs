use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "duo-transcribe",
    about = "Duo Transcribe - Bilingual Video Transcription",
    long_about = "An HTTP service (and matching client) that turns a video URL, an audio file, or pasted subtitles into a timestamped English/Chinese transcript.",
    after_help = "EXAMPLES:\n    # Start the transcription server\n    duo-transcribe serve\n\n    # Transcribe a video URL\n    duo-transcribe url https://www.youtube.com/watch?v=abc123\n\n    # Transcribe a local audio file\n    duo-transcribe file my_audio.mp3 --api-key sk-...\n\n    # Parse and translate pasted subtitles\n    duo-transcribe text captions.vtt\n\n    # Use a different server when in client mode\n    duo-transcribe url https://youtu.be/abc123 --server-url http://my-server:8080"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
    #[command(name = "url")]
    TranscribeUrl {
        video_url: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        #[arg(long)]
        api_key: Option<String>,
    },
    #[command(name = "file")]
    TranscribeFile {
        audio_file: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        #[arg(long)]
        api_key: Option<String>,
    },
    #[command(name = "text")]
    TranscribeText {
        subtitle_file: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,
    },
}
