mod captions;
mod cli;
mod client;
mod config;
mod dto;
mod server;
mod source;
mod stt;
mod translate;

use clap::Parser;

use cli::{Cli, Commands};
use config::{ClientConfig, ClientInput};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            server::run_server(host, port).await?;
        }
        Commands::TranscribeUrl {
            video_url,
            server_url,
            api_key,
        } => {
            let config = ClientConfig::new(server_url, ClientInput::Url(video_url), api_key);
            client::run_client(config).await?;
        }
        Commands::TranscribeFile {
            audio_file,
            server_url,
            api_key,
        } => {
            let config = ClientConfig::new(server_url, ClientInput::AudioFile(audio_file), api_key);
            client::run_client(config).await?;
        }
        Commands::TranscribeText {
            subtitle_file,
            server_url,
        } => {
            let config = ClientConfig::new(server_url, ClientInput::SubtitleFile(subtitle_file), None);
            client::run_client(config).await?;
        }
    }

    Ok(())
}
