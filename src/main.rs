mod api;
mod app;
mod cache;
mod components;
mod config;
mod identity;
mod model;
mod shell;
mod time;
mod toast;
mod utils;
mod view;

#[cfg(test)]
mod test;

use std::{error::Error, sync::Arc};

use api::TrpcClient;
use app::App;
use config::{Command, Config};
use identity::ClerkClient;
use log::info;
use tokio::{io::BufReader, sync::mpsc};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.init_logger();
    info!("# Chirp #");
    info!("API: {}", config.api_url());

    let api = Arc::new(TrpcClient::new(&config));
    let identity = Arc::new(ClerkClient::new(&config));
    let (tx, rx) = mpsc::unbounded_channel();
    let page = App::new(api, identity, config.sign_in_url(), tx);

    let mut stdout = std::io::stdout();
    match config.command() {
        Command::Render => app::render_once(page, rx, &mut stdout, config.format()).await?,
        Command::Post { content } => {
            app::post_once(page, rx, content, &mut stdout, config.format()).await?
        }
        Command::Shell => {
            info!("Type a post and press Enter, `:quit` to leave");
            let stdin = BufReader::new(tokio::io::stdin());
            shell::run(page, rx, stdin, &mut stdout, config.format()).await?
        }
    }

    Ok(())
}
