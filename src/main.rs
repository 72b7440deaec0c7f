use std::io::Write;

use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod config;
mod gemini;
mod media;
mod session;
mod studio;
mod styles;
mod utils;

use config::Config;
use gemini::GeminiClient;
use studio::{Studio, HELP_TEXT};
use utils::logging::init_logging;

fn print_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::load()?;
    let _logging_guards = init_logging(&config.log_level);

    let client = GeminiClient::new(&config)?;
    info!("headshot studio started (model: {})", client.model());

    let mut studio = Studio::new(client);

    println!("AI Headshot Studio");
    println!("{HELP_TEXT}");
    print_prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            print_prompt();
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let reply = studio.handle_line(line).await;
        if !reply.is_empty() {
            println!("{reply}");
        }
        print_prompt();
    }

    info!("session ended");
    Ok(())
}
