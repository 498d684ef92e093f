pub mod assembler;
pub mod chat;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;
pub mod server;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::sync::Arc;
use tracing::info;

use chat::chat_with_bot;
use config::Config;
use gateway::CompletionProvider;
use providers::OpenAiClient;
use repl::run_repl;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Repl,
    Serve,
    Prompt(String),
}

fn parse_command(args: &[String]) -> Command {
    match args {
        [] => Command::Repl,
        [only] if only == "serve" => Command::Serve,
        _ => Command::Prompt(args.join(" ")),
    }
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cfg = Arc::new(Config::from_env().context("Failed to load configuration")?);
    info!(
        model_base_url = %cfg.model_base_url,
        chat_model = %cfg.chat_model,
        vision_model = %cfg.vision_model,
        vision_max_tokens = cfg.vision_max_tokens,
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiClient::new(client, &cfg));

    let args: Vec<String> = env::args().skip(1).collect();
    match parse_command(&args) {
        Command::Repl => run_repl(provider.as_ref(), &cfg).await,
        Command::Serve => server::serve(cfg, provider).await,
        Command::Prompt(prompt) => {
            let answer = chat_with_bot(provider.as_ref(), &cfg, &prompt).await;
            println!("{}", answer.trim());
            Ok(())
        }
    }
}
