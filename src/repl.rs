use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{debug, info};

use crate::assembler::ImagePayload;
use crate::chat::{chat_with_bot, console_error, critique};
use crate::config::Config;
use crate::gateway::CompletionProvider;

const IMAGE_COMMAND: &str = "/image";

pub async fn run_repl(provider: &dyn CompletionProvider, cfg: &Config) -> Result<()> {
    run_repl_with(provider, cfg, BufReader::new(io::stdin()), io::stdout()).await
}

pub async fn run_repl_with<R, W>(
    provider: &dyn CompletionProvider,
    cfg: &Config,
    mut input: R,
    mut output: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    info!(model = %cfg.chat_model, "starting console chat");
    writeln!(output, "Welcome to the ChatBot! (Type 'quit' to exit)")?;
    writeln!(output, "{}", "-".repeat(50))?;

    loop {
        write!(output, "\nYou: ")?;
        output.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read stdin")?;
        if read == 0 {
            writeln!(output)?;
            break;
        }

        let prompt = line.trim();
        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            writeln!(output, "\nGoodbye!")?;
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        let reply = match parse_image_command(prompt) {
            Some(command) => run_image_command(provider, cfg, command).await,
            None => chat_with_bot(provider, cfg, prompt).await,
        };
        writeln!(output, "\nChatBot: {}", reply)?;
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct ImageCommand<'a> {
    path: &'a str,
    text: &'a str,
}

fn parse_image_command(prompt: &str) -> Option<ImageCommand<'_>> {
    let rest = prompt.strip_prefix(IMAGE_COMMAND)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim_start();
    let (path, text) = rest
        .split_once(char::is_whitespace)
        .map(|(path, text)| (path, text.trim()))
        .unwrap_or((rest, ""));
    Some(ImageCommand { path, text })
}

async fn run_image_command(
    provider: &dyn CompletionProvider,
    cfg: &Config,
    command: ImageCommand<'_>,
) -> String {
    if command.path.is_empty() {
        return format!("usage: {IMAGE_COMMAND} <path> [message]");
    }

    let bytes = match fs::read(command.path) {
        Ok(bytes) => bytes,
        Err(err) => {
            return console_error(&format!(
                "failed to read image '{}': {}",
                command.path, err
            ));
        }
    };
    debug!(path = %command.path, bytes = bytes.len(), "attaching image from file");

    let image = ImagePayload::from_bytes(&bytes);
    match critique(provider, cfg, command.text, Some(&image)).await {
        Ok(reply) => reply,
        Err(err) => console_error(&err),
    }
}
