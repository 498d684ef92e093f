use tracing::{debug, warn};

use crate::assembler::{ImagePayload, console_turns, critic_turns};
use crate::config::Config;
use crate::gateway::CompletionProvider;
use crate::model::ChatRequest;
use crate::providers::ProviderError;

pub const CONSOLE_ERROR_PREFIX: &str = "An error occurred:";

/// Console turn: the error, if any, becomes the reply text.
pub async fn chat_with_bot(
    provider: &dyn CompletionProvider,
    cfg: &Config,
    prompt: &str,
) -> String {
    let request = ChatRequest {
        model: cfg.chat_model.clone(),
        messages: console_turns(&cfg.system_prompt, prompt),
        max_tokens: None,
    };

    match provider.complete(request).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!(model = %cfg.chat_model, error = %err, "console chat failed");
            console_error(&err)
        }
    }
}

pub fn console_error(err: &dyn std::fmt::Display) -> String {
    format!("{CONSOLE_ERROR_PREFIX} {err}")
}

/// Drawing-critic turn. Always uses the vision model, with or without an image.
pub async fn critique(
    provider: &dyn CompletionProvider,
    cfg: &Config,
    text: &str,
    image: Option<&ImagePayload>,
) -> Result<String, ProviderError> {
    debug!(
        model = %cfg.vision_model,
        has_image = image.is_some(),
        text_len = text.len(),
        "dispatching critic request"
    );
    let request = ChatRequest {
        model: cfg.vision_model.clone(),
        messages: critic_turns(text, image),
        max_tokens: Some(cfg.vision_max_tokens),
    };
    provider.complete(request).await
}
