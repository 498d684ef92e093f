use std::env;

use thiserror::Error;

const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_VISION_MODEL: &str = "gpt-4-vision-preview";
const DEFAULT_VISION_MAX_TOKENS: u32 = 500;
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 5001;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set. Export it or add it to a .env file.")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model_base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub vision_max_tokens: u32,
    pub system_prompt: String,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub(crate) fn from_env_with(
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = get_var("OPENAI_API_KEY")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            model_base_url: non_empty_or(get_var("MODEL_BASE_URL"), DEFAULT_MODEL_BASE_URL),
            chat_model: non_empty_or(get_var("CHAT_MODEL"), DEFAULT_CHAT_MODEL),
            vision_model: non_empty_or(get_var("VISION_MODEL"), DEFAULT_VISION_MODEL),
            vision_max_tokens: parse_vision_max_tokens(get_var("VISION_MAX_TOKENS").as_deref()),
            system_prompt: get_var("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            server_host: non_empty_or(get_var("SERVER_HOST"), DEFAULT_SERVER_HOST),
            server_port: parse_server_port(get_var("SERVER_PORT").as_deref()),
        })
    }
}

fn non_empty_or(raw: Option<String>, default: &str) -> String {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_vision_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_VISION_MAX_TOKENS)
}

fn parse_server_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}
