use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io::ErrorKind;
use thiserror::Error;

/// Every way a single completion attempt can fail.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(
        "Connection refused by model API at '{url}'. \
         Ensure the provider is reachable and MODEL_BASE_URL is correct."
    )]
    ConnectionRefused { url: String },
    #[error(
        "Failed to connect to model API at '{url}'. \
         Check MODEL_BASE_URL and network connectivity."
    )]
    Connect { url: String },
    #[error("Failed to call model API at '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Authentication with the model API failed ({status}): {body}")]
    Authentication { status: StatusCode, body: String },
    #[error("Rate limited by the model API ({status}): {body}")]
    RateLimited { status: StatusCode, body: String },
    #[error("Model API rejected the request ({status}): {body}")]
    InvalidRequest { status: StatusCode, body: String },
    #[error("Model request failed with status {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("Failed to parse model chat response: {0}")]
    MalformedResponse(String),
    #[error("Model API returned no choices")]
    EmptyChoices,
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

pub(crate) fn transport_error(err: reqwest::Error, api_url: &str) -> ProviderError {
    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return ProviderError::ConnectionRefused {
                url: api_url.to_string(),
            };
        }

        return ProviderError::Connect {
            url: api_url.to_string(),
        };
    }

    ProviderError::Transport {
        url: api_url.to_string(),
        source: err,
    }
}

pub(crate) fn status_error(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication { status, body }
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { status, body },
        StatusCode::BAD_REQUEST
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::PAYLOAD_TOO_LARGE => ProviderError::InvalidRequest { status, body },
        _ => ProviderError::Upstream { status, body },
    }
}
