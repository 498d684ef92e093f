mod http_errors;
pub mod openai;

pub use http_errors::ProviderError;
#[cfg(test)]
pub(crate) use http_errors::status_error;
pub use openai::OpenAiClient;
