use std::future::Future;
use std::pin::Pin;

use crate::model::ChatRequest;
use crate::providers::ProviderError;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// A chat-completions backend. Created once at startup and shared by the
/// console loop and the HTTP handler.
pub trait CompletionProvider: Send + Sync {
    /// Makes exactly one attempt and returns the first candidate's text.
    fn complete(&self, request: ChatRequest) -> CompletionFuture<'_>;
}
