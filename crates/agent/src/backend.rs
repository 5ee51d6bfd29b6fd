use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use savor_core::Message;
use thiserror::Error;

/// Lazy, finite, single-pass sequence of answer fragments.
///
/// Fragments arrive in generation order and concatenate (no separators) to
/// the full answer. The stream represents live backend computation: it cannot
/// be replayed, and dropping it stops further pulls, which is how
/// cancellation propagates.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("completion http client could not be constructed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("completion backend is unreachable: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("completion backend rejected the request ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("completion backend sent an unreadable payload: {0}")]
    Decode(String),
    #[error("completion stream failed mid-answer: {0}")]
    Stream(String),
}

/// The completion backend seam.
///
/// `complete` is the non-streaming variant used only for classification,
/// where the prompt is short and a full round trip is acceptable. `stream`
/// is the path every user-visible answer takes.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError>;

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, BackendError>;
}
