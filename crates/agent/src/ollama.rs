//! Ollama chat API adapter.
//!
//! Streamed responses from `POST /api/chat` are newline-delimited JSON: one
//! `{"message":{"content":"..."},"done":false}` object per line, closed by a
//! final `"done":true` line. Errors can appear either as a non-2xx response
//! with an `{"error":"..."}` body or as an `error` field on a 200 stream
//! line; both surface as typed `BackendError`s that terminate the stream.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use savor_core::config::BackendConfig;
use savor_core::Message;

use crate::backend::{BackendError, CompletionBackend, FragmentStream};

#[derive(Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct ChatCall<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaBackend {
    /// Only the connect phase is bounded by the timeout; a healthy stream may
    /// legitimately stay open far longer than any sane total timeout.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn chat_request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let url = format!("{}/api/chat", self.base_url);
        let mut builder = self
            .client
            .post(url)
            .json(&ChatCall { model: &self.model, messages, stream });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        builder
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_else(|_| "unreadable error body".to_string());
        let detail = serde_json::from_str::<ErrorBody>(&raw).map(|body| body.error).unwrap_or(raw);
        Err(BackendError::Api { status: status.as_u16(), detail })
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError> {
        let response = self
            .chat_request(messages, false)
            .send()
            .await
            .map_err(BackendError::Connect)?;
        let response = Self::checked(response).await?;

        let chunk: ChatChunk =
            response.json().await.map_err(|error| BackendError::Decode(error.to_string()))?;
        if let Some(error) = chunk.error {
            return Err(BackendError::Api { status: 200, detail: error });
        }
        Ok(chunk.message.map(|message| message.content).unwrap_or_default())
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, BackendError> {
        let response = self
            .chat_request(messages, true)
            .send()
            .await
            .map_err(BackendError::Connect)?;
        let response = Self::checked(response).await?;
        let mut body = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::default();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        yield Err(BackendError::Stream(error.to_string()));
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    match parse_line(&line) {
                        Ok(parsed) => {
                            if let Some(fragment) = parsed.fragment {
                                yield Ok(fragment);
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(error) => {
                            yield Err(error);
                            return;
                        }
                    }
                }
            }
            // The body is exhausted; a final line without a trailing newline
            // may still be pending.
            if let Some(line) = lines.finish() {
                match parse_line(&line) {
                    Ok(parsed) => {
                        if let Some(fragment) = parsed.fragment {
                            yield Ok(fragment);
                        }
                        if parsed.done {
                            return;
                        }
                    }
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                }
            }

            // No `done` line ever arrived; the fragments seen so far do not
            // form a complete answer.
            yield Err(BackendError::Stream(
                "connection closed before the answer completed".to_string(),
            ));
        };

        Ok(Box::pin(stream))
    }
}

/// Reassembles NDJSON lines from arbitrarily-split byte chunks. Splitting
/// happens on raw bytes (`\n` is never part of a multi-byte UTF-8 sequence)
/// and decoding on complete lines only, so a chunk boundary landing inside a
/// multi-byte character cannot corrupt it.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&byte| byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Drains whatever is left after the body ends. Some backends omit the
    /// trailing newline on the final line.
    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

#[derive(Debug)]
struct ParsedChunk {
    fragment: Option<String>,
    done: bool,
}

fn parse_line(line: &str) -> Result<ParsedChunk, BackendError> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|error| BackendError::Decode(format!("{error}: `{line}`")))?;

    if let Some(error) = chunk.error {
        return Err(BackendError::Stream(error));
    }

    Ok(ParsedChunk {
        fragment: chunk.message.map(|message| message.content).filter(|c| !c.is_empty()),
        done: chunk.done,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_line, LineBuffer};
    use crate::backend::BackendError;

    #[test]
    fn parses_content_line() {
        let parsed =
            parse_line(r#"{"message":{"content":"您好"},"done":false}"#).expect("parse");
        assert_eq!(parsed.fragment.as_deref(), Some("您好"));
        assert!(!parsed.done);
    }

    #[test]
    fn parses_final_line_without_content() {
        let parsed = parse_line(r#"{"message":{"content":""},"done":true}"#).expect("parse");
        assert_eq!(parsed.fragment, None);
        assert!(parsed.done);
    }

    #[test]
    fn error_field_terminates_the_stream() {
        let error = parse_line(r#"{"error":"model not loaded"}"#).unwrap_err();
        assert!(matches!(error, BackendError::Stream(detail) if detail == "model not loaded"));
    }

    #[test]
    fn garbage_line_is_a_decode_failure() {
        let error = parse_line("not json").unwrap_err();
        assert!(matches!(error, BackendError::Decode(_)));
    }

    #[test]
    fn line_buffer_joins_chunks_split_mid_line() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(br#"{"message":{"content":"He"#).is_empty());
        let lines = buffer.push("llo\"},\"done\":false}\n".as_bytes());
        assert_eq!(lines, vec![r#"{"message":{"content":"Hello"},"done":false}"#]);
    }

    #[test]
    fn line_buffer_splits_multiple_lines_in_one_chunk() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"{\"done\":false}\n\n{\"done\":true}\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"done":true}"#);
    }

    #[test]
    fn line_buffer_keeps_trailing_partial_line_pending() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"{\"done\":false}\n{\"mess");
        assert_eq!(lines.len(), 1);
        let rest = buffer.push(b"age\":{\"content\":\"x\"},\"done\":false}\n");
        assert_eq!(rest.len(), 1);
        assert!(rest[0].contains("\"x\""));
    }

    #[test]
    fn line_buffer_preserves_multibyte_characters_split_across_chunks() {
        let raw = "{\"message\":{\"content\":\"您好\"},\"done\":false}\n".as_bytes();
        // one byte into the three-byte 您
        let split = "{\"message\":{\"content\":\"".len() + 1;

        let mut buffer = LineBuffer::default();
        assert!(buffer.push(&raw[..split]).is_empty());
        let lines = buffer.push(&raw[split..]);
        assert_eq!(lines.len(), 1);

        let parsed = parse_line(&lines[0]).expect("parse");
        assert_eq!(parsed.fragment.as_deref(), Some("您好"));
    }

    #[test]
    fn line_buffer_flushes_final_line_missing_its_newline() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"done\":true}").is_empty());

        let line = buffer.finish().expect("pending line");
        let parsed = parse_line(&line).expect("parse");
        assert!(parsed.done);
        assert_eq!(buffer.finish(), None);
    }
}
