//! `POST /chat`, the streaming helpdesk endpoint.
//!
//! Request body: `{"query": "...", "history": [{"role": "user"|"assistant", "content": "..."}]}`.
//! The response is a long-lived `text/event-stream`; session events map to
//! wire frames as:
//!
//! ```text
//! event: data
//! data: {"action":"response","message":"<fragment>"}
//!
//! event: error
//! data: {"action":"error","message":"<reason>"}
//!
//! event: end
//! data: {}
//! ```
//!
//! `Start` produces no frame (it only marks that the stream may open). Each
//! frame is written as its own body chunk, so fragments reach the client as
//! soon as the backend produces them. A malformed request body fails before
//! the stream opens and returns a plain JSON error instead of SSE. When the
//! client disconnects, axum drops the body stream, which drops the session
//! stream, which stops all further backend pulls.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use savor_agent::helpdesk::Helpdesk;
use savor_agent::session::SessionController;
use savor_core::{Message, SessionEvent};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ChatState {
    helpdesk: Arc<Helpdesk>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct FramePayload<'a> {
    action: &'a str,
    message: &'a str,
}

pub fn router(helpdesk: Arc<Helpdesk>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { helpdesk })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let controller = SessionController::new(state.helpdesk.clone());
    let events = controller.run(request.query, request.history);

    let frames = events.filter_map(|event| async move { wire_frame(event).map(Ok) });
    Sse::new(frames).keep_alive(KeepAlive::default())
}

fn wire_frame(event: SessionEvent) -> Option<Event> {
    match event {
        SessionEvent::Start => None,
        SessionEvent::Data(fragment) => {
            Some(json_frame("data", &FramePayload { action: "response", message: &fragment }))
        }
        SessionEvent::Error(reason) => {
            Some(json_frame("error", &FramePayload { action: "error", message: &reason }))
        }
        SessionEvent::End => Some(Event::default().event("end").data("{}")),
    }
}

fn json_frame(name: &str, payload: &FramePayload<'_>) -> Event {
    let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(body)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use savor_agent::backend::{BackendError, CompletionBackend, FragmentStream};
    use savor_agent::helpdesk::{Helpdesk, Knowledge};
    use savor_core::Message;
    use tower::util::ServiceExt;

    use super::router;

    struct Scripted {
        label: &'static str,
        fragments: Vec<Result<&'static str, &'static str>>,
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        async fn complete(&self, _messages: &[Message]) -> Result<String, BackendError> {
            Ok(self.label.to_string())
        }

        async fn stream(&self, _messages: &[Message]) -> Result<FragmentStream, BackendError> {
            let items: Vec<Result<String, BackendError>> = self
                .fragments
                .iter()
                .map(|step| match step {
                    Ok(text) => Ok(text.to_string()),
                    Err(reason) => Err(BackendError::Stream(reason.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn app(backend: Scripted) -> axum::Router {
        router(Arc::new(Helpdesk::new(Arc::new(backend), Knowledge::builtin())))
    }

    async fn post_chat(app: axum::Router, body: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        (status, content_type, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn clean_session_streams_data_frames_then_a_bare_end() {
        let backend =
            Scripted { label: "StoreLogistics", fragments: vec![Ok("台北市"), Ok("信義路")] };
        let (status, content_type, body) = post_chat(
            app(backend),
            r#"{"query":"What's your address?","history":[]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.expect("content type").starts_with("text/event-stream"));

        let first = body.find("event: data\ndata: {\"action\":\"response\",\"message\":\"台北市\"}\n\n");
        let second =
            body.find("event: data\ndata: {\"action\":\"response\",\"message\":\"信義路\"}\n\n");
        assert!(first.is_some(), "first fragment frame missing: {body}");
        assert!(second.is_some(), "second fragment frame missing: {body}");
        assert!(first < second, "fragments must keep arrival order");

        assert!(body.trim_end().ends_with("event: end\ndata: {}"), "terminal end frame: {body}");
        assert!(!body.contains("event: error"));
    }

    #[tokio::test]
    async fn mid_stream_failure_emits_error_frame_then_end() {
        let backend = Scripted {
            label: "StoreLogistics",
            fragments: vec![Ok("f1"), Ok("f2"), Err("connection reset")],
        };
        let (status, _content_type, body) =
            post_chat(app(backend), r#"{"query":"address?","history":[]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.matches("event: data\n").count(), 2);

        let error_at = body.find("event: error\n").expect("error frame");
        let end_at = body.find("event: end\n").expect("end frame");
        assert!(error_at < end_at, "error must precede end");
        assert!(body.contains(r#"{"action":"error","message":"#));
        assert!(
            body.rfind("event: data\n").expect("data frame") < error_at,
            "no data after error"
        );
    }

    #[tokio::test]
    async fn backend_down_yields_error_and_end_with_no_data() {
        struct Down;

        #[async_trait]
        impl CompletionBackend for Down {
            async fn complete(&self, _messages: &[Message]) -> Result<String, BackendError> {
                Err(BackendError::Api { status: 503, detail: "backend down".to_string() })
            }

            async fn stream(&self, _messages: &[Message]) -> Result<FragmentStream, BackendError> {
                Err(BackendError::Api { status: 503, detail: "backend down".to_string() })
            }
        }

        let app = router(Arc::new(Helpdesk::new(Arc::new(Down), Knowledge::builtin())));
        let (status, _content_type, body) =
            post_chat(app, r#"{"query":"hello","history":[]}"#).await;

        assert_eq!(status, StatusCode::OK, "failure is reported in-stream, not as HTTP status");
        assert_eq!(body.matches("event: data\n").count(), 0);
        assert_eq!(body.matches("event: error\n").count(), 1);
        assert!(body.trim_end().ends_with("event: end\ndata: {}"));
    }

    #[tokio::test]
    async fn history_defaults_to_empty_when_omitted() {
        let backend = Scripted { label: "Greeting", fragments: vec![Ok("您好！")] };
        let (status, _content_type, body) =
            post_chat(app(backend), r#"{"query":"嗨"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("您好！"));
    }

    #[tokio::test]
    async fn malformed_body_fails_before_the_stream_opens() {
        let backend = Scripted { label: "Greeting", fragments: vec![] };
        let (status, content_type, _body) = post_chat(app(backend), "{not json").await;

        assert!(status.is_client_error(), "expected 4xx, got {status}");
        let content_type = content_type.unwrap_or_default();
        assert!(!content_type.starts_with("text/event-stream"));
    }
}
