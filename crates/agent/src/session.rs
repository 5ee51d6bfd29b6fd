//! Streaming session controller: one request in, one canonical event
//! sequence out.
//!
//! The produced stream always matches `Start, Data*, (Error)?, End`. Every
//! backend fault is converted to a single `Error` event here; no raw fault
//! ever crosses into a transport binding. The stream is pull-based, so a
//! transport that stops polling (client disconnected) stops all further
//! backend pulls simply by dropping it.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use savor_core::{Message, SessionEvent};
use tracing::{info, warn};

use crate::helpdesk::Helpdesk;

pub struct SessionController {
    helpdesk: Arc<Helpdesk>,
}

impl SessionController {
    pub fn new(helpdesk: Arc<Helpdesk>) -> Self {
        Self { helpdesk }
    }

    /// Run one session. Fragments are relayed in arrival order with no
    /// buffering beyond transport framing; the terminal `End` is emitted on
    /// every path.
    pub fn run(
        &self,
        query: String,
        history: Vec<Message>,
    ) -> impl Stream<Item = SessionEvent> + Send + 'static {
        let helpdesk = self.helpdesk.clone();

        async_stream::stream! {
            yield SessionEvent::Start;

            let (route, mut fragments) = match helpdesk.respond(&query, &history).await {
                Ok(answer) => answer,
                Err(error) => {
                    warn!(
                        event_name = "helpdesk.session.failed",
                        phase = "dispatch",
                        error = %error,
                        "session failed before any fragment was produced"
                    );
                    yield SessionEvent::Error(error.to_string());
                    yield SessionEvent::End;
                    return;
                }
            };

            info!(
                event_name = "helpdesk.session.routed",
                route = %route,
                history_turns = history.len(),
                "session dispatched"
            );

            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(text) => yield SessionEvent::Data(text),
                    Err(error) => {
                        warn!(
                            event_name = "helpdesk.session.failed",
                            phase = "stream",
                            route = %route,
                            error = %error,
                            "backend stream failed mid-answer"
                        );
                        yield SessionEvent::Error(error.to_string());
                        yield SessionEvent::End;
                        return;
                    }
                }
            }

            yield SessionEvent::End;
        }
    }
}
