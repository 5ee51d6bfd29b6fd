//! Helpdesk brain - classification, prompt assembly, and streaming relay
//!
//! This crate sits between the transport (`savor-server`) and the completion
//! backend. One inbound question flows through a constrained pipeline:
//!
//! 1. **Classification** (`router`) - a single non-streamed completion call
//!    maps the question onto one of seven fixed routes; unparseable model
//!    output falls back to `Unhandled` instead of failing the request.
//! 2. **Prompt assembly** (`prompt`) - pure functions build the role-tagged
//!    message list for the chosen flow (recommendation with menu + order
//!    history, retrieval-free document Q&A, or small talk with history).
//! 3. **Streaming relay** (`session`) - the backend's lazy fragment stream is
//!    re-emitted as the canonical `Start / Data* / (Error)? / End` session
//!    protocol that every transport binding preserves.
//!
//! # Key types
//!
//! - `CompletionBackend` - pluggable trait over the model service (`backend`)
//! - `OllamaBackend` - the production implementation (`ollama`)
//! - `Helpdesk` - per-route dispatch over shared knowledge (`helpdesk`)
//! - `SessionController` - the event-stream producer (`session`)
//!
//! The model never decides control flow beyond the route label it emits;
//! unknown labels collapse to `Unhandled` and everything else is
//! deterministic.

pub mod backend;
pub mod helpdesk;
pub mod ollama;
pub mod prompt;
pub mod router;
pub mod session;

pub use backend::{BackendError, CompletionBackend, FragmentStream};
pub use helpdesk::{Helpdesk, Knowledge};
pub use ollama::OllamaBackend;
pub use session::SessionController;
