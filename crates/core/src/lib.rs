//! Domain types and configuration for the savor helpdesk.
//!
//! This crate is I/O-free: it defines the conversation model (`Message`,
//! `Role`), the closed set of intent routes, the menu and order-history
//! context used by the recommendation flow, the per-request `SessionEvent`
//! protocol, and the application configuration loader. Everything that talks
//! to the network lives in `savor-agent` and `savor-server`.

pub mod config;
pub mod domain;

pub use domain::events::SessionEvent;
pub use domain::menu::{Menu, MenuItem, MenuParseError, OrderHistory};
pub use domain::message::{Message, Role};
pub use domain::route::Route;
