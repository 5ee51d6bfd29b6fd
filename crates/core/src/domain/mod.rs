pub mod events;
pub mod menu;
pub mod message;
pub mod route;
