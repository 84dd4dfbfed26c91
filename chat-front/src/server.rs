//! HTTP server components for Chat Front.

pub mod files;
pub mod http;

pub use http::{boot_chat_front_server, router, AppState};
