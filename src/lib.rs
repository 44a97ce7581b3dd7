// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod identity;
pub mod images;
pub mod prompts;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;
