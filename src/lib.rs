pub mod analyze;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod gemini;
pub mod models;
pub mod server;
pub mod store;
