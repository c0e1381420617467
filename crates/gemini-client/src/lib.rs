pub mod client;
pub mod config;
pub mod schema;
pub mod types;

pub use client::GeminiClient;
pub use config::Config;
