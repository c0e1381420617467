//! HTTP front-end for the interview coach. Every session is an independent
//! wizard addressed by id.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
