pub mod auth;
pub mod chat;
pub mod connections;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod health;
pub mod middleware;
pub mod profile;
pub mod push;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use error::{ApiError, ApiResult};
pub use routes::router;
