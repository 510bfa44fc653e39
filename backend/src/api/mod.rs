//! HTTP API module.
//!
//! Server, Basic-auth middleware, error mapping and the SSE progress feed.

pub mod auth;
pub mod logs;
pub mod server;
pub mod types;

pub use auth::{parse_basic_auth, require_basic_auth, BasicAuthState};
pub use logs::*;
pub use server::{build_app, start_server, AppState};
pub use types::{error_response, ApiError};
