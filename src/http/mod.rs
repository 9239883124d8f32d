//! HTTP API for room-join token issuance
//!
//! - GET /api/livekit-token?roomName=&userId= - Mint a room-join token
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, TokenQuery};
pub use routes::create_router;
pub use state::{AppState, TokenIssuer};
