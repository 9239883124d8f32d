pub mod client;
pub mod token;

pub use client::{RoomJoinInfo, TokenClient, TokenResponse};
pub use token::{verify, AccessToken, Claims, VideoGrant, DEFAULT_TOKEN_TTL};
