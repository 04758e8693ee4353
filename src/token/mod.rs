//! Token lifecycle for gatewarden-server
//!
//! Covers the signed-token codec, the typed claims, the token service
//! that issues, verifies, rotates and consumes tokens, and the session
//! and consumed-token registries behind it.

pub mod claims;
pub mod codec;
pub mod registry;
pub mod service;

pub use claims::{TokenKind, TokenPayload};
pub use registry::{
    ConsumedTokenSet, MemoryConsumedTokenSet, MemorySessionRegistry, NullSessionRegistry,
    SessionRegistry,
};
pub use service::{parse_duration_secs, AuthTokens, RotatedRefreshToken, TokenService};
