use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Role;

/// Purpose-specific claims, discriminated by the `type` field on the wire.
/// A token presented for one purpose never deserializes as another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenKind {
    Access { email: String, role: Role },
    Refresh { jti: Uuid },
    PasswordReset { email: String, jti: Uuid },
}

/// Signed token payload. `kind` is flattened so the wire shape is
/// `{"sub": ..., "type": ..., ..., "iat": ..., "exp": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub sub: Uuid,
    #[serde(flatten)]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl TokenPayload {
    /// The refresh session id, when this is a refresh token.
    pub fn refresh_jti(&self) -> Option<Uuid> {
        match &self.kind {
            TokenKind::Refresh { jti } => Some(*jti),
            _ => None,
        }
    }
}
