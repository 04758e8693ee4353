use chrono::Utc;
use jsonwebtoken::{encode, decode, Header, EncodingKey, DecodingKey, Validation, Algorithm};
use uuid::Uuid;

use crate::error::TokenError;
use crate::token::claims::{TokenKind, TokenPayload};

/// Signs a payload of the given kind, stamping `iat` now and `exp`
/// `ttl_secs` from now.
pub fn sign(sub: Uuid, kind: TokenKind, secret: &str, ttl_secs: i64) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let payload = TokenPayload {
        sub,
        kind,
        iat: now,
        exp: now.saturating_add(ttl_secs),
    };

    encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verifies signature and expiry and returns the payload. Expiry is
/// checked against the current time with zero leeway. All failure modes
/// collapse into [`TokenError::Invalid`].
pub fn verify(token: &str, secret: &str) -> Result<TokenPayload, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| TokenError::Invalid)?;

    Ok(data.claims)
}
