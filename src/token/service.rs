use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::store::Role;
use crate::token::claims::{TokenKind, TokenPayload};
use crate::token::codec;
use crate::token::registry::{ConsumedTokenSet, SessionRegistry};
use crate::Result;

const FALLBACK_TTL_SECS: i64 = 900;

/// Parses a token lifetime such as "15m", "7d", "45s" or bare seconds.
/// Unparsable input falls back to 900 seconds with a warning.
pub fn parse_duration_secs(value: &str) -> i64 {
    let input = value.trim().to_lowercase();

    if let Ok(seconds) = input.parse::<i64>() {
        return seconds.max(1);
    }

    let (amount, unit) = match input.char_indices().last() {
        Some((idx, unit)) => (&input[..idx], unit),
        None => {
            warn!("Empty token lifetime, falling back to {}s", FALLBACK_TTL_SECS);
            return FALLBACK_TTL_SECS;
        }
    };

    let amount = match amount.parse::<i64>() {
        Ok(amount) if amount >= 0 => amount,
        _ => {
            warn!(
                "Unparsable token lifetime {:?}, falling back to {}s",
                value, FALLBACK_TTL_SECS
            );
            return FALLBACK_TTL_SECS;
        }
    };

    let secs = match unit {
        's' => Some(amount),
        'm' => amount.checked_mul(60),
        'h' => amount.checked_mul(60 * 60),
        'd' => amount.checked_mul(24 * 60 * 60),
        _ => None,
    };

    match secs {
        Some(secs) => secs,
        None => {
            warn!(
                "Unparsable token lifetime {:?}, falling back to {}s",
                value, FALLBACK_TTL_SECS
            );
            FALLBACK_TTL_SECS
        }
    }
}

/// Access/refresh token pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of rotating a refresh token.
#[derive(Debug, Clone)]
pub struct RotatedRefreshToken {
    pub user_id: Uuid,
    pub refresh_token: String,
}

/// Issues and verifies the three token purposes, each under its own
/// secret and lifetime. Refresh sessions go through the injected
/// [`SessionRegistry`]; used reset tokens through the [`ConsumedTokenSet`].
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    reset_secret: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    reset_ttl_secs: i64,
    sessions: Arc<dyn SessionRegistry>,
    consumed: Arc<dyn ConsumedTokenSet>,
}

impl TokenService {
    pub fn new(
        config: &AuthConfig,
        sessions: Arc<dyn SessionRegistry>,
        consumed: Arc<dyn ConsumedTokenSet>,
    ) -> Self {
        Self {
            access_secret: config.access_secret.clone(),
            refresh_secret: config.refresh_secret.clone(),
            reset_secret: config.reset_secret.clone(),
            access_ttl_secs: parse_duration_secs(&config.access_ttl),
            refresh_ttl_secs: parse_duration_secs(&config.refresh_ttl),
            reset_ttl_secs: parse_duration_secs(&config.reset_ttl),
            sessions,
            consumed,
        }
    }

    /// Issues an access/refresh pair and records the refresh session.
    pub async fn issue_auth_tokens(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<AuthTokens> {
        let access_token = self.create_access_token(user_id, email, role)?;
        let (refresh_token, jti) = self.create_refresh_token(user_id)?;
        self.sessions.record(user_id, jti, self.refresh_expires_at()).await;

        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    pub fn create_access_token(&self, user_id: Uuid, email: &str, role: Role) -> Result<String> {
        let kind = TokenKind::Access {
            email: email.to_string(),
            role,
        };
        let token = codec::sign(user_id, kind, &self.access_secret, self.access_ttl_secs)?;
        Ok(token)
    }

    fn create_refresh_token(&self, user_id: Uuid) -> Result<(String, Uuid)> {
        let jti = Uuid::new_v4();
        let token = codec::sign(
            user_id,
            TokenKind::Refresh { jti },
            &self.refresh_secret,
            self.refresh_ttl_secs,
        )?;
        Ok((token, jti))
    }

    fn refresh_expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.refresh_ttl_secs)
    }

    pub fn issue_password_reset_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let kind = TokenKind::PasswordReset {
            email: email.to_string(),
            jti: Uuid::new_v4(),
        };
        let token = codec::sign(user_id, kind, &self.reset_secret, self.reset_ttl_secs)?;
        Ok(token)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<TokenPayload> {
        let payload = codec::verify(token, &self.access_secret)?;

        if !matches!(payload.kind, TokenKind::Access { .. }) {
            return Err(AppError::Unauthorized("Invalid access token type".to_string()));
        }

        Ok(payload)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<TokenPayload> {
        let payload = codec::verify(token, &self.refresh_secret)?;

        if !matches!(payload.kind, TokenKind::Refresh { .. }) {
            return Err(AppError::Unauthorized("Invalid refresh token type".to_string()));
        }

        Ok(payload)
    }

    /// Verifies the old refresh token and mints a replacement for the same
    /// subject. The new session is recorded and the old one retired; with
    /// the null registry retirement is a no-op and the old token stays
    /// usable until it expires.
    pub async fn rotate_refresh_token(&self, refresh_token: &str) -> Result<RotatedRefreshToken> {
        let payload = self.verify_refresh_token(refresh_token)?;
        let old_jti = match payload.refresh_jti() {
            Some(jti) => jti,
            None => return Err(AppError::Unauthorized("Invalid refresh token type".to_string())),
        };

        if !self.sessions.is_active(payload.sub, old_jti).await {
            return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
        }

        let (refresh_token, new_jti) = self.create_refresh_token(payload.sub)?;
        self.sessions.record(payload.sub, new_jti, self.refresh_expires_at()).await;
        self.sessions.retire(payload.sub, old_jti).await;

        Ok(RotatedRefreshToken {
            user_id: payload.sub,
            refresh_token,
        })
    }

    /// Verifies a password-reset token and marks it used. A token is
    /// consumed at most once; replays are rejected.
    pub async fn consume_password_reset_token(&self, token: &str) -> Result<TokenPayload> {
        let payload = codec::verify(token, &self.reset_secret)?;

        let jti = match &payload.kind {
            TokenKind::PasswordReset { jti, .. } => *jti,
            _ => return Err(AppError::Unauthorized("Invalid reset token type".to_string())),
        };

        let expires_at = DateTime::from_timestamp(payload.exp, 0).unwrap_or_else(Utc::now);

        if !self.consumed.try_consume(jti, expires_at).await {
            return Err(AppError::Unauthorized(
                "Reset token is invalid or expired".to_string(),
            ));
        }

        Ok(payload)
    }

    pub async fn revoke_refresh_session(&self, user_id: Uuid, jti: Uuid) {
        self.sessions.retire(user_id, jti).await;
    }

    pub async fn revoke_all_refresh_sessions_for_user(&self, user_id: Uuid) {
        self.sessions.retire_all(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::registry::{MemoryConsumedTokenSet, MemorySessionRegistry, NullSessionRegistry};

    fn auth_config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            reset_secret: "reset-secret".to_string(),
            access_ttl: "15m".to_string(),
            refresh_ttl: "7d".to_string(),
            reset_ttl: "30m".to_string(),
        }
    }

    fn service() -> TokenService {
        TokenService::new(
            &auth_config(),
            Arc::new(NullSessionRegistry),
            Arc::new(MemoryConsumedTokenSet::new()),
        )
    }

    fn service_with_registry() -> TokenService {
        TokenService::new(
            &auth_config(),
            Arc::new(MemorySessionRegistry::new()),
            Arc::new(MemoryConsumedTokenSet::new()),
        )
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_secs("45s"), 45);
        assert_eq!(parse_duration_secs("15m"), 900);
        assert_eq!(parse_duration_secs("2h"), 7_200);
        assert_eq!(parse_duration_secs("7d"), 604_800);
        assert_eq!(parse_duration_secs(" 10M "), 600);
    }

    #[test]
    fn test_parse_duration_bare_seconds() {
        assert_eq!(parse_duration_secs("900"), 900);
        assert_eq!(parse_duration_secs("1"), 1);
        // Bare integers are clamped to at least one second
        assert_eq!(parse_duration_secs("0"), 1);
        assert_eq!(parse_duration_secs("-5"), 1);
    }

    #[test]
    fn test_parse_duration_fallback() {
        assert_eq!(parse_duration_secs(""), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("soon"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("10w"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("1.5h"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("m"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("-5m"), FALLBACK_TTL_SECS);
    }

    #[test]
    fn test_parse_duration_overflow_falls_back() {
        // Amounts whose unit conversion exceeds i64 seconds
        assert_eq!(parse_duration_secs("107000000000000000d"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("9223372036854775807m"), FALLBACK_TTL_SECS);
        assert_eq!(parse_duration_secs("9223372036854775807s"), i64::MAX);
    }

    #[tokio::test]
    async fn test_issue_and_verify_pair() {
        let service = service();
        let user_id = Uuid::new_v4();

        let tokens = service
            .issue_auth_tokens(user_id, "user@example.com", Role::Customer)
            .await
            .unwrap();

        let access = service.verify_access_token(&tokens.access_token).unwrap();
        assert_eq!(access.sub, user_id);
        assert!(matches!(access.kind, TokenKind::Access { .. }));

        let refresh = service.verify_refresh_token(&tokens.refresh_token).unwrap();
        assert_eq!(refresh.sub, user_id);
        assert!(refresh.refresh_jti().is_some());
    }

    #[tokio::test]
    async fn test_purposes_use_distinct_secrets() {
        let service = service();
        let tokens = service
            .issue_auth_tokens(Uuid::new_v4(), "user@example.com", Role::Customer)
            .await
            .unwrap();

        // The signature check fails before any type check can run
        let err = service.verify_access_token(&tokens.refresh_token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");

        let err = service.verify_refresh_token(&tokens.access_token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_type_tag_checked_even_with_shared_secret() {
        let config = AuthConfig {
            access_secret: "shared-secret".to_string(),
            refresh_secret: "shared-secret".to_string(),
            reset_secret: "shared-secret".to_string(),
            access_ttl: "15m".to_string(),
            refresh_ttl: "7d".to_string(),
            reset_ttl: "30m".to_string(),
        };
        let service = TokenService::new(
            &config,
            Arc::new(NullSessionRegistry),
            Arc::new(MemoryConsumedTokenSet::new()),
        );

        let tokens = service
            .issue_auth_tokens(Uuid::new_v4(), "user@example.com", Role::Customer)
            .await
            .unwrap();
        let reset = service
            .issue_password_reset_token(Uuid::new_v4(), "user@example.com")
            .unwrap();

        let err = service.verify_access_token(&tokens.refresh_token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid access token type");

        let err = service.verify_refresh_token(&tokens.access_token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid refresh token type");

        let err = service.consume_password_reset_token(&tokens.access_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid reset token type");

        let err = service.verify_refresh_token(&reset).unwrap_err();
        assert_eq!(err.to_string(), "Invalid refresh token type");
    }

    #[tokio::test]
    async fn test_rotation_mints_new_token_for_same_subject() {
        let service = service();
        let user_id = Uuid::new_v4();
        let tokens = service
            .issue_auth_tokens(user_id, "user@example.com", Role::Customer)
            .await
            .unwrap();

        let rotated = service.rotate_refresh_token(&tokens.refresh_token).await.unwrap();
        assert_eq!(rotated.user_id, user_id);
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        let old = service.verify_refresh_token(&tokens.refresh_token).unwrap();
        let new = service.verify_refresh_token(&rotated.refresh_token).unwrap();
        assert_ne!(old.refresh_jti(), new.refresh_jti());
    }

    #[tokio::test]
    async fn test_null_registry_keeps_old_token_usable() {
        let service = service();
        let tokens = service
            .issue_auth_tokens(Uuid::new_v4(), "user@example.com", Role::Customer)
            .await
            .unwrap();

        service.rotate_refresh_token(&tokens.refresh_token).await.unwrap();

        // Rotation does not invalidate the old token under the null registry
        assert!(service.rotate_refresh_token(&tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_registry_retires_rotated_token() {
        let service = service_with_registry();
        let tokens = service
            .issue_auth_tokens(Uuid::new_v4(), "user@example.com", Role::Customer)
            .await
            .unwrap();

        let rotated = service.rotate_refresh_token(&tokens.refresh_token).await.unwrap();

        let err = service.rotate_refresh_token(&tokens.refresh_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid refresh token");

        // The replacement rotates fine
        assert!(service.rotate_refresh_token(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_registry_revoke_all() {
        let service = service_with_registry();
        let user_id = Uuid::new_v4();
        let tokens = service
            .issue_auth_tokens(user_id, "user@example.com", Role::Customer)
            .await
            .unwrap();

        service.revoke_all_refresh_sessions_for_user(user_id).await;

        let err = service.rotate_refresh_token(&tokens.refresh_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid refresh token");
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let service = service();
        let user_id = Uuid::new_v4();
        let token = service
            .issue_password_reset_token(user_id, "user@example.com")
            .unwrap();

        let payload = service.consume_password_reset_token(&token).await.unwrap();
        assert_eq!(payload.sub, user_id);
        assert!(matches!(payload.kind, TokenKind::PasswordReset { .. }));

        let err = service.consume_password_reset_token(&token).await.unwrap_err();
        assert_eq!(err.to_string(), "Reset token is invalid or expired");
    }

    #[tokio::test]
    async fn test_reset_token_stays_consumed_through_expiry_second() {
        let mut config = auth_config();
        config.reset_ttl = "1".to_string();
        let service = TokenService::new(
            &config,
            Arc::new(NullSessionRegistry),
            Arc::new(MemoryConsumedTokenSet::new()),
        );

        let token = service
            .issue_password_reset_token(Uuid::new_v4(), "user@example.com")
            .unwrap();
        service.consume_password_reset_token(&token).await.unwrap();

        // Land past the recorded expiry but, with whole-second token
        // timestamps, likely still inside the window where the token
        // verifies. The replay must fail on either path.
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

        let err = service.consume_password_reset_token(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_distinct_reset_tokens_consume_independently() {
        let service = service();
        let user_id = Uuid::new_v4();
        let first = service.issue_password_reset_token(user_id, "user@example.com").unwrap();
        let second = service.issue_password_reset_token(user_id, "user@example.com").unwrap();
        assert_ne!(first, second);

        assert!(service.consume_password_reset_token(&first).await.is_ok());
        assert!(service.consume_password_reset_token(&second).await.is_ok());
    }
}
