use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password;
use crate::error::AppError;
use crate::mailer::{MailMessage, Mailer};
use crate::store::{NewUser, PublicUser, UserStore};
use crate::token::{AuthTokens, TokenService};
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordInput {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshInput {
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct LogoutInput {
    pub user_id: Uuid,
    pub refresh_token: Option<String>,
}

/// User plus token pair, as returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: AuthTokens,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_username(username: Option<&str>) -> Option<String> {
    username
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty())
}

/// Orchestrates the account flows over the user store, token service and
/// mailer. Inputs are assumed to be shape-validated upstream; only email
/// and username normalization happens here.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    environment: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        environment: String,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            environment,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession> {
        let email = normalize_email(&input.email);
        let username = normalize_username(input.username.as_deref());

        // Pre-check for a friendly conflict message; the store's own
        // uniqueness enforcement is authoritative when registrations race.
        if let Some(existing) = self
            .store
            .find_by_email_or_username(&email, username.as_deref())
            .await?
        {
            if existing.email == email {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = password::hash(&input.password)?;

        let user = self
            .store
            .create(NewUser {
                email,
                username,
                password_hash,
                full_name: input.full_name,
                phone: input.phone,
            })
            .await?;

        let tokens = self
            .tokens
            .issue_auth_tokens(user.id, &user.email, user.role)
            .await?;

        info!("Registered user {}", user.id);

        Ok(AuthSession {
            user: user.to_public(),
            tokens,
        })
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthSession> {
        let email = normalize_email(&input.email);

        // Unknown email and wrong password produce the same error so the
        // response does not reveal which accounts exist.
        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                return Err(AppError::Unauthorized("Invalid email or password".to_string()))
            }
        };

        if !password::compare(&input.password, &user.password_hash) {
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        let tokens = self
            .tokens
            .issue_auth_tokens(user.id, &user.email, user.role)
            .await?;

        info!("User {} logged in", user.id);

        Ok(AuthSession {
            user: user.to_public(),
            tokens,
        })
    }

    /// Issues a reset token and mails it. Succeeds without effect for
    /// unknown emails, and swallows mail failures after logging them.
    pub async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<()> {
        let email = normalize_email(&input.email);

        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => return Ok(()),
        };

        let token = self.tokens.issue_password_reset_token(user.id, &user.email)?;

        let sent = self
            .mailer
            .send(&MailMessage {
                to: user.email.clone(),
                subject: "Reset your password".to_string(),
                text: format!("Use this token to reset password: {}", token),
                html: format!("<p>Use this token to reset password:</p><pre>{}</pre>", token),
            })
            .await;

        if !sent {
            if self.environment == "production" {
                warn!("Mailer unavailable. Password reset requested for {}", user.email);
            } else {
                warn!(
                    "Mailer unavailable. Password reset token for {}: {}",
                    user.email, token
                );
            }
        }

        Ok(())
    }

    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<()> {
        let payload = self.tokens.consume_password_reset_token(&input.token).await?;

        let mut user = match self.store.find_by_id(payload.sub).await? {
            Some(user) => user,
            None => return Err(AppError::NotFound("User not found".to_string())),
        };

        user.set_password_hash(password::hash(&input.new_password)?);
        self.store.save(&user).await?;

        self.tokens.revoke_all_refresh_sessions_for_user(user.id).await;

        info!("Password reset for user {}", user.id);

        Ok(())
    }

    /// Rotates the refresh token and issues a fresh access token bound to
    /// the user's current email and role.
    pub async fn refresh(&self, input: RefreshInput) -> Result<AuthTokens> {
        let rotated = self.tokens.rotate_refresh_token(&input.refresh_token).await?;

        let user = match self.store.find_by_id(rotated.user_id).await? {
            Some(user) => user,
            None => return Err(AppError::Unauthorized("Invalid refresh token".to_string())),
        };

        let access_token = self.tokens.create_access_token(user.id, &user.email, user.role)?;

        Ok(AuthTokens {
            access_token,
            refresh_token: rotated.refresh_token,
        })
    }

    /// Revokes the presented refresh session. Calling without a refresh
    /// token is an idempotent no-op.
    pub async fn logout(&self, input: LogoutInput) -> Result<()> {
        let refresh_token = match input.refresh_token {
            Some(token) => token,
            None => return Ok(()),
        };

        let payload = self.tokens.verify_refresh_token(&refresh_token)?;

        if payload.sub != input.user_id {
            return Err(AppError::Unauthorized(
                "Refresh token does not belong to user".to_string(),
            ));
        }

        if let Some(jti) = payload.refresh_jti() {
            self.tokens.revoke_refresh_session(payload.sub, jti).await;
        }

        Ok(())
    }

    pub async fn get_me(&self, user_id: Uuid) -> Result<PublicUser> {
        let user = match self.store.find_by_id(user_id).await? {
            Some(user) => user,
            None => return Err(AppError::NotFound("User not found".to_string())),
        };

        Ok(user.to_public())
    }

    pub fn forgot_password_response_message(&self) -> &'static str {
        if self.environment == "development" {
            "If the email exists, a reset token was generated (check logs if SMTP is missing)."
        } else {
            "If the email exists, a reset email has been sent."
        }
    }
}
