pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod store;
pub mod token;

use std::sync::Arc;

use actix_web::HttpResponse;
use sqlx::postgres::PgPoolOptions;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::AuthService;
pub use mailer::{MailMessage, Mailer};
pub use store::{PublicUser, Role, User, UserStore};
pub use token::{AuthTokens, TokenService};

use mailer::SmtpMailer;
use store::{MemoryUserStore, PgUserStore};
use token::{ConsumedTokenSet, MemoryConsumedTokenSet, NullSessionRegistry, SessionRegistry};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Builds the production wiring: Postgres-backed user store (running
    /// pending migrations) and the SMTP mailer.
    pub async fn new(config: Settings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(Arc::new(pool)));
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(&config.smtp)?);

        Ok(Self::with_store(config, store, mailer))
    }

    /// Builds state over an explicit store and mailer. Used by tests to
    /// run the full stack against the in-memory store.
    pub fn with_store(
        config: Settings,
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        // Sessions are not tracked by default, so revocation stays
        // advisory until a real registry is swapped in.
        let sessions: Arc<dyn SessionRegistry> = Arc::new(NullSessionRegistry);
        let consumed: Arc<dyn ConsumedTokenSet> = Arc::new(MemoryConsumedTokenSet::new());

        let tokens = Arc::new(TokenService::new(&config.auth, sessions, consumed));
        let auth = Arc::new(AuthService::new(
            store,
            tokens.clone(),
            mailer,
            config.environment.clone(),
        ));

        Self {
            config: Arc::new(config),
            auth,
            tokens,
        }
    }

    /// In-memory wiring with an unconfigured mailer.
    pub fn in_memory(config: Settings) -> Result<Self> {
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
        Ok(Self::with_store(
            config,
            Arc::new(MemoryUserStore::new()),
            mailer,
        ))
    }
}
