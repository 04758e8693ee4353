//! User persistence for gatewarden-server
//!
//! The store is a trait seam: the auth layer only sees [`UserStore`],
//! backed by Postgres in production and an in-memory map in tests.

pub mod models;
pub mod memory;
pub mod postgres;

pub use models::{NewUser, PublicUser, Role, User};
pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

/// Key-value style lookup and persistence of user records.
///
/// Uniqueness of email and username is enforced by the store itself;
/// `create` reports violations as the matching `Duplicate*` error. Callers
/// may pre-check for friendlier ordering but the store is authoritative
/// when two registrations race.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Finds a user matching the email or, when given, the username.
    /// When both match different records the email match is returned.
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create(&self, input: NewUser) -> Result<User, StoreError>;

    async fn save(&self, user: &User) -> Result<(), StoreError>;
}
