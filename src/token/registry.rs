use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Token timestamps carry whole seconds, so verification keeps accepting
/// a token for the remainder of the second in which it expires. Eviction
/// must lag `expires_at` by at least that long or an entry can vanish
/// while its token still verifies.
fn eviction_horizon() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(1)
}

/// Tracks which refresh sessions are live. Rotation consults this before
/// minting a replacement; revocation retires entries.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn record(&self, user_id: Uuid, jti: Uuid, expires_at: DateTime<Utc>);
    async fn retire(&self, user_id: Uuid, jti: Uuid);
    async fn retire_all(&self, user_id: Uuid);
    async fn is_active(&self, user_id: Uuid, jti: Uuid) -> bool;
}

/// Registry that tracks nothing and reports every session active.
///
/// Under this registry revocation does not block reuse: a rotated-away or
/// "revoked" refresh token keeps verifying until its natural expiry. This
/// is the default wiring; swap in [`MemorySessionRegistry`] to make
/// rotation and revocation actually retire old sessions.
pub struct NullSessionRegistry;

#[async_trait]
impl SessionRegistry for NullSessionRegistry {
    async fn record(&self, _user_id: Uuid, _jti: Uuid, _expires_at: DateTime<Utc>) {}

    async fn retire(&self, _user_id: Uuid, _jti: Uuid) {}

    async fn retire_all(&self, _user_id: Uuid) {}

    async fn is_active(&self, _user_id: Uuid, _jti: Uuid) -> bool {
        true
    }
}

/// In-process registry of active refresh session ids per user. Each entry
/// keeps its token's expiry; recording a new session drops entries whose
/// tokens can no longer verify, so a user's set stays bounded by their
/// refresh lifetime.
#[derive(Default)]
pub struct MemorySessionRegistry {
    sessions: DashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>,
}

impl MemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn record(&self, user_id: Uuid, jti: Uuid, expires_at: DateTime<Utc>) {
        let horizon = eviction_horizon();
        let mut jtis = self.sessions.entry(user_id).or_default();
        jtis.retain(|_, expiry| *expiry > horizon);
        jtis.insert(jti, expires_at);
    }

    async fn retire(&self, user_id: Uuid, jti: Uuid) {
        if let Some(mut jtis) = self.sessions.get_mut(&user_id) {
            jtis.remove(&jti);
        }
    }

    async fn retire_all(&self, user_id: Uuid) {
        self.sessions.remove(&user_id);
    }

    async fn is_active(&self, user_id: Uuid, jti: Uuid) -> bool {
        self.sessions
            .get(&user_id)
            .map(|jtis| jtis.contains_key(&jti))
            .unwrap_or(false)
    }
}

/// Records password-reset token ids that have been used. `try_consume`
/// is an atomic check-and-insert, so one of two racing consumers loses.
#[async_trait]
pub trait ConsumedTokenSet: Send + Sync {
    /// Returns true when the jti was unused and is now marked consumed.
    async fn try_consume(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool;
}

/// In-process consumed set. Entries are dropped once the codec can no
/// longer accept their token, which bounds growth to tokens still in
/// flight.
#[derive(Default)]
pub struct MemoryConsumedTokenSet {
    consumed: DashMap<Uuid, DateTime<Utc>>,
}

impl MemoryConsumedTokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune_expired(&self) {
        let horizon = eviction_horizon();
        self.consumed.retain(|_, expires_at| *expires_at > horizon);
    }
}

#[async_trait]
impl ConsumedTokenSet for MemoryConsumedTokenSet {
    async fn try_consume(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool {
        self.prune_expired();
        self.consumed.insert(jti, expires_at).is_none()
    }
}
