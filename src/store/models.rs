use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User role, stored and serialized lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Internal user record. Carries the password hash and must never be
/// serialized into a response; use [`User::to_public`] for that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a user. Email and username are expected
/// to be normalized (trimmed, lowercased) by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: input.email,
            username: input.username,
            password_hash: input.password_hash,
            role: Role::Customer,
            full_name: input.full_name,
            phone: input.phone,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_password_hash(&mut self, password_hash: String) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Response-facing projection of a user. Excludes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new(NewUser {
            email: "user@example.com".to_string(),
            username: Some("user1".to_string()),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            full_name: Some("Test User".to_string()),
            phone: None,
        })
    }

    #[test]
    fn test_new_user_defaults_to_customer() {
        let user = sample_user();
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_public_projection_excludes_password_hash() {
        let user = sample_user();
        let value = serde_json::to_value(user.to_public()).unwrap();

        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "user@example.com");
        assert_eq!(value["role"], "customer");
        assert_eq!(value["fullName"], "Test User");
        assert!(value.get("phone").is_none());
    }

    #[test]
    fn test_set_password_hash_bumps_updated_at() {
        let mut user = sample_user();
        let before = user.updated_at;
        user.set_password_hash("$2b$12$vutsrqponmlkjihgfedcba".to_string());
        assert!(user.updated_at >= before);
        assert_eq!(user.password_hash, "$2b$12$vutsrqponmlkjihgfedcba");
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Customer, Role::Staff, Role::Admin] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("manager".parse::<Role>().is_err());

        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        let role: Role = serde_json::from_value(serde_json::json!("staff")).unwrap();
        assert_eq!(role, Role::Staff);
    }
}
