use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{BadgeId, UserId};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid email pattern"));

/// A registered learner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Opaque to this crate; produced by whatever issues credentials
    #[serde(skip_serializing, default)]
    pub credential_hash: Option<String>,
    /// Cumulative points credited by submissions
    pub points: u64,
    /// Held badges in grant order (never contains duplicates)
    pub badges: Vec<BadgeId>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub credential_hash: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            credential_hash: None,
        }
    }

    /// Trim and lower-case fields, then reject obviously bad input.
    ///
    /// Returns the reason on failure.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        if self.name.is_empty() {
            return Err("name must not be empty".to_string());
        }
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(format!("invalid email address: {}", self.email));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_lowercases_email() {
        let user = NewUser::new("  Ada ", " Ada@Example.COM ").normalized().unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_normalized_rejects_bad_input() {
        assert!(NewUser::new("", "a@b.co").normalized().is_err());
        assert!(NewUser::new("Ada", "not-an-email").normalized().is_err());
        assert!(NewUser::new("Ada", "a b@c.d").normalized().is_err());
    }

    #[test]
    fn test_credential_hash_never_serialized() {
        let user = User {
            id: UserId::new("u1"),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            credential_hash: Some("secret".to_string()),
            points: 0,
            badges: Vec::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }
}
