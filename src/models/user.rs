//! User model, capabilities and token claims

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Named permission beyond plain authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Administer loans: see every active loan, renew due dates
    MarkReturned,
    /// Create, edit and delete catalog records
    ManageCatalog,
    /// Create and delete user accounts
    ManageUsers,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::MarkReturned => "mark-returned",
            Capability::ManageCatalog => "manage-catalog",
            Capability::ManageUsers => "manage-users",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark-returned" => Ok(Capability::MarkReturned),
            "manage-catalog" => Ok(Capability::ManageCatalog),
            "manage-users" => Ok(Capability::ManageUsers),
            _ => Err(format!("Unknown capability: {}", s)),
        }
    }
}

/// User account from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Capability names as stored; unknown names are ignored
    pub permissions: Vec<String>,
}

impl User {
    pub fn capabilities(&self) -> Vec<Capability> {
        self.permissions
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// User row to insert, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub permissions: Vec<String>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub capabilities: Vec<Capability>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Claims for `user`, valid for `hours`
    pub fn for_user(user: &User, hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            capabilities: user.capabilities(),
            exp: (now + Duration::hours(hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Guard called first thing in every protected operation
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.has_capability(capability) {
            Ok(())
        } else {
            tracing::warn!("User {} lacks capability {}", self.sub, capability);
            Err(AppError::Authorization(format!(
                "The '{}' permission is required",
                capability
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(permissions: &[&str]) -> User {
        User {
            id: 7,
            username: "librarian".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_unknown_permissions_are_ignored() {
        let u = user(&["mark-returned", "fly"]);
        assert_eq!(u.capabilities(), vec![Capability::MarkReturned]);
    }

    #[test]
    fn test_require_checks_capability() {
        let claims = UserClaims::for_user(&user(&["mark-returned"]), 1);
        assert!(claims.require(Capability::MarkReturned).is_ok());
        assert!(matches!(
            claims.require(Capability::ManageCatalog),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_token_round_trip() {
        let claims = UserClaims::for_user(&user(&["manage-users"]), 1);
        let token = claims.create_token("secret").unwrap();

        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert!(parsed.has_capability(Capability::ManageUsers));
        assert!(UserClaims::from_token(&token, "other").is_err());
    }
}
