//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::{AuthConfig, BootstrapAdmin},
    error::{AppError, AppResult},
    models::{Capability, CreateUser, NewUser, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password and return a JWT token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            tracing::warn!("Failed login for {}", username);
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!("User {} logged in", user.username);
        Ok((token, user))
    }

    /// Decode and check a bearer token
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Current account behind a set of claims
    pub async fn me(&self, claims: &UserClaims) -> AppResult<User> {
        self.repository.users.get_by_id(claims.user_id).await
    }

    pub async fn create_user(&self, actor: &UserClaims, user: CreateUser) -> AppResult<User> {
        actor.require(Capability::ManageUsers)?;
        user.validate()?;

        if self
            .repository
            .users
            .get_by_username(&user.username)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(format!(
                "Username {} is already taken",
                user.username
            )));
        }

        let created = self.insert_user(user).await?;
        tracing::info!("User {} created by {}", created.username, actor.sub);
        Ok(created)
    }

    pub async fn delete_user(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require(Capability::ManageUsers)?;
        if id == actor.user_id {
            return Err(AppError::BadRequest(
                "Cannot delete the account you are logged in with".to_string(),
            ));
        }

        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted by {}", id, actor.sub);
        Ok(())
    }

    /// Create the configured administrator account unless it already exists
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<()> {
        if self
            .repository
            .users
            .get_by_username(&admin.username)
            .await?
            .is_some()
        {
            tracing::debug!("Bootstrap admin {} already present", admin.username);
            return Ok(());
        }

        self.insert_user(CreateUser {
            username: admin.username.clone(),
            password: admin.password.clone(),
            first_name: String::new(),
            last_name: String::new(),
            capabilities: vec![
                Capability::MarkReturned,
                Capability::ManageCatalog,
                Capability::ManageUsers,
            ],
        })
        .await?;
        tracing::info!("Created bootstrap admin {}", admin.username);
        Ok(())
    }

    async fn insert_user(&self, user: CreateUser) -> AppResult<User> {
        let password_hash = hash_password(&user.password)?;
        self.repository
            .users
            .create(&NewUser {
                username: user.username,
                password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                permissions: user
                    .capabilities
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            })
            .await
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
