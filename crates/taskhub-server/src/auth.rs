//! Bearer tokens and password hashing.
//!
//! Tokens are HS256 JWTs carrying `{userId, email, role, exp, iat}`. Passwords
//! are stored as Argon2id PHC strings.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use taskhub_shared::protocol::User;
use taskhub_shared::types::{Role, UserId};

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Signing and verification keys derived from `JWT_SECRET`.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn from_secret(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ServerError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServerError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServerError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                ServerError::Unauthorized("Invalid or expired token".into())
            })
    }
}

pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("Failed to hash password: {e}")))
}

/// `Ok(false)` on a wrong password; an unreadable stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServerError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServerError::Internal(format!("Invalid password hash format: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServerError::Internal(format!("Password verification failed: {e}"))),
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The caller behind a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .ok_or_else(|| ServerError::Unauthorized("No authentication token".into()))?;
        state.tokens.verify(token).map(AuthUser)
    }
}

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.0.user_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Projects, categories and task creation/deletion.
    pub fn require_project_manager(&self) -> Result<(), ServerError> {
        if self.role().can_manage_projects() {
            Ok(())
        } else {
            Err(ServerError::Forbidden("Only managers and admins may do this".into()))
        }
    }

    /// Account creation, deletion and role changes.
    pub fn require_user_admin(&self) -> Result<(), ServerError> {
        if self.role().can_manage_users() {
            Ok(())
        } else {
            Err(ServerError::Forbidden("Only admins may manage users".into()))
        }
    }

    pub fn require_self_or_admin(&self, user_id: UserId) -> Result<(), ServerError> {
        if self.id() == user_id || self.role().can_manage_users() {
            Ok(())
        } else {
            Err(ServerError::Forbidden("You may only edit your own profile".into()))
        }
    }
}
