//! Email/password accounts and bearer-token sessions.

pub mod utils;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries;
use crate::database::models::User;
use crate::error::{AppError, AppResult};

use self::utils::{
    generate_session_token, hash_password, hash_session_token, normalize_email, valid_email,
    verify_password, MIN_PASSWORD_LEN,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A signed-in user plus the raw token that identifies the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    pool: Pool<Sqlite>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(pool: Pool<Sqlite>, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    /// Creates the account and signs it in.
    pub async fn sign_up(&self, req: &SignUpRequest) -> AppResult<Session> {
        let email = normalize_email(&req.email);
        if !valid_email(&email) {
            return Err(AppError::validation("invalid email address"));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let display_name = req
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let password_hash = hash_password(&req.password)?;
        let user = queries::create_user(&self.pool, &email, display_name, &password_hash).await?;
        tracing::info!(user_id = %user.id, "account created");

        self.open_session(user).await
    }

    pub async fn sign_in(&self, req: &SignInRequest) -> AppResult<Session> {
        let email = normalize_email(&req.email);
        let Some(creds) = queries::find_user_by_email(&self.pool, &email).await? else {
            tracing::debug!("sign-in for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(&req.password, &creds.password_hash)? {
            tracing::debug!(user_id = %creds.user.id, "sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        self.open_session(creds.user).await
    }

    /// Ends the session. Unknown tokens are ignored.
    pub async fn sign_out(&self, token: &str) -> AppResult<()> {
        if queries::delete_session(&self.pool, &hash_session_token(token)).await? {
            tracing::info!("session closed");
        }
        Ok(())
    }

    /// Resolves a bearer token to its user if the session is still live.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        queries::find_session_user(&self.pool, &hash_session_token(token), Utc::now())
            .await?
            .ok_or(AppError::Unauthorized)
    }

    pub async fn purge_expired_sessions(&self) -> AppResult<u64> {
        let removed = queries::delete_expired_sessions(&self.pool, Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }

    async fn open_session(&self, user: User) -> AppResult<Session> {
        let token = generate_session_token()?;
        let expires_at = Utc::now() + self.session_ttl;
        queries::insert_session(&self.pool, &hash_session_token(&token), &user.id, expires_at).await?;
        tracing::debug!(user_id = %user.id, %expires_at, "session opened");
        Ok(Session { token, user })
    }
}
