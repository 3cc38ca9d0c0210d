use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use chrono::NaiveDate;
use db::{
    TransactionTrait,
    models::user::{CreateUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils_jwt::{JwtKeys, TokenPair, TokenType};
use uuid::Uuid;

use super::error::{Result, ServiceError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 150;

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub can_be_contacted: bool,
    #[serde(default)]
    pub can_data_be_shared: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub confirm_deletion: bool,
}

fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash could not be parsed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(
            "password",
            format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::validation(
            "password",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ServiceError::validation("username", "This field may not be blank."));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ServiceError::validation(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LENGTH} characters."),
        ));
    }
    Ok(())
}

/// Registration, credentials and the self-service account lifecycle.
#[derive(Clone, Default)]
pub struct AccountService;

impl AccountService {
    pub fn new() -> Self {
        Self
    }

    pub async fn register(&self, pool: &db::DbPool, payload: RegisterRequest) -> Result<User> {
        validate_username(&payload.username)?;
        if payload.password != payload.password_confirm {
            return Err(ServiceError::validation(
                "password_confirm",
                "The two password fields didn't match.",
            ));
        }
        validate_password(&payload.password)?;

        let data = CreateUser {
            username: payload.username.trim().to_string(),
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash: hash_password(&payload.password)?,
            birth_date: payload.birth_date,
            can_be_contacted: payload.can_be_contacted,
            can_data_be_shared: payload.can_data_be_shared,
        };
        let user = User::create(pool, &data, Uuid::new_v4()).await?;
        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn login(
        &self,
        pool: &db::DbPool,
        keys: &JwtKeys,
        payload: LoginRequest,
    ) -> Result<TokenPair> {
        let Some((user, hash)) = User::find_credentials(pool, &payload.username).await? else {
            tracing::warn!("Login attempt for unknown username");
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(&payload.password, &hash) {
            tracing::warn!("Login attempt with a wrong password for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(keys.issue_pair(user.id)?)
    }

    pub async fn refresh(
        &self,
        pool: &db::DbPool,
        keys: &JwtKeys,
        payload: RefreshRequest,
    ) -> Result<AccessToken> {
        let claims = keys.verify(&payload.refresh, TokenType::Refresh)?;
        if User::find_by_id(pool, claims.sub).await?.is_none() {
            return Err(ServiceError::Unauthenticated);
        }
        Ok(AccessToken {
            access: keys.issue_access(claims.sub)?,
        })
    }

    /// Resolves a bearer access token to a stored user.
    pub async fn authenticate(&self, pool: &db::DbPool, keys: &JwtKeys, token: &str) -> Result<User> {
        let claims = keys
            .verify(token, TokenType::Access)
            .map_err(|_| ServiceError::Unauthenticated)?;
        User::find_by_id(pool, claims.sub)
            .await?
            .ok_or(ServiceError::Unauthenticated)
    }

    pub async fn profile(&self, pool: &db::DbPool, principal: Uuid) -> Result<User> {
        User::find_by_id(pool, principal)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub async fn update_profile(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        payload: UpdateUser,
    ) -> Result<User> {
        Ok(User::update(pool, principal, &payload).await?)
    }

    /// Erases the principal and everything they own. Requires explicit confirmation.
    pub async fn delete_account(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        payload: DeleteAccountRequest,
    ) -> Result<()> {
        if !payload.confirm_deletion {
            return Err(ServiceError::validation(
                "confirm_deletion",
                "You must confirm the deletion of your account.",
            ));
        }

        let tx = pool.begin().await?;
        let rows_affected = User::erase(&tx, principal).await?;
        tx.commit().await?;

        if rows_affected == 0 {
            return Err(ServiceError::NotFound("User"));
        }
        tracing::info!("Erased account {}", principal);
        Ok(())
    }
}
