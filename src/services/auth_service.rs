use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{self, Argon2, PasswordHash, PasswordHasher, PasswordVerifier as _};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use thiserror::Error;

use crate::dtos::{Claims, LoginDto, RegisterDto};
use crate::errors::AppError;
use crate::model::user::User;
use crate::repository::UserRepository;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("a user with that id already exists")]
    DuplicateUser,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Minimal HMAC-JWT issuer/verifier (§1, §10): authentication is an
/// external collaborator the core treats as an opaque verified principal
/// id, but is still carried at implementation quality matching the core.
#[derive(Clone)]
pub struct AuthService {
    repo: UserRepository,
    jwt_secret: String,
    jwt_expiry_minutes: i64,
}

impl AuthService {
    pub fn new(repo: UserRepository, jwt_secret: String, jwt_expiry_minutes: i64) -> Self {
        Self {
            repo,
            jwt_secret,
            jwt_expiry_minutes,
        }
    }

    pub async fn register(&self, dto: RegisterDto) -> Result<User, AuthError> {
        if self.repo.find_by_user_id(&dto.user_id).await?.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(dto.password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();

        Ok(self.repo.create(&dto.user_id, &password_hash).await?)
    }

    pub async fn login(&self, dto: LoginDto) -> Result<String, AuthError> {
        let user = self
            .repo
            .find_by_user_id(&dto.user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(dto.password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.issue_token(&user.user_id)
    }

    fn issue_token(&self, user_id: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.jwt_expiry_minutes * 60,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DuplicateUser => AppError::DuplicateUser,
            AuthError::InvalidCredentials => AppError::Unauthenticated,
            AuthError::Database(e) => AppError::Database(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
