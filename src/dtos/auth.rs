use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::model::user::User;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterDto {
    #[validate(length(min = 1, max = 64, message = "user_id must be 1-64 characters"))]
    pub user_id: String,
    #[validate(length(min = 6, max = 100, message = "password must be between 6 and 100 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginDto {
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponseDto {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenResponseDto {
    pub fn new(access_token: String, expires_in_minutes: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: expires_in_minutes * 60,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponseDto {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponseDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_id: u.user_id,
            created_at: u.created_at,
        }
    }
}

/// HMAC-JWT claims (§6): `sub` carries the stable `user_id` string the
/// rest of the core treats as an opaque verified principal id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}
