use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::dtos::Claims;
use crate::state::AppState;

/// The verified principal id extracted from a bearer token (§6): opaque
/// to the rest of the core beyond being a stable string.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .ok_or((StatusCode::UNAUTHORIZED, "missing auth".to_string()))?;
        let token = auth_header
            .to_str()
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid header".to_string()))?;
        let token = token
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "invalid token".to_string()))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid token".to_string()))?;

        Ok(AuthUser(decoded.claims.sub))
    }
}
