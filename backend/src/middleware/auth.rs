use actix_web::HttpRequest;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth as auth_service;

#[derive(Debug, Error)]
pub enum AuthMiddlewareError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid bearer token")]
    InvalidToken,
}

/// Pull the authenticated user ID out of the `Authorization: Bearer` header.
/// Handlers map any failure here to a 401; the variants only matter for logs.
pub fn extract_user_id(req: &HttpRequest, jwt_secret: &str) -> Result<Uuid, AuthMiddlewareError> {
    let token = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthMiddlewareError::InvalidToken)?;

    auth_service::verify_jwt(token, jwt_secret).map_err(|_| AuthMiddlewareError::InvalidToken)
}
