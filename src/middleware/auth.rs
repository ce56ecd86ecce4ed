use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::verify_jwt;
use crate::database::manager::DatabaseManager;
use crate::database::models::user::User;
use crate::error::ApiError;
use crate::policy::Principal;

/// Authentication middleware: validates the bearer token, loads the user
/// record behind it, and injects a [`Principal`] into request extensions.
///
/// Token problems are rejected with 401 before the store is touched; a
/// token whose subject no longer exists is also a 401.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let claims = verify_jwt(&token)?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, role, profile_image_url, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(claims.sub)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| {
        tracing::warn!("Token subject {} no longer exists", claims.sub);
        ApiError::unauthorized("Not authorized, user not found")
    })?;

    let principal = Principal {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    };
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Extract the JWT from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Not authorized, no token".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Not authorized, no token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
