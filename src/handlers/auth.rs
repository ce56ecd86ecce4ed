use axum::{extract::Extension, Json};

use crate::database::models::user::UserProfile;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::policy::Principal;
use crate::services::user_service::{
    AuthView, LoginRequest, ProfilePatch, RegisterRequest, UserService,
};

/// POST /api/auth/register
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<AuthView> {
    let service = UserService::new().await?;
    let view = service.register(payload).await?;
    Ok(ApiResponse::created(view, "User registered successfully"))
}

/// POST /api/auth/login
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<AuthView> {
    let service = UserService::new().await?;
    let view = service.login(payload).await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/auth/profile
pub async fn get_profile(Extension(principal): Extension<Principal>) -> ApiResult<UserProfile> {
    let service = UserService::new().await?;
    let profile = service.profile(principal.id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    Extension(principal): Extension<Principal>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<AuthView> {
    let service = UserService::new().await?;
    let view = service.update_profile(&principal, patch).await?;
    Ok(ApiResponse::with_message(view, "Profile updated successfully"))
}
