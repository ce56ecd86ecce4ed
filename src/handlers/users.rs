use axum::extract::{Extension, Path};
use uuid::Uuid;

use crate::database::models::user::UserProfile;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::policy::{self, Principal};
use crate::services::user_service::{MemberView, UserService};

/// GET /api/users - member directory with workload counts
pub async fn list(Extension(principal): Extension<Principal>) -> ApiResult<Vec<MemberView>> {
    policy::require_admin(&principal)?;

    let service = UserService::new().await?;
    let members = service.list_members().await?;
    Ok(ApiResponse::list(members))
}

/// GET /api/users/:id
pub async fn get(
    Extension(_principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserProfile> {
    let service = UserService::new().await?;
    let user = service.get_user(id).await?;
    Ok(ApiResponse::success(user))
}
