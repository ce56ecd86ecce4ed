use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{generate_jwt, hash_password, verify_password};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::task::TaskStatus;
use crate::database::models::user::{User, UserProfile, UserSummary};
use crate::error::ApiError;
use crate::policy::{Principal, Role};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, profile_image_url, created_at, updated_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_image_url: Option<String>,
    pub admin_invite_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Profile plus a freshly minted bearer token, returned by register, login
/// and profile update
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub token: String,
}

impl AuthView {
    fn new(user: User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            profile_image_url: user.profile_image_url,
            token,
        }
    }
}

/// Directory entry: a member plus their workload counts
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub user: UserProfile,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Register a new account. The role is member unless the configured
    /// admin invite token is presented.
    pub async fn register(&self, payload: RegisterRequest) -> Result<AuthView, ApiError> {
        let (name, email, password) = match (payload.name, payload.email, payload.password) {
            (Some(name), Some(email), Some(password))
                if !name.is_empty() && !email.is_empty() && !password.is_empty() =>
            {
                (name, email, password)
            }
            _ => {
                return Err(ApiError::bad_request(
                    "Please provide name, email and password",
                ))
            }
        };

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(ApiError::conflict("User already exists"));
        }

        let invite = config::config().security.admin_invite_token.as_deref();
        let role = match (payload.admin_invite_token.as_deref(), invite) {
            (Some(given), Some(expected)) if given == expected => Role::Admin,
            _ => Role::Member,
        };

        let password_hash = hash_password(&password)?;

        let user: User = sqlx::query_as(&format!(
            "INSERT INTO users (name, email, password_hash, role, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(role)
        .bind(&payload.profile_image_url)
        .fetch_one(&self.pool)
        .await?;

        let token = generate_jwt(user.id)?;
        tracing::info!("Registered user {} ({:?})", user.email, user.role);
        Ok(AuthView::new(user, token))
    }

    /// Authenticate by email and password. Unknown email and wrong password
    /// are indistinguishable to the caller.
    pub async fn login(&self, payload: LoginRequest) -> Result<AuthView, ApiError> {
        let (email, password) = match (payload.email, payload.password) {
            (Some(email), Some(password)) => (email, password),
            _ => return Err(ApiError::bad_request("Please provide email and password")),
        };

        let user: Option<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        let user = match user {
            Some(user) if verify_password(&password, &user.password_hash) => user,
            _ => {
                tracing::warn!("Failed login attempt for {}", email);
                return Err(ApiError::unauthorized("Invalid email or password"));
            }
        };

        let token = generate_jwt(user.id)?;
        Ok(AuthView::new(user, token))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user: Option<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        user.map(UserProfile::from)
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Self-service profile update; re-issues a token so clients can rotate
    /// in place
    pub async fn update_profile(
        &self,
        principal: &Principal,
        patch: ProfilePatch,
    ) -> Result<AuthView, ApiError> {
        let mut user: User =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(principal.id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?;

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(profile_image_url) = patch.profile_image_url {
            user.profile_image_url = Some(profile_image_url);
        }
        if let Some(password) = patch.password {
            user.password_hash = hash_password(&password)?;
        }

        let user: User = sqlx::query_as(&format!(
            "UPDATE users SET name = $1, email = $2, password_hash = $3, \
             profile_image_url = $4, updated_at = now() \
             WHERE id = $5 RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_image_url)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        let token = generate_jwt(user.id)?;
        Ok(AuthView::new(user, token))
    }

    /// Member directory with per-user task counts (three concurrent counts
    /// per member)
    pub async fn list_members(&self) -> Result<Vec<MemberView>, ApiError> {
        let members: Vec<User> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY name"
        ))
        .bind(Role::Member)
        .fetch_all(&self.pool)
        .await?;

        futures::future::try_join_all(members.into_iter().map(|user| async move {
            let (pending, in_progress, completed) = tokio::try_join!(
                self.count_assigned(user.id, TaskStatus::Pending),
                self.count_assigned(user.id, TaskStatus::InProgress),
                self.count_assigned(user.id, TaskStatus::Completed),
            )?;
            Ok::<_, ApiError>(MemberView {
                user: UserProfile::from(user),
                pending_tasks: pending,
                in_progress_tasks: in_progress,
                completed_tasks: completed,
            })
        }))
        .await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        self.profile(user_id).await
    }

    async fn count_assigned(&self, user_id: Uuid, status: TaskStatus) -> Result<i64, ApiError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE $1 = ANY(assigned_to) AND status = $2",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }
}

/// Read-time join: resolve a set of user ids to wire summaries in one query
pub(crate) async fn fetch_user_summaries(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserSummary>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<UserSummary> = sqlx::query_as(
        "SELECT id, name, email, profile_image_url FROM users WHERE id = ANY($1)",
    )
    .bind(ids.to_vec())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}
