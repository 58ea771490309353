use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::User;
use crate::repository::UserRepository;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub email: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Applied to every email before it is stored or looked up.
pub(crate) fn normalize_email(raw: &str) -> &str {
    raw.trim()
}

/// Shared by the HTTP endpoint and the `create-user` command.
pub async fn register(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let password_hash = hash_password(password)?;
    let user = users.create_user(email, &password_hash).await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user)
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Email and password are required"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = register(state.users.as_ref(), &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
