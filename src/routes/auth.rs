use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{issue_jwt, verify_password, ACCESS_TOKEN_TTL};
use crate::error::AppError;
use crate::routes::users::normalize_email;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub expires_in: u64,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Incorrect email or password".to_string());

    let user = state
        .users
        .find_by_email(normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Password verification failed");
        return Err(invalid());
    }

    let token = issue_jwt(user.id, &state.config.jwt_secret, ACCESS_TOKEN_TTL)?;

    tracing::info!(user_id = %user.id, "Login successful");
    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        token,
        expires_in: ACCESS_TOKEN_TTL.as_secs(),
    }))
}
