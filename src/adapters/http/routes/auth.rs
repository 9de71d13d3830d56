use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

#[derive(Deserialize)]
struct RegisterPayload {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshPayload {
    refresh_token: String,
}

#[derive(Serialize)]
struct UserBody {
    id: Uuid,
    email: String,
    status: String,
    roles: Vec<String>,
}

#[derive(Serialize)]
struct LoginBody {
    access_token: String,
    refresh_token: String,
    session_id: Uuid,
    user: UserBody,
}

#[derive(Serialize)]
struct TokenPairBody {
    access_token: String,
    refresh_token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
}

async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .auth_use_cases
        .register(&payload.email, &payload.password)
        .await?;

    // Kick off verification; the account exists either way.
    if let Err(err) = app_state
        .email_verification_use_cases
        .request_otp(&user.email)
        .await
    {
        warn!(user_id = %user.id, error = %err, "failed to issue verification code after register");
    }

    Ok((
        StatusCode::CREATED,
        Json(UserBody {
            id: user.id,
            email: user.email,
            status: user.status.as_str().to_string(),
            roles: user.roles,
        }),
    ))
}

async fn login(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    let device_info = header_str(&headers, "user-agent");
    let ip_address = header_str(&headers, "x-forwarded-for");

    let outcome = app_state
        .auth_use_cases
        .login(
            &payload.email,
            &payload.password,
            device_info.as_deref(),
            ip_address.as_deref(),
        )
        .await?;

    Ok(Json(LoginBody {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        session_id: outcome.session.id,
        user: UserBody {
            id: outcome.user.id,
            email: outcome.user.email,
            status: outcome.user.status.as_str().to_string(),
            roles: outcome.user.roles,
        },
    }))
}

async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> AppResult<impl IntoResponse> {
    let pair = app_state
        .auth_use_cases
        .rotate(&payload.refresh_token)
        .await?;
    Ok(Json(TokenPairBody {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

async fn logout(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let token = bearer_token(&headers).ok_or(AppError::InvalidToken)?;
    let claims = app_state.auth_use_cases.verify_access_token(&token)?;
    let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;
    let session_id: Uuid = claims.sid.parse().map_err(|_| AppError::InvalidToken)?;

    app_state.auth_use_cases.logout(user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}
