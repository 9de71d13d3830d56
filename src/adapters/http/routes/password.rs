use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

#[derive(Deserialize)]
struct ForgotPayload {
    email: String,
}

#[derive(Deserialize)]
struct ResetPayload {
    token: String,
    new_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/forgot", post(forgot))
        .route("/reset", post(reset))
}

async fn forgot(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPayload>,
) -> AppResult<impl IntoResponse> {
    // An unknown email gets the same answer as a known one, so the
    // endpoint cannot be used to enumerate accounts.
    match app_state
        .password_reset_use_cases
        .request_reset(&payload.email)
        .await
    {
        Ok(()) | Err(AppError::NotFound) => Ok(StatusCode::ACCEPTED),
        Err(err) => Err(err),
    }
}

async fn reset(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.new_password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".into(),
        ));
    }
    app_state
        .password_reset_use_cases
        .complete_reset(&payload.token, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
