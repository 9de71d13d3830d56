use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

#[derive(Deserialize)]
struct RequestPayload {
    email: String,
}

#[derive(Deserialize)]
struct ConfirmPayload {
    user_id: Uuid,
    code: String,
}

#[derive(Serialize)]
struct IssuedBody {
    user_id: Uuid,
    expires_at: NaiveDateTime,
}

#[derive(Serialize)]
struct ConfirmedBody {
    id: Uuid,
    email: String,
    status: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(request))
        .route("/confirm", post(confirm))
}

async fn request(
    State(app_state): State<AppState>,
    Json(payload): Json<RequestPayload>,
) -> AppResult<impl IntoResponse> {
    let issued = app_state
        .email_verification_use_cases
        .request_otp(&payload.email)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IssuedBody {
            user_id: issued.user_id,
            expires_at: issued.expires_at,
        }),
    ))
}

async fn confirm(
    State(app_state): State<AppState>,
    Json(payload): Json<ConfirmPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .email_verification_use_cases
        .confirm_otp(payload.user_id, &payload.code)
        .await?;
    Ok(Json(ConfirmedBody {
        id: user.id,
        email: user.email,
        status: user.status.as_str().to_string(),
    }))
}
