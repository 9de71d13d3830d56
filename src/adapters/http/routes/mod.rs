pub mod auth;
pub mod password;
pub mod verify;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        auth::router()
            .nest("/password", password::router())
            .nest("/verify", verify::router()),
    )
}
