use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        email::resend::ResendEmailSender, http::app_state::AppState,
        persistence::PostgresPersistence,
    },
    application::{
        ports::{hasher::SecretHasher, notifier::EmailSender},
        use_cases::{
            auth::{AuthUseCases, RefreshTokenRepo, TokenConfig, UserRepo},
            email_verification::{EmailOtpRepo, EmailVerificationUseCases},
            password_reset::{PasswordResetUseCases, ResetTokenRepo},
            session::{SessionManager, SessionRepo},
        },
    },
    infra::{config::AppConfig, db::init_db, hasher::Argon2Hasher},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let user_repo = postgres_arc.clone() as Arc<dyn UserRepo>;
    let session_repo = postgres_arc.clone() as Arc<dyn SessionRepo>;
    let refresh_repo = postgres_arc.clone() as Arc<dyn RefreshTokenRepo>;
    let reset_repo = postgres_arc.clone() as Arc<dyn ResetTokenRepo>;
    let otp_repo = postgres_arc.clone() as Arc<dyn EmailOtpRepo>;

    let hasher = Arc::new(Argon2Hasher) as Arc<dyn SecretHasher>;
    let email = Arc::new(ResendEmailSender::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    )) as Arc<dyn EmailSender>;

    let tokens = Arc::new(TokenConfig {
        access_secret: config.jwt_access_secret.clone(),
        refresh_secret: config.jwt_refresh_secret.clone(),
        access_ttl: config.access_token_ttl,
        refresh_ttl: config.refresh_token_ttl,
    });

    let sessions = SessionManager::new(session_repo);
    let auth_use_cases = AuthUseCases::new(
        user_repo.clone(),
        refresh_repo,
        sessions,
        hasher.clone(),
        tokens,
    );
    let password_reset_use_cases = PasswordResetUseCases::new(
        user_repo.clone(),
        reset_repo,
        hasher,
        email.clone(),
        config.app_origin.clone(),
        config.reset_token_ttl,
    );
    let email_verification_use_cases =
        EmailVerificationUseCases::new(user_repo, otp_repo, email, config.otp_ttl);

    Ok(AppState {
        config: Arc::new(config),
        auth_use_cases: Arc::new(auth_use_cases),
        password_reset_use_cases: Arc::new(password_reset_use_cases),
        email_verification_use_cases: Arc::new(email_verification_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gatehouse=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
