use std::sync::Arc;

use crate::{
    application::use_cases::auth::AuthUseCases,
    application::use_cases::email_verification::EmailVerificationUseCases,
    application::use_cases::password_reset::PasswordResetUseCases,
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub password_reset_use_cases: Arc<PasswordResetUseCases>,
    pub email_verification_use_cases: Arc<EmailVerificationUseCases>,
}
