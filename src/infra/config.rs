use std::env;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub database_url: String,
    pub jwt_access_secret: SecretString,
    pub jwt_refresh_secret: SecretString,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub otp_ttl: Duration,
    pub resend_api_key: SecretString,
    pub email_from: String,
    /// Origin links in outgoing emails point at, without a trailing
    /// slash.
    pub app_origin: String,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_access_secret: SecretString = env::var("JWT_ACCESS_SECRET")
            .expect("JWT_ACCESS_SECRET must be set")
            .into();
        let jwt_refresh_secret: SecretString = env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET must be set")
            .into();

        let access_token_ttl_mins: i64 = env::var("ACCESS_TOKEN_TTL_MINS")
            .unwrap_or("15".to_string())
            .parse()
            .expect("ACCESS_TOKEN_TTL_MINS must be a valid number");
        let refresh_token_ttl_days: i64 = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or("30".to_string())
            .parse()
            .expect("REFRESH_TOKEN_TTL_DAYS must be a valid number");
        let reset_token_ttl_mins: i64 = env::var("RESET_TOKEN_TTL_MINS")
            .unwrap_or("15".to_string())
            .parse()
            .expect("RESET_TOKEN_TTL_MINS must be a valid number");
        let otp_ttl_mins: i64 = env::var("OTP_TTL_MINS")
            .unwrap_or("15".to_string())
            .parse()
            .expect("OTP_TTL_MINS must be a valid number");

        let resend_api_key: SecretString = env::var("RESEND_API_KEY")
            .expect("RESEND_API_KEY must be set")
            .into();
        let email_from = env::var("EMAIL_FROM").expect("EMAIL_FROM must be set");

        let app_origin = env::var("APP_ORIGIN").expect("APP_ORIGIN must be set");
        Url::parse(&app_origin).expect("APP_ORIGIN must be a valid URL");
        let app_origin = app_origin.trim_end_matches('/').to_string();

        let cors_origin: HeaderValue = env::var("CORS_ORIGIN")
            .unwrap_or("http://localhost:3000".to_string())
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or("127.0.0.1:3001".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        Self {
            database_url,
            jwt_access_secret,
            jwt_refresh_secret,
            access_token_ttl: Duration::minutes(access_token_ttl_mins),
            refresh_token_ttl: Duration::days(refresh_token_ttl_days),
            reset_token_ttl: Duration::minutes(reset_token_ttl_mins),
            otp_ttl: Duration::minutes(otp_ttl_mins),
            resend_api_key,
            email_from,
            app_origin,
            cors_origin,
            bind_addr,
        }
    }
}
