pub mod email_otp;
pub mod refresh_token;
pub mod reset_token;
pub mod session;
pub mod user;
