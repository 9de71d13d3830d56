use async_trait::async_trait;

use crate::app_error::AppResult;

/// Outbound email delivery. Failures are logged by the calling use
/// case and never roll back already-committed token state.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}
