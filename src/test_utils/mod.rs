pub mod mocks;

pub use factories::{
    AuthFixture, TEST_APP_ORIGIN, registered_active_user, test_app_config, test_app_state,
    test_token_config,
};
pub use mocks::{FailingEmailSender, InMemoryStore, RecordingEmailSender, SentEmail};
