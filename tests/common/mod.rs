//! Common test utilities for incident-autofill
//!
//! - [`portal`]: a scripted portal implementing the driver traits
//! - [`fixtures`]: configuration, spreadsheets and request bodies

pub mod fixtures;
pub mod portal;

pub use fixtures::{sheet, test_config};
pub use portal::{ScriptedFactory, ScriptedPortal};

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err and return the error
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

/// Initialise the full application around an `AppState`
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(incident_autofill::server::HttpServer::create_app(
            actix_web::web::Data::new($state),
        ))
        .await
    };
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: std::time::Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    condition()
}
