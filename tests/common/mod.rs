//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rezerwacje::captcha::CaptchaSolver;
use rezerwacje::config::ServiceConfig;
use rezerwacje::session::{HttpTransport, RetryPolicy, Session};
use rezerwacje::utils::error::CaptchaError;
use rezerwacje::{Entity, EntityKind, FormRow, Task};

/// Solver answering every captcha with the same text
#[allow(dead_code)]
pub struct FixedSolver(pub &'static str);

impl CaptchaSolver for FixedSolver {
    fn recognize(&self, _image: &[u8]) -> Result<String, CaptchaError> {
        Ok(self.0.to_string())
    }
}

/// Create a test city with queue `queue` and id `{queue}0`
#[allow(dead_code)]
pub fn create_test_city(short_name: &str, queue: &str) -> Arc<Entity> {
    Arc::new(Entity {
        name: format!("City {short_name}"),
        short_name: short_name.to_string(),
        queue: queue.to_string(),
        id: format!("{queue}0"),
        kind: EntityKind::City,
    })
}

/// Create a task for `slot` on `date` (`YYYY-MM-DD`)
#[allow(dead_code)]
pub fn create_test_task(entity: &Arc<Entity>, date: &str, slot: &str) -> Task {
    Task::new(
        Arc::clone(entity),
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        slot,
        Arc::new(vec![FormRow::new("Telefon", "500600700")]),
    )
}

/// Session against a mock server, giving up after `attempts` attempts
#[allow(dead_code)]
pub fn create_test_session(base_url: &str, attempts: u32) -> Session {
    let transport = HttpTransport::new(&ServiceConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 2,
        ..ServiceConfig::default()
    })
    .unwrap();

    Session::new(Arc::new(transport)).with_retry_policy(
        RetryPolicy::bounded(attempts).with_delay(Duration::from_millis(10)),
    )
}
