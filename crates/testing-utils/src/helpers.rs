//! Test helper utilities and common fixtures

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rideops_domain::entities::Employee;
use tokio::time::sleep;

/// Tuesday 2025-01-07 10:00, inside default service hours
pub const WEEKDAY_MORNING: &str = "2025-01-07T10:00";
/// Tuesday 08:00, first eligible minute
pub const WEEKDAY_OPENING: &str = "2025-01-07T08:00";
/// Tuesday 19:00, last eligible minute
pub const WEEKDAY_CLOSING: &str = "2025-01-07T19:00";
/// Tuesday 19:01
pub const WEEKDAY_AFTER_CLOSING: &str = "2025-01-07T19:01";
/// Saturday 2025-01-11 10:00
pub const SATURDAY_MORNING: &str = "2025-01-11T10:00";

/// Default roster: four drivers (all clocked out) plus the office account
pub fn default_roster() -> Vec<Employee> {
    vec![
        Employee::driver("emp1", "Jamie"),
        Employee::driver("emp2", "Avery"),
        Employee::driver("emp3", "Casey"),
        Employee::driver("emp4", "Chris"),
        Employee::office("office", "Office"),
    ]
}

/// Manually advanced clock for grace period tests
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Starts at 2025-01-07 10:00 UTC
    pub fn fixed() -> Self {
        Self::new(Utc.with_ymd_and_hms(2025, 1, 7, 10, 0, 0).unwrap())
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }

        false
    }
}
