//! Test doubles for the domain ports

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rideops_domain::{
    entities::RideStatus, events::RideEvent, repositories::RideEventPublisher,
};
use rideops_errors::{DispatchError, DispatchResult};

/// Event publisher that keeps every published event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<RideEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following publish fail after recording the event
    pub fn fail_publishes(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn events(&self) -> Vec<RideEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Target statuses in publish order
    pub fn transitions(&self) -> Vec<RideStatus> {
        self.events.lock().unwrap().iter().map(|e| e.to).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl RideEventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &RideEvent) -> DispatchResult<()> {
        self.events.lock().unwrap().push(event.clone());
        if *self.fail.lock().unwrap() {
            return Err(DispatchError::EventPublish("recording publisher set to fail".into()));
        }
        Ok(())
    }
}
