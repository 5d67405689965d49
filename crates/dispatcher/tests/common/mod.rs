#![allow(dead_code)]

use std::sync::Arc;

use rideops_config::{PolicyConfig, PolicyConfigHandle};
use rideops_dispatcher::DispatchController;
use rideops_domain::entities::{Caller, RideRequest};
use rideops_domain::repositories::RideEventPublisher;
use rideops_infrastructure::{
    InMemoryEmployeeRepository, InMemoryMissLedger, InMemoryRideRepository,
    InMemoryShiftRepository,
};
use rideops_testing_utils::{
    default_roster, NewRideRequestBuilder, RecordingEventPublisher, TestClock,
};

pub struct Harness {
    pub controller: DispatchController,
    pub rides: Arc<InMemoryRideRepository>,
    pub ledger: Arc<InMemoryMissLedger>,
    pub publisher: RecordingEventPublisher,
    pub config: PolicyConfigHandle,
    pub clock: TestClock,
}

/// emp1 和 emp2 已打卡，emp3 和 emp4 未打卡
pub fn harness() -> Harness {
    harness_with(PolicyConfig::default())
}

pub fn harness_with(policy: PolicyConfig) -> Harness {
    let publisher = RecordingEventPublisher::new();
    build(policy, publisher.clone(), Arc::new(publisher.clone()))
}

pub fn harness_with_publisher(publisher: Arc<dyn RideEventPublisher>) -> Harness {
    build(
        PolicyConfig::default(),
        RecordingEventPublisher::new(),
        publisher,
    )
}

fn build(
    policy: PolicyConfig,
    recorder: RecordingEventPublisher,
    publisher: Arc<dyn RideEventPublisher>,
) -> Harness {
    let roster: Vec<_> = default_roster()
        .into_iter()
        .map(|mut employee| {
            if employee.id == "emp1" || employee.id == "emp2" {
                employee.active = true;
            }
            employee
        })
        .collect();

    let rides = Arc::new(InMemoryRideRepository::new());
    let ledger = Arc::new(InMemoryMissLedger::new());
    let config = PolicyConfigHandle::new(policy);
    let clock = TestClock::fixed();
    let clock_source = clock.clone();

    let controller = DispatchController::new(
        rides.clone(),
        Arc::new(InMemoryEmployeeRepository::with_employees(roster)),
        Arc::new(InMemoryShiftRepository::new()),
        ledger.clone(),
        publisher,
        config.clone(),
    )
    .with_clock(Arc::new(move || clock_source.now()));

    Harness {
        controller,
        rides,
        ledger,
        publisher: recorder,
        config,
        clock,
    }
}

pub fn driver(id: &str) -> Caller {
    Caller::driver(id)
}

impl Harness {
    pub async fn submit_for(&self, email: &str, requested_time: &str) -> RideRequest {
        self.controller
            .submit(
                &Caller::Rider,
                NewRideRequestBuilder::new()
                    .with_rider_email(email)
                    .with_requested_time(requested_time)
                    .build(),
            )
            .await
            .expect("submit should succeed")
    }

    pub async fn submit(&self) -> RideRequest {
        self.submit_for("alice@usc.edu", rideops_testing_utils::WEEKDAY_MORNING)
            .await
    }

    pub async fn approved(&self) -> RideRequest {
        let ride = self.submit().await;
        self.controller
            .approve(&Caller::Office, ride.id)
            .await
            .expect("approve should succeed")
    }

    pub async fn scheduled(&self, driver_id: &str) -> RideRequest {
        let ride = self.approved().await;
        self.controller
            .claim(&driver(driver_id), ride.id, driver_id)
            .await
            .expect("claim should succeed")
    }

    /// 走到 driver_arrived_grace
    pub async fn arrived(&self, driver_id: &str) -> RideRequest {
        let ride = self.scheduled(driver_id).await;
        let caller = driver(driver_id);
        self.controller
            .start_trip(&caller, ride.id)
            .await
            .expect("start trip should succeed");
        self.controller
            .arrive(&caller, ride.id)
            .await
            .expect("arrive should succeed")
    }
}
