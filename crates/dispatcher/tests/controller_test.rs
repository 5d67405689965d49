mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use common::{driver, harness, harness_with, harness_with_publisher};
use rideops_config::{AppConfig, PolicyConfig};
use rideops_domain::entities::{Caller, RideStatus};
use rideops_errors::DispatchError;
use rideops_testing_utils::{
    NewRideRequestBuilder, NewShiftBuilder, SATURDAY_MORNING, WEEKDAY_AFTER_CLOSING,
    WEEKDAY_CLOSING, WEEKDAY_OPENING,
};
use uuid::Uuid;

#[tokio::test]
async fn test_submit_snapshots_ledger_count() {
    let h = harness();
    h.controller.no_show_policy().record_no_show("alice@usc.edu");
    h.controller.no_show_policy().record_no_show("alice@usc.edu");

    let ride = h.submit().await;
    assert_eq!(ride.status, RideStatus::Pending);
    assert_eq!(ride.consecutive_misses, 2);
    assert!(ride.assigned_driver_id.is_none());
    assert_eq!(ride.created_at, h.clock.now());

    let events = h.publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "ride.submitted");
    assert_eq!(events[0].actor, "rider");
}

#[tokio::test]
async fn test_submit_requires_rider_email() {
    let h = harness();
    let err = h
        .controller
        .submit(
            &Caller::Rider,
            NewRideRequestBuilder::new().with_rider_email("   ").build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));
    assert!(h.controller.list_rides(None).await.unwrap().is_empty());
    assert_eq!(h.publisher.count(), 0);
}

#[tokio::test]
async fn test_service_hour_bounds() {
    let h = harness();
    for time in [WEEKDAY_OPENING, WEEKDAY_CLOSING] {
        let ride = h.submit_for("alice@usc.edu", time).await;
        assert!(h.controller.approve(&Caller::Office, ride.id).await.is_ok(), "{time}");
    }
    for time in [WEEKDAY_AFTER_CLOSING, SATURDAY_MORNING, "next tuesday"] {
        let ride = h.submit_for("alice@usc.edu", time).await;
        let err = h.controller.approve(&Caller::Office, ride.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::OutOfServiceHours), "{time}");
    }
}

#[tokio::test]
async fn test_suspension_is_checked_before_service_hours() {
    let h = harness();
    for _ in 0..5 {
        h.controller.no_show_policy().record_no_show("alice@usc.edu");
    }
    let ride = h.submit_for("alice@usc.edu", SATURDAY_MORNING).await;
    let err = h.controller.approve(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::SuspendedRider { .. }));
}

#[tokio::test]
async fn test_reload_changes_eligibility_between_calls() {
    let h = harness();
    let ride = h.submit_for("alice@usc.edu", SATURDAY_MORNING).await;
    assert!(h.controller.approve(&Caller::Office, ride.id).await.is_err());

    let mut config = AppConfig::default();
    config.service_hours.operating_days.push("sat".to_string());
    h.config.reload(&config).unwrap();

    let ride = h.controller.approve(&Caller::Office, ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Approved);
}

#[tokio::test]
async fn test_reload_changes_suspension_threshold() {
    let h = harness();
    h.controller.no_show_policy().record_no_show("alice@usc.edu");
    h.controller.no_show_policy().record_no_show("alice@usc.edu");
    let ride = h.submit().await;

    let mut config = AppConfig::default();
    config.no_show.suspension_threshold = 2;
    h.config.reload(&config).unwrap();

    let err = h.controller.approve(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::SuspendedRider {
            misses: 2,
            threshold: 2
        }
    ));
}

#[tokio::test]
async fn test_only_office_can_approve_or_deny() {
    let h = harness();
    let ride = h.submit().await;

    for caller in [Caller::Rider, driver("emp1")] {
        let err = h.controller.approve(&caller, ride.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
        let err = h.controller.deny(&caller, ride.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
    }
    assert_eq!(
        h.controller.get_ride(ride.id).await.unwrap().status,
        RideStatus::Pending
    );
}

#[tokio::test]
async fn test_unknown_ride_is_not_found() {
    let h = harness();
    let id = Uuid::new_v4();

    assert!(h.controller.get_ride(id).await.unwrap_err().is_not_found());
    assert!(h
        .controller
        .approve(&Caller::Office, id)
        .await
        .unwrap_err()
        .is_not_found());
    for driver_id in ["emp1", "emp3", "ghost"] {
        let err = h
            .controller
            .claim(&driver(driver_id), id, driver_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::RideNotFound { .. }), "{driver_id}: {err}");
    }
    assert!(h
        .controller
        .complete(&Caller::Office, id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_claim_checks_ride_before_driver() {
    let h = harness();
    let pending = h.submit().await;

    // emp3 未打卡，但行程状态先于司机检查
    for driver_id in ["emp3", "ghost"] {
        let err = h
            .controller
            .claim(&Caller::Office, pending.id, driver_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition { .. }), "{driver_id}: {err}");
    }

    let scheduled = h.scheduled("emp1").await;
    let err = h
        .controller
        .claim(&driver("emp3"), scheduled.id, "emp3")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::AlreadyAssigned { .. }));

    let approved = h.approved().await;
    let err = h
        .controller
        .claim(&driver("emp3"), approved.id, "emp3")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::DriverInactive { .. }));
    let err = h
        .controller
        .claim(&Caller::Office, approved.id, "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::EmployeeNotFound { .. }));
    assert_eq!(
        h.controller.get_ride(approved.id).await.unwrap().status,
        RideStatus::Approved
    );
}

#[tokio::test]
async fn test_authorization_is_checked_before_ride_lookup() {
    let h = harness();
    let id = Uuid::new_v4();

    for caller in [Caller::Rider, driver("emp1")] {
        let err = h.controller.approve(&caller, id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
        let err = h.controller.deny(&caller, id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
    }
    let err = h.controller.claim(&Caller::Rider, id, "emp1").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
    let err = h.controller.claim(&driver("emp2"), id, "emp1").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    assert!(h.controller.deny(&Caller::Office, id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_transitions_only_move_forward() {
    let h = harness();
    let ride = h.submit().await;

    let err = h.controller.start_trip(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    let err = h.controller.arrive(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    let err = h.controller.complete(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));

    h.controller.deny(&Caller::Office, ride.id).await.unwrap();
    let err = h.controller.approve(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    let err = h.controller.deny(&Caller::Office, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_completed_ride_is_terminal() {
    let h = harness();
    let ride = h.arrived("emp1").await;
    let ride = h.controller.complete(&driver("emp1"), ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Completed);
    assert!(ride.grace_start_time.is_some());
    assert!(ride.is_assigned_to("emp1"));

    let office = Caller::Office;
    assert!(h.controller.complete(&office, ride.id).await.is_err());
    assert!(h.controller.mark_no_show(&office, ride.id).await.is_err());
    assert!(h.controller.arrive(&office, ride.id).await.is_err());
    assert!(h.controller.claim(&office, ride.id, "emp2").await.is_err());
    assert_eq!(
        h.controller.get_ride(ride.id).await.unwrap().status,
        RideStatus::Completed
    );
}

#[tokio::test]
async fn test_claim_authorization() {
    let h = harness();
    let ride = h.approved().await;

    let err = h.controller.claim(&Caller::Rider, ride.id, "emp1").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
    let err = h.controller.claim(&driver("emp2"), ride.id, "emp1").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    let ride = h.controller.claim(&Caller::Office, ride.id, "emp1").await.unwrap();
    assert!(ride.is_assigned_to("emp1"));
}

#[tokio::test]
async fn test_claim_requires_clock_in() {
    let h = harness();
    let ride = h.approved().await;
    let emp3 = driver("emp3");

    let err = h.controller.claim(&emp3, ride.id, "emp3").await.unwrap_err();
    assert!(matches!(err, DispatchError::DriverInactive { .. }));

    h.controller.clock_in(&emp3, "emp3").await.unwrap();
    let ride = h.controller.claim(&emp3, ride.id, "emp3").await.unwrap();
    assert_eq!(ride.status, RideStatus::Scheduled);

    let err = h.controller.claim(&driver("emp1"), ride.id, "emp1").await.unwrap_err();
    assert!(matches!(err, DispatchError::AlreadyAssigned { .. }));
}

#[tokio::test]
async fn test_driver_actions_restricted_to_assigned_driver() {
    let h = harness();
    let ride = h.scheduled("emp1").await;

    for caller in [driver("emp2"), Caller::Rider] {
        let err = h.controller.start_trip(&caller, ride.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(_)));
    }

    let ride = h.controller.start_trip(&Caller::Office, ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::DriverOnTheWay);
    let ride = h.controller.arrive(&driver("emp1"), ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::DriverArrivedGrace);

    let err = h.controller.complete(&driver("emp2"), ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
    let err = h.controller.mark_no_show(&driver("emp2"), ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
    assert_eq!(h.ledger.len(), 0);
}

#[tokio::test]
async fn test_unrestricted_driver_actions() {
    let h = harness_with(PolicyConfig {
        restrict_to_assigned_driver: false,
        ..PolicyConfig::default()
    });
    let ride = h.scheduled("emp1").await;

    let ride = h.controller.start_trip(&driver("emp2"), ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::DriverOnTheWay);
    assert!(ride.is_assigned_to("emp1"));

    let err = h.controller.arrive(&Caller::Rider, ride.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
}

#[tokio::test]
async fn test_grace_period_enforcement() {
    let h = harness_with(PolicyConfig {
        enforce_grace_period: true,
        ..PolicyConfig::default()
    });
    let ride = h.arrived("emp1").await;
    let d = driver("emp1");

    assert_eq!(
        h.controller.grace_remaining(ride.id).await.unwrap(),
        Some(Duration::minutes(5))
    );

    h.clock.advance(Duration::seconds(90));
    let err = h.controller.mark_no_show(&d, ride.id).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::GracePeriodActive {
            remaining_seconds: 210
        }
    ));
    assert_eq!(h.controller.no_show_policy().miss_count_for("alice@usc.edu"), 0);

    h.clock.advance(Duration::seconds(210));
    assert_eq!(
        h.controller.grace_remaining(ride.id).await.unwrap(),
        Some(Duration::zero())
    );
    let ride = h.controller.mark_no_show(&d, ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::NoShow);
    assert_eq!(h.controller.grace_remaining(ride.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_grace_period_not_enforced_by_default() {
    let h = harness();
    let ride = h.arrived("emp1").await;
    let ride = h.controller.mark_no_show(&driver("emp1"), ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::NoShow);
}

#[tokio::test]
async fn test_complete_allowed_during_grace_period() {
    let h = harness_with(PolicyConfig {
        enforce_grace_period: true,
        ..PolicyConfig::default()
    });
    let ride = h.arrived("emp1").await;
    let ride = h.controller.complete(&driver("emp1"), ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Completed);
}

#[tokio::test]
async fn test_list_by_status_and_summary() {
    let h = harness();
    let pending = h.submit().await;
    let approved = h.approved().await;
    let scheduled = h.scheduled("emp1").await;
    let denied = h.submit().await;
    h.controller.deny(&Caller::Office, denied.id).await.unwrap();

    let ids = |rides: Vec<rideops_domain::entities::RideRequest>| {
        rides.into_iter().map(|r| r.id).collect::<Vec<_>>()
    };
    assert_eq!(
        ids(h.controller.list_rides(Some(RideStatus::Pending)).await.unwrap()),
        vec![pending.id]
    );
    assert_eq!(
        ids(h.controller.list_rides(Some(RideStatus::Approved)).await.unwrap()),
        vec![approved.id]
    );
    assert_eq!(
        ids(h.controller.list_rides(Some(RideStatus::Scheduled)).await.unwrap()),
        vec![scheduled.id]
    );
    assert_eq!(
        ids(h.controller.list_rides(None).await.unwrap()),
        vec![pending.id, approved.id, scheduled.id, denied.id]
    );

    let summary = h.controller.summary().await.unwrap();
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.awaiting_driver(), 1);
    assert_eq!(summary.active(), 1);
    assert_eq!(summary.finished(), 1);
}

#[tokio::test]
async fn test_clock_in_and_out() {
    let h = harness();
    let emp4 = driver("emp4");

    let employee = h.controller.clock_in(&emp4, "emp4").await.unwrap();
    assert!(employee.active);
    let employee = h.controller.clock_out(&Caller::Office, "emp4").await.unwrap();
    assert!(!employee.active);

    let err = h.controller.clock_in(&driver("emp1"), "emp4").await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
    let err = h.controller.clock_in(&Caller::Office, "ghost").await.unwrap_err();
    assert!(matches!(err, DispatchError::EmployeeNotFound { .. }));

    let drivers = h.controller.list_drivers().await.unwrap();
    let active: Vec<&str> = drivers
        .iter()
        .filter(|d| d.active)
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(active, vec!["emp1", "emp2"]);
    assert_eq!(drivers.len(), 4);
}

#[tokio::test]
async fn test_shift_roster() {
    let h = harness();
    let shift = h
        .controller
        .add_shift(
            &Caller::Office,
            NewShiftBuilder::new("emp4").on_day(2).between("12:00", "19:00").build(),
        )
        .await
        .unwrap();
    assert_eq!(shift.employee_id, "emp4");
    assert_eq!(h.controller.list_shifts().await.unwrap(), vec![shift.clone()]);

    let err = h
        .controller
        .remove_shift(&driver("emp4"), &shift.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    h.controller.remove_shift(&Caller::Office, &shift.id).await.unwrap();
    assert!(h.controller.list_shifts().await.unwrap().is_empty());
    let err = h
        .controller
        .remove_shift(&Caller::Office, &shift.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ShiftNotFound { .. }));
}

#[tokio::test]
async fn test_add_shift_validation() {
    let h = harness();
    let office = Caller::Office;

    let err = h
        .controller
        .add_shift(&driver("emp1"), NewShiftBuilder::new("emp1").build())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    let err = h
        .controller
        .add_shift(&office, NewShiftBuilder::new("ghost").build())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::EmployeeNotFound { .. }));

    for shift in [
        NewShiftBuilder::new("emp1").on_day(7).build(),
        NewShiftBuilder::new("emp1").between("12:00", "08:00").build(),
        NewShiftBuilder::new("emp1").between("8am", "12:00").build(),
    ] {
        let err = h.controller.add_shift(&office, shift).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }
    assert!(h.controller.list_shifts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_failure_does_not_roll_back() {
    let h = harness();
    let ride = h.submit().await;
    h.publisher.fail_publishes(true);

    let ride = h.controller.approve(&Caller::Office, ride.id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Approved);
    assert_eq!(
        h.controller.get_ride(ride.id).await.unwrap().status,
        RideStatus::Approved
    );
    assert_eq!(h.publisher.count(), 2);
}

#[tokio::test]
async fn test_rejected_operations_publish_nothing() {
    let h = harness();
    let ride = h.submit_for("alice@usc.edu", SATURDAY_MORNING).await;
    h.publisher.clear();

    assert!(h.controller.approve(&Caller::Office, ride.id).await.is_err());
    assert!(h.controller.claim(&driver("emp1"), ride.id, "emp1").await.is_err());
    assert_eq!(h.publisher.count(), 0);
}

mod mocked_publisher {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use rideops_domain::events::RideEvent;
    use rideops_domain::repositories::RideEventPublisher;
    use rideops_errors::DispatchResult;

    mock! {
        pub Publisher {}

        #[async_trait]
        impl RideEventPublisher for Publisher {
            async fn publish(&self, event: &RideEvent) -> DispatchResult<()>;
        }
    }

    #[tokio::test]
    async fn test_events_carry_transition_and_actor() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.from.is_none() && event.to == RideStatus::Pending)
            .times(1)
            .returning(|_| Ok(()));
        publisher
            .expect_publish()
            .withf(|event| {
                event.from == Some(RideStatus::Pending)
                    && event.to == RideStatus::Denied
                    && event.actor == "office"
                    && event.ride.status == RideStatus::Denied
            })
            .times(1)
            .returning(|_| Err(DispatchError::EventPublish("smtp down".to_string())));

        let h = harness_with_publisher(Arc::new(publisher));
        let ride = h.submit().await;
        let ride = h.controller.deny(&Caller::Office, ride.id).await.unwrap();
        assert_eq!(ride.status, RideStatus::Denied);
    }
}

#[tokio::test]
async fn test_seed_sample_rides() {
    let h = harness();
    let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
    let seeded = h.controller.seed_sample_rides(date).await.unwrap();

    assert_eq!(seeded.len(), 4);
    assert!(seeded.iter().all(|r| r.status == RideStatus::Approved));
    assert_eq!(seeded[0].rider.email, "alice@usc.edu");
    assert_eq!(seeded[0].requested_time, "2025-01-07T09:00");
    assert_eq!(seeded[3].requested_time, "2025-01-07T14:00");
    assert_eq!(h.publisher.count(), 0);

    let ride = h
        .controller
        .claim(&driver("emp1"), seeded[1].id, "emp1")
        .await
        .unwrap();
    assert_eq!(ride.status, RideStatus::Scheduled);
}
