//! Test data builders for creating test entities
//!
//! Every builder starts from data that passes all policies: a Tuesday
//! 10:00 request by a rider with no misses.

use chrono::{DateTime, Utc};
use rideops_domain::entities::{
    Employee, EmployeeRole, NewRideRequest, NewShift, RideRequest, RideStatus, Rider,
};
use uuid::Uuid;

use crate::helpers::WEEKDAY_MORNING;

/// Builder for creating test RideRequest entities
pub struct RideRequestBuilder {
    ride: RideRequest,
}

impl RideRequestBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            ride: RideRequest {
                id: Uuid::new_v4(),
                rider: Rider::new("Alice Student", "alice@usc.edu", "213-555-0101"),
                pickup_location: "Leavey Library".to_string(),
                dropoff_location: "Doheny Library".to_string(),
                requested_time: WEEKDAY_MORNING.to_string(),
                status: RideStatus::Pending,
                assigned_driver_id: None,
                grace_start_time: None,
                consecutive_misses: 0,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.ride.id = id;
        self
    }

    /// Statuses past `approved` also need [`RideRequestBuilder::with_driver`]
    pub fn with_status(mut self, status: RideStatus) -> Self {
        self.ride.status = status;
        self
    }

    pub fn with_driver(mut self, driver_id: &str) -> Self {
        self.ride.assigned_driver_id = Some(driver_id.to_string());
        self
    }

    pub fn with_rider_email(mut self, email: &str) -> Self {
        self.ride.rider.email = email.to_string();
        self
    }

    pub fn with_requested_time(mut self, requested_time: &str) -> Self {
        self.ride.requested_time = requested_time.to_string();
        self
    }

    pub fn with_misses(mut self, misses: u32) -> Self {
        self.ride.consecutive_misses = misses;
        self
    }

    pub fn with_grace_start(mut self, at: DateTime<Utc>) -> Self {
        self.ride.grace_start_time = Some(at);
        self
    }

    pub fn build(self) -> RideRequest {
        self.ride
    }
}

impl Default for RideRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for ride submissions
pub struct NewRideRequestBuilder {
    request: NewRideRequest,
}

impl NewRideRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: NewRideRequest {
                rider: Rider::new("Alice Student", "alice@usc.edu", "213-555-0101"),
                pickup_location: "Leavey Library".to_string(),
                dropoff_location: "Doheny Library".to_string(),
                requested_time: WEEKDAY_MORNING.to_string(),
            },
        }
    }

    pub fn with_rider(mut self, name: &str, email: &str) -> Self {
        self.request.rider.name = name.to_string();
        self.request.rider.email = email.to_string();
        self
    }

    pub fn with_rider_email(mut self, email: &str) -> Self {
        self.request.rider.email = email.to_string();
        self
    }

    pub fn with_route(mut self, pickup: &str, dropoff: &str) -> Self {
        self.request.pickup_location = pickup.to_string();
        self.request.dropoff_location = dropoff.to_string();
        self
    }

    pub fn with_requested_time(mut self, requested_time: &str) -> Self {
        self.request.requested_time = requested_time.to_string();
        self
    }

    pub fn build(self) -> NewRideRequest {
        self.request
    }
}

impl Default for NewRideRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Employee entities
pub struct EmployeeBuilder {
    employee: Employee,
}

impl EmployeeBuilder {
    pub fn driver(id: &str) -> Self {
        Self {
            employee: Employee::driver(id, &format!("Driver {id}")),
        }
    }

    pub fn office(id: &str) -> Self {
        Self {
            employee: Employee::office(id, &format!("Office {id}")),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.employee.name = name.to_string();
        self
    }

    pub fn with_role(mut self, role: EmployeeRole) -> Self {
        self.employee.role = role;
        self
    }

    pub fn active(mut self) -> Self {
        self.employee.active = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.employee.active = false;
        self
    }

    pub fn build(self) -> Employee {
        self.employee
    }
}

/// Builder for shift submissions
pub struct NewShiftBuilder {
    shift: NewShift,
}

impl NewShiftBuilder {
    pub fn new(employee_id: &str) -> Self {
        Self {
            shift: NewShift {
                employee_id: employee_id.to_string(),
                day_of_week: 0,
                start_time: "08:00".to_string(),
                end_time: "12:00".to_string(),
            },
        }
    }

    pub fn on_day(mut self, day_of_week: u8) -> Self {
        self.shift.day_of_week = day_of_week;
        self
    }

    pub fn between(mut self, start: &str, end: &str) -> Self {
        self.shift.start_time = start.to_string();
        self.shift.end_time = end.to_string();
        self
    }

    pub fn build(self) -> NewShift {
        self.shift
    }
}
