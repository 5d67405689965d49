//! 开发环境示例数据

use chrono::NaiveDate;
use rideops_domain::entities::{Employee, NewRideRequest, RideRequest, RideStatus, Rider, Shift};
use rideops_errors::DispatchResult;
use tracing::info;

use crate::controller::DispatchController;

struct SampleRide {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    pickup: &'static str,
    dropoff: &'static str,
    hour: u32,
}

const SAMPLE_RIDES: [SampleRide; 4] = [
    SampleRide {
        name: "Alice Student",
        email: "alice@usc.edu",
        phone: "213-555-0101",
        pickup: "Leavey Library",
        dropoff: "Doheny Library",
        hour: 9,
    },
    SampleRide {
        name: "Bob Faculty",
        email: "bob@usc.edu",
        phone: "213-555-0102",
        pickup: "SGM",
        dropoff: "VKC",
        hour: 10,
    },
    SampleRide {
        name: "Carol Staff",
        email: "carol@usc.edu",
        phone: "213-555-0103",
        pickup: "Lyon Center",
        dropoff: "RTH",
        hour: 11,
    },
    SampleRide {
        name: "Dan Grad",
        email: "dan@usc.edu",
        phone: "213-555-0104",
        pickup: "USC Village",
        dropoff: "JFF",
        hour: 14,
    },
];

/// 初始员工：四位司机（均未打卡）和调度账号
pub fn default_roster() -> Vec<Employee> {
    vec![
        Employee::driver("emp1", "Jamie"),
        Employee::driver("emp2", "Avery"),
        Employee::driver("emp3", "Casey"),
        Employee::driver("emp4", "Chris"),
        Employee::office("office", "Office"),
    ]
}

pub fn default_shifts() -> Vec<Shift> {
    vec![
        Shift {
            id: "shift1".to_string(),
            employee_id: "emp1".to_string(),
            day_of_week: 0,
            start_time: "08:00".to_string(),
            end_time: "12:00".to_string(),
        },
        Shift {
            id: "shift2".to_string(),
            employee_id: "emp4".to_string(),
            day_of_week: 2,
            start_time: "12:00".to_string(),
            end_time: "19:00".to_string(),
        },
    ]
}

impl DispatchController {
    /// 插入四条指定日期、已审批待认领的示例行程
    ///
    /// 直接写入仓储，不经过审批策略，也不发布事件。
    pub async fn seed_sample_rides(&self, date: NaiveDate) -> DispatchResult<Vec<RideRequest>> {
        let now = self.now();
        let mut seeded = Vec::with_capacity(SAMPLE_RIDES.len());

        for sample in &SAMPLE_RIDES {
            let request = NewRideRequest {
                rider: Rider::new(sample.name, sample.email, sample.phone),
                pickup_location: sample.pickup.to_string(),
                dropoff_location: sample.dropoff.to_string(),
                requested_time: format!("{}T{:02}:00", date.format("%Y-%m-%d"), sample.hour),
            };
            let misses = self.no_show_policy().miss_count_for(sample.email);
            let mut ride = RideRequest::new(request, misses, now);
            ride.status = RideStatus::Approved;
            seeded.push(self.rides().create(ride).await?);
        }

        info!("已插入 {} 条示例行程 ({})", seeded.len(), date);
        Ok(seeded)
    }
}
