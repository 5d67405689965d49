use std::sync::Arc;

use chrono::{DateTime, Utc};
use rideops_domain::{
    entities::RideRequest,
    repositories::{EmployeeRepository, RideRepository},
};
use rideops_errors::{DispatchError, DispatchResult};
use tracing::{debug, info};
use uuid::Uuid;

/// 认领仲裁：保证一个行程最多只被一位司机认领
///
/// 司机记录在临界区之外读取，所有检查与写入在同一次 compare-and-set 中完成。
pub struct ClaimArbiter {
    rides: Arc<dyn RideRepository>,
    employees: Arc<dyn EmployeeRepository>,
}

impl ClaimArbiter {
    pub fn new(rides: Arc<dyn RideRepository>, employees: Arc<dyn EmployeeRepository>) -> Self {
        Self { rides, employees }
    }

    /// 检查顺序: 行程存在 -> 未被认领 -> 状态为 approved -> 司机存在 -> 司机已打卡
    pub async fn claim(
        &self,
        ride_id: Uuid,
        driver_id: &str,
        now: DateTime<Utc>,
    ) -> DispatchResult<RideRequest> {
        let driver = self
            .employees
            .get_by_id(driver_id)
            .await?
            .filter(|employee| employee.is_driver());
        debug!("司机 {} 尝试认领行程 {}", driver_id, ride_id);

        let requested = driver_id.to_string();
        let ride = self
            .rides
            .compare_and_set(
                ride_id,
                Box::new(move |ride| {
                    ride.ensure_claimable()?;
                    let driver =
                        driver.ok_or_else(|| DispatchError::employee_not_found(requested))?;
                    if !driver.active {
                        return Err(DispatchError::DriverInactive {
                            driver_id: driver.id,
                        });
                    }
                    ride.assign_driver(&driver.id, now)
                }),
            )
            .await?;

        info!("行程 {} 已由司机 {} 认领", ride.id, driver_id);
        Ok(ride)
    }
}
