use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rideops_config::{PolicyConfigHandle, ValidationUtils};
use rideops_domain::entities::{
    Caller, Employee, NewRideRequest, NewShift, RideAction, RideRequest, RideStatus, Shift,
};
use rideops_domain::events::RideEvent;
use rideops_domain::repositories::{
    EmployeeRepository, MissLedger, RideEventPublisher, RideRepository, ShiftRepository,
};
use rideops_errors::{DispatchError, DispatchResult};

use crate::claim::ClaimArbiter;
use crate::no_show::NoShowPolicy;
use crate::service_hours::ServiceHoursPolicy;

/// 注入的时钟，测试中可替换
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub scheduled: usize,
    pub driver_on_the_way: usize,
    pub driver_arrived_grace: usize,
    pub completed: usize,
    pub no_show: usize,
}

impl DispatchSummary {
    pub fn from_counts(counts: &HashMap<RideStatus, usize>) -> Self {
        let count = |status: RideStatus| counts.get(&status).copied().unwrap_or(0);
        Self {
            pending: count(RideStatus::Pending),
            approved: count(RideStatus::Approved),
            denied: count(RideStatus::Denied),
            scheduled: count(RideStatus::Scheduled),
            driver_on_the_way: count(RideStatus::DriverOnTheWay),
            driver_arrived_grace: count(RideStatus::DriverArrivedGrace),
            completed: count(RideStatus::Completed),
            no_show: count(RideStatus::NoShow),
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.active() + self.finished()
    }

    /// 等待司机认领
    pub fn awaiting_driver(&self) -> usize {
        self.approved
    }

    /// 已有司机且未结束
    pub fn active(&self) -> usize {
        self.scheduled + self.driver_on_the_way + self.driver_arrived_grace
    }

    pub fn finished(&self) -> usize {
        self.denied + self.completed + self.no_show
    }
}

/// 行程状态机，所有行程变更的唯一入口
pub struct DispatchController {
    rides: Arc<dyn RideRepository>,
    employees: Arc<dyn EmployeeRepository>,
    shifts: Arc<dyn ShiftRepository>,
    publisher: Arc<dyn RideEventPublisher>,
    service_hours: ServiceHoursPolicy,
    no_show: NoShowPolicy,
    arbiter: ClaimArbiter,
    config: PolicyConfigHandle,
    clock: Clock,
}

impl DispatchController {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        employees: Arc<dyn EmployeeRepository>,
        shifts: Arc<dyn ShiftRepository>,
        ledger: Arc<dyn MissLedger>,
        publisher: Arc<dyn RideEventPublisher>,
        config: PolicyConfigHandle,
    ) -> Self {
        Self {
            arbiter: ClaimArbiter::new(rides.clone(), employees.clone()),
            service_hours: ServiceHoursPolicy::new(config.clone()),
            no_show: NoShowPolicy::new(ledger, config.clone()),
            rides,
            employees,
            shifts,
            publisher,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn service_hours(&self) -> &ServiceHoursPolicy {
        &self.service_hours
    }

    pub fn no_show_policy(&self) -> &NoShowPolicy {
        &self.no_show
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub(crate) fn rides(&self) -> &Arc<dyn RideRepository> {
        &self.rides
    }

    // ---- 行程状态转换 ----

    pub async fn submit(
        &self,
        caller: &Caller,
        request: NewRideRequest,
    ) -> DispatchResult<RideRequest> {
        let result = self.submit_inner(request).await;
        self.finish("submit", caller, None, result).await
    }

    async fn submit_inner(&self, request: NewRideRequest) -> DispatchResult<RideRequest> {
        if request.rider.email.trim().is_empty() {
            return Err(DispatchError::validation_error("乘客邮箱不能为空"));
        }
        let misses = self.no_show.miss_count_for(&request.rider.email);
        let ride = RideRequest::new(request, misses, self.now());
        self.rides.create(ride).await
    }

    /// 审批：先检查暂停状态，再检查服务时段
    pub async fn approve(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        let result = self.approve_inner(caller, ride_id).await;
        self.finish_action(RideAction::Approve, caller, result).await
    }

    async fn approve_inner(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        require_office(caller, RideAction::Approve)?;
        let no_show = self.no_show.clone();
        let service_hours = self.service_hours.clone();
        let now = self.now();

        self.rides
            .compare_and_set(
                ride_id,
                Box::new(move |ride| {
                    ensure_transition(ride, RideAction::Approve)?;
                    let rider_key = ride.rider_key();
                    if no_show.is_suspended(&rider_key) {
                        return Err(DispatchError::SuspendedRider {
                            misses: no_show.miss_count_for(&rider_key),
                            threshold: no_show.threshold(),
                        });
                    }
                    if !service_hours.is_eligible(&ride.requested_time) {
                        return Err(DispatchError::OutOfServiceHours);
                    }
                    ride.advance(RideAction::Approve, now)
                }),
            )
            .await
    }

    pub async fn deny(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        let result = match require_office(caller, RideAction::Deny) {
            Ok(()) => {
                let now = self.now();
                self.rides
                    .compare_and_set(
                        ride_id,
                        Box::new(move |ride| ride.advance(RideAction::Deny, now)),
                    )
                    .await
            }
            Err(e) => Err(e),
        };
        self.finish_action(RideAction::Deny, caller, result).await
    }

    /// 司机只能为自己认领，调度可以代司机认领
    pub async fn claim(
        &self,
        caller: &Caller,
        ride_id: Uuid,
        driver_id: &str,
    ) -> DispatchResult<RideRequest> {
        let result = match caller {
            Caller::Office => self.arbiter.claim(ride_id, driver_id, self.now()).await,
            Caller::Driver { id } if id == driver_id => {
                self.arbiter.claim(ride_id, driver_id, self.now()).await
            }
            Caller::Driver { id } => Err(DispatchError::forbidden(format!(
                "司机 {id} 不能替司机 {driver_id} 认领行程"
            ))),
            Caller::Rider => Err(DispatchError::forbidden("乘客不能认领行程")),
        };
        self.finish_action(RideAction::Claim, caller, result).await
    }

    pub async fn start_trip(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        self.driver_action(caller, ride_id, RideAction::StartTrip).await
    }

    pub async fn arrive(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        self.driver_action(caller, ride_id, RideAction::Arrive).await
    }

    /// 完成行程并清零乘客连续爽约次数
    pub async fn complete(&self, caller: &Caller, ride_id: Uuid) -> DispatchResult<RideRequest> {
        self.driver_action(caller, ride_id, RideAction::Complete).await
    }

    /// 标记爽约并累加乘客连续爽约次数
    pub async fn mark_no_show(
        &self,
        caller: &Caller,
        ride_id: Uuid,
    ) -> DispatchResult<RideRequest> {
        self.driver_action(caller, ride_id, RideAction::MarkNoShow).await
    }

    async fn driver_action(
        &self,
        caller: &Caller,
        ride_id: Uuid,
        action: RideAction,
    ) -> DispatchResult<RideRequest> {
        let policy = self.config.snapshot();
        let no_show = self.no_show.clone();
        let caller_owned = caller.clone();
        let now = self.now();
        let grace = Duration::minutes(i64::from(policy.grace_period_minutes));

        let result = self
            .rides
            .compare_and_set(
                ride_id,
                Box::new(move |ride| {
                    ensure_transition(ride, action)?;
                    authorize_driver_action(
                        &caller_owned,
                        ride,
                        action,
                        policy.restrict_to_assigned_driver,
                    )?;

                    if action == RideAction::MarkNoShow && policy.enforce_grace_period {
                        let remaining = grace_left(ride, grace, now);
                        if remaining > Duration::zero() {
                            return Err(DispatchError::GracePeriodActive {
                                remaining_seconds: ceil_seconds(remaining),
                            });
                        }
                    }

                    ride.advance(action, now)?;
                    ride.check_invariants()?;

                    // 台账更新放在最后，之后不会再失败
                    match action {
                        RideAction::Complete => {
                            no_show.record_completion(&ride.rider_key());
                            ride.consecutive_misses = 0;
                        }
                        RideAction::MarkNoShow => {
                            ride.consecutive_misses = no_show.record_no_show(&ride.rider_key());
                        }
                        _ => {}
                    }
                    Ok(())
                }),
            )
            .await;

        self.finish_action(action, caller, result).await
    }

    async fn finish_action(
        &self,
        action: RideAction,
        caller: &Caller,
        result: DispatchResult<RideRequest>,
    ) -> DispatchResult<RideRequest> {
        self.finish(action.as_str(), caller, action.source_status(), result)
            .await
    }

    /// 记录日志与指标，成功时发布事件
    async fn finish(
        &self,
        operation: &str,
        caller: &Caller,
        from: Option<RideStatus>,
        result: DispatchResult<RideRequest>,
    ) -> DispatchResult<RideRequest> {
        match &result {
            Ok(ride) => {
                info!(
                    "行程 {} {} -> {} (操作: {}, 调用方: {})",
                    ride.id,
                    from.map_or("-", |status| status.as_str()),
                    ride.status,
                    operation,
                    caller.label()
                );
                counter!("rideops_transitions_total", "to" => ride.status.as_str()).increment(1);
                let event = RideEvent::transition(from, ride, caller.label(), self.now());
                if let Err(e) = self.publisher.publish(&event).await {
                    warn!("发布行程事件 {} 失败: {}", event.event_type(), e);
                }
            }
            Err(e) => {
                warn!("拒绝操作 {} (调用方: {}): {}", operation, caller.label(), e);
                counter!("rideops_rejections_total", "reason" => e.reason_label()).increment(1);
            }
        }
        result
    }

    // ---- 查询 ----

    pub async fn get_ride(&self, ride_id: Uuid) -> DispatchResult<RideRequest> {
        self.rides
            .get_by_id(ride_id)
            .await?
            .ok_or_else(|| DispatchError::ride_not_found(ride_id.to_string()))
    }

    /// 按创建顺序列出行程，可按状态过滤
    pub async fn list_rides(&self, status: Option<RideStatus>) -> DispatchResult<Vec<RideRequest>> {
        match status {
            Some(status) => self.rides.list_by_status(status).await,
            None => self.rides.list().await,
        }
    }

    pub async fn summary(&self) -> DispatchResult<DispatchSummary> {
        let counts = self.rides.count_by_status().await?;
        Ok(DispatchSummary::from_counts(&counts))
    }

    /// 宽限期剩余时间；行程不在 driver_arrived_grace 状态时返回 None
    pub async fn grace_remaining(&self, ride_id: Uuid) -> DispatchResult<Option<Duration>> {
        let ride = self.get_ride(ride_id).await?;
        if ride.status != RideStatus::DriverArrivedGrace {
            return Ok(None);
        }
        let grace = Duration::minutes(i64::from(self.config.snapshot().grace_period_minutes));
        Ok(Some(grace_left(&ride, grace, self.now()).max(Duration::zero())))
    }

    // ---- 员工与排班 ----

    pub async fn list_drivers(&self) -> DispatchResult<Vec<Employee>> {
        self.employees.list_drivers().await
    }

    pub async fn clock_in(&self, caller: &Caller, employee_id: &str) -> DispatchResult<Employee> {
        self.set_clocked_in(caller, employee_id, true).await
    }

    pub async fn clock_out(&self, caller: &Caller, employee_id: &str) -> DispatchResult<Employee> {
        self.set_clocked_in(caller, employee_id, false).await
    }

    async fn set_clocked_in(
        &self,
        caller: &Caller,
        employee_id: &str,
        active: bool,
    ) -> DispatchResult<Employee> {
        let allowed = match caller {
            Caller::Office => true,
            Caller::Driver { id } => id == employee_id,
            Caller::Rider => false,
        };
        if !allowed {
            return Err(DispatchError::forbidden(format!(
                "{} 不能为员工 {employee_id} 打卡",
                caller.label()
            )));
        }
        self.employees.set_active(employee_id, active).await
    }

    pub async fn list_shifts(&self) -> DispatchResult<Vec<Shift>> {
        self.shifts.list().await
    }

    pub async fn add_shift(&self, caller: &Caller, shift: NewShift) -> DispatchResult<Shift> {
        if !caller.is_office() {
            return Err(DispatchError::forbidden("只有调度可以管理排班"));
        }
        if self.employees.get_by_id(&shift.employee_id).await?.is_none() {
            return Err(DispatchError::employee_not_found(shift.employee_id));
        }
        if shift.day_of_week > 6 {
            return Err(DispatchError::validation_error(format!(
                "无效的星期: {} (应为 0-6)",
                shift.day_of_week
            )));
        }
        let start = parse_shift_time(&shift.start_time, "start_time")?;
        let end = parse_shift_time(&shift.end_time, "end_time")?;
        if start >= end {
            return Err(DispatchError::validation_error(format!(
                "排班开始时间 {} 必须早于结束时间 {}",
                shift.start_time, shift.end_time
            )));
        }

        let created = self
            .shifts
            .create(Shift {
                id: format!("shift-{}", Uuid::new_v4()),
                employee_id: shift.employee_id,
                day_of_week: shift.day_of_week,
                start_time: shift.start_time,
                end_time: shift.end_time,
            })
            .await?;
        info!("添加排班 {} (员工 {})", created.id, created.employee_id);
        Ok(created)
    }

    pub async fn remove_shift(&self, caller: &Caller, shift_id: &str) -> DispatchResult<Shift> {
        if !caller.is_office() {
            return Err(DispatchError::forbidden("只有调度可以管理排班"));
        }
        let removed = self.shifts.delete(shift_id).await?;
        info!("删除排班 {}", removed.id);
        Ok(removed)
    }
}

fn require_office(caller: &Caller, action: RideAction) -> DispatchResult<()> {
    if caller.is_office() {
        Ok(())
    } else {
        Err(DispatchError::forbidden(format!(
            "{} 不能执行 {}",
            caller.label(),
            action
        )))
    }
}

fn ensure_transition(ride: &RideRequest, action: RideAction) -> DispatchResult<()> {
    match ride.status.next(action) {
        Some(_) => Ok(()),
        None => Err(DispatchError::invalid_transition(ride.status, action.as_str())),
    }
}

fn authorize_driver_action(
    caller: &Caller,
    ride: &RideRequest,
    action: RideAction,
    restrict_to_assigned_driver: bool,
) -> DispatchResult<()> {
    let allowed = match caller {
        Caller::Office => true,
        Caller::Driver { id } => !restrict_to_assigned_driver || ride.is_assigned_to(id),
        Caller::Rider => false,
    };
    if allowed {
        debug!("{} 可以对行程 {} 执行 {}", caller.label(), ride.id, action);
        Ok(())
    } else {
        Err(DispatchError::forbidden(format!(
            "{} 不是行程 {} 的指派司机",
            caller.label(),
            ride.id
        )))
    }
}

fn grace_left(ride: &RideRequest, grace: Duration, now: DateTime<Utc>) -> Duration {
    match ride.grace_start_time {
        Some(started) => started + grace - now,
        None => Duration::zero(),
    }
}

fn ceil_seconds(duration: Duration) -> i64 {
    let seconds = duration.num_seconds();
    if duration > Duration::seconds(seconds) {
        seconds + 1
    } else {
        seconds
    }
}

fn parse_shift_time(value: &str, field: &str) -> DispatchResult<u32> {
    ValidationUtils::parse_minute_of_day(value, field)
        .map_err(|e| DispatchError::validation_error(e.to_string()))
}
