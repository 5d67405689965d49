use chrono::{DateTime, Utc};
use rideops_errors::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 行程状态
///
/// 合法的状态转换只在 [`RideStatus::next`] 中定义。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Approved,
    Denied,
    Scheduled,
    DriverOnTheWay,
    DriverArrivedGrace,
    Completed,
    NoShow,
}

impl RideStatus {
    pub const ALL: [RideStatus; 8] = [
        RideStatus::Pending,
        RideStatus::Approved,
        RideStatus::Denied,
        RideStatus::Scheduled,
        RideStatus::DriverOnTheWay,
        RideStatus::DriverArrivedGrace,
        RideStatus::Completed,
        RideStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Approved => "approved",
            RideStatus::Denied => "denied",
            RideStatus::Scheduled => "scheduled",
            RideStatus::DriverOnTheWay => "driver_on_the_way",
            RideStatus::DriverArrivedGrace => "driver_arrived_grace",
            RideStatus::Completed => "completed",
            RideStatus::NoShow => "no_show",
        }
    }

    /// 状态转换表：当前状态下执行某个操作后的目标状态
    pub fn next(self, action: RideAction) -> Option<RideStatus> {
        use RideAction::*;
        use RideStatus::*;

        match (self, action) {
            (Pending, Approve) => Some(Approved),
            (Pending, Deny) => Some(Denied),
            (Approved, Claim) => Some(Scheduled),
            (Scheduled, StartTrip) => Some(DriverOnTheWay),
            (DriverOnTheWay, Arrive) => Some(DriverArrivedGrace),
            (DriverArrivedGrace, Complete) => Some(Completed),
            (DriverArrivedGrace, MarkNoShow) => Some(NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RideStatus::Denied | RideStatus::Completed | RideStatus::NoShow
        )
    }

    /// 已经越过 approved 的状态必须带有司机
    pub fn has_driver(&self) -> bool {
        matches!(
            self,
            RideStatus::Scheduled
                | RideStatus::DriverOnTheWay
                | RideStatus::DriverArrivedGrace
                | RideStatus::Completed
                | RideStatus::NoShow
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RideStatus::Scheduled | RideStatus::DriverOnTheWay | RideStatus::DriverArrivedGrace
        )
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RideStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DispatchError::validation_error(format!("未知的行程状态: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RideAction {
    Approve,
    Deny,
    Claim,
    StartTrip,
    Arrive,
    Complete,
    MarkNoShow,
}

impl RideAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideAction::Approve => "approve",
            RideAction::Deny => "deny",
            RideAction::Claim => "claim",
            RideAction::StartTrip => "on_the_way",
            RideAction::Arrive => "arrived",
            RideAction::Complete => "complete",
            RideAction::MarkNoShow => "no_show",
        }
    }

    /// 该操作唯一的合法起始状态，由状态转换表推出
    pub fn source_status(&self) -> Option<RideStatus> {
        RideStatus::ALL
            .into_iter()
            .find(|status| status.next(*self).is_some())
    }

    /// 出发、到达、完成、爽约由司机一侧发起
    pub fn is_driver_action(&self) -> bool {
        matches!(
            self,
            RideAction::StartTrip | RideAction::Arrive | RideAction::Complete | RideAction::MarkNoShow
        )
    }
}

impl std::fmt::Display for RideAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rider {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Rider {
    pub fn new(name: &str, email: &str, phone: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    /// 爽约台账的键
    pub fn key(&self) -> String {
        normalize_rider_key(&self.email)
    }
}

pub fn normalize_rider_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 乘客提交的行程申请
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRideRequest {
    pub rider: Rider,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub requested_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RideRequest {
    pub id: Uuid,
    pub rider: Rider,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub requested_time: String,
    pub status: RideStatus,
    pub assigned_driver_id: Option<String>,
    pub grace_start_time: Option<DateTime<Utc>>,
    /// 提交时的连续爽约次数快照，仅用于展示，审批以台账为准
    pub consecutive_misses: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RideRequest {
    pub fn new(request: NewRideRequest, consecutive_misses: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider: request.rider,
            pickup_location: request.pickup_location,
            dropoff_location: request.dropoff_location,
            requested_time: request.requested_time,
            status: RideStatus::Pending,
            assigned_driver_id: None,
            grace_start_time: None,
            consecutive_misses,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rider_key(&self) -> String {
        self.rider.key()
    }

    pub fn is_assigned_to(&self, driver_id: &str) -> bool {
        self.assigned_driver_id.as_deref() == Some(driver_id)
    }

    /// 按状态转换表推进状态，非法转换返回 `InvalidTransition`
    ///
    /// 认领必须走 [`RideRequest::assign_driver`]，这里拒绝 `Claim`。
    pub fn advance(&mut self, action: RideAction, now: DateTime<Utc>) -> DispatchResult<()> {
        if action == RideAction::Claim {
            return Err(DispatchError::invalid_transition(self.status, action.as_str()));
        }
        let next = self
            .status
            .next(action)
            .ok_or_else(|| DispatchError::invalid_transition(self.status, action.as_str()))?;

        if next == RideStatus::DriverArrivedGrace {
            self.grace_start_time = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// 是否可被认领：已有司机返回 `AlreadyAssigned`，否则按转换表检查
    pub fn ensure_claimable(&self) -> DispatchResult<RideStatus> {
        if self.assigned_driver_id.is_some() {
            return Err(DispatchError::AlreadyAssigned {
                ride_id: self.id.to_string(),
            });
        }
        self.status
            .next(RideAction::Claim)
            .ok_or_else(|| DispatchError::invalid_transition(self.status, RideAction::Claim.as_str()))
    }

    /// 认领：一次性设置司机并进入 scheduled
    pub fn assign_driver(&mut self, driver_id: &str, now: DateTime<Utc>) -> DispatchResult<()> {
        let next = self.ensure_claimable()?;
        self.assigned_driver_id = Some(driver_id.to_string());
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// 有司机的状态必须带司机，其余状态不得带司机
    pub fn check_invariants(&self) -> DispatchResult<()> {
        if self.status.has_driver() != self.assigned_driver_id.is_some() {
            return Err(DispatchError::Internal(format!(
                "行程 {} 状态 {} 与司机指派不一致",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn entity_description(&self) -> String {
        format!(
            "行程 {} (乘客: {}, {} -> {}, 时间: {})",
            self.id,
            self.rider.email,
            self.pickup_location,
            self.dropoff_location,
            self.requested_time
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Driver,
    Office,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub role: EmployeeRole,
    /// 是否已打卡上班
    pub active: bool,
}

impl Employee {
    pub fn driver(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: EmployeeRole::Driver,
            active: false,
        }
    }

    pub fn office(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: EmployeeRole::Office,
            active: true,
        }
    }

    pub fn is_driver(&self) -> bool {
        matches!(self.role, EmployeeRole::Driver)
    }

    pub fn can_claim(&self) -> bool {
        self.is_driver() && self.active
    }
}

/// 每周排班，0 = 周一 ... 6 = 周日
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shift {
    pub id: String,
    pub employee_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub employee_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// 身份层传入的调用方，核心不做认证
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Office,
    Driver { id: String },
    Rider,
}

impl Caller {
    pub fn driver(id: &str) -> Self {
        Caller::Driver { id: id.to_string() }
    }

    pub fn is_office(&self) -> bool {
        matches!(self, Caller::Office)
    }

    pub fn driver_id(&self) -> Option<&str> {
        match self {
            Caller::Driver { id } => Some(id),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Caller::Office => "office".to_string(),
            Caller::Driver { id } => format!("driver:{id}"),
            Caller::Rider => "rider".to_string(),
        }
    }
}
