use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("行程未找到: {id}")]
    RideNotFound { id: String },
    #[error("员工未找到: {id}")]
    EmployeeNotFound { id: String },
    #[error("排班未找到: {id}")]
    ShiftNotFound { id: String },
    #[error("非法的状态转换: 当前状态 {from} 不允许执行 {action}")]
    InvalidTransition { from: String, action: String },
    #[error("预约时间不在服务时段内")]
    OutOfServiceHours,
    #[error("乘客已被暂停服务: 连续爽约 {misses} 次 (阈值 {threshold})")]
    SuspendedRider { misses: u32, threshold: u32 },
    #[error("司机未打卡上班: {driver_id}")]
    DriverInactive { driver_id: String },
    #[error("行程已被其他司机认领: {ride_id}")]
    AlreadyAssigned { ride_id: String },
    #[error("权限不足: {0}")]
    Forbidden(String),
    #[error("宽限期尚未结束: 剩余 {remaining_seconds} 秒")]
    GracePeriodActive { remaining_seconds: i64 },
    #[error("数据验证失败: {0}")]
    Validation(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("事件发布失败: {0}")]
    EventPublish(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    pub fn ride_not_found<S: Into<String>>(id: S) -> Self {
        Self::RideNotFound { id: id.into() }
    }
    pub fn employee_not_found<S: Into<String>>(id: S) -> Self {
        Self::EmployeeNotFound { id: id.into() }
    }
    pub fn shift_not_found<S: Into<String>>(id: S) -> Self {
        Self::ShiftNotFound { id: id.into() }
    }
    pub fn invalid_transition<F: ToString, A: Into<String>>(from: F, action: A) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::RideNotFound { .. }
                | DispatchError::EmployeeNotFound { .. }
                | DispatchError::ShiftNotFound { .. }
        )
    }
    /// 调用方需要重新查询状态后再决定是否重试
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DispatchError::AlreadyAssigned { .. } | DispatchError::InvalidTransition { .. }
        )
    }
    /// 指标标签
    pub fn reason_label(&self) -> &'static str {
        match self {
            DispatchError::RideNotFound { .. }
            | DispatchError::EmployeeNotFound { .. }
            | DispatchError::ShiftNotFound { .. } => "not_found",
            DispatchError::InvalidTransition { .. } => "invalid_transition",
            DispatchError::OutOfServiceHours => "out_of_service_hours",
            DispatchError::SuspendedRider { .. } => "suspended_rider",
            DispatchError::DriverInactive { .. } => "driver_inactive",
            DispatchError::AlreadyAssigned { .. } => "already_assigned",
            DispatchError::Forbidden(_) => "forbidden",
            DispatchError::GracePeriodActive { .. } => "grace_period_active",
            DispatchError::Validation(_) => "validation",
            DispatchError::Configuration(_) => "configuration",
            DispatchError::EventPublish(_) => "event_publish",
            DispatchError::Serialization(_) => "serialization",
            DispatchError::Internal(_) => "internal",
        }
    }
    pub fn user_message(&self) -> &str {
        match self {
            DispatchError::RideNotFound { .. } => "请求的行程不存在",
            DispatchError::EmployeeNotFound { .. } => "请求的员工不存在",
            DispatchError::ShiftNotFound { .. } => "请求的排班不存在",
            DispatchError::InvalidTransition { .. } => "行程当前状态不允许此操作",
            DispatchError::OutOfServiceHours => "预约时间不在服务时段内 (周一至周五 8:00-19:00)",
            DispatchError::SuspendedRider { .. } => "该乘客因连续爽约已被暂停服务",
            DispatchError::DriverInactive { .. } => "司机需先打卡上班才能认领行程",
            DispatchError::AlreadyAssigned { .. } => "行程已被其他司机认领",
            DispatchError::Forbidden(_) => "您没有执行此操作的权限",
            DispatchError::GracePeriodActive { .. } => "宽限期尚未结束，请稍后再标记爽约",
            DispatchError::Validation(_) => "输入数据验证失败",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Internal(err.to_string())
    }
}
