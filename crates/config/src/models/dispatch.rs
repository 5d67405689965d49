use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// 司机到达后等待乘客的宽限期（分钟）
    pub grace_period_minutes: u32,
    /// 宽限期内是否拒绝标记爽约
    pub enforce_grace_period: bool,
    /// 出发/到达/完成/爽约只允许被指派的司机（或调度办公室）操作
    pub restrict_to_assigned_driver: bool,
    /// 事件广播通道容量
    pub event_channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            grace_period_minutes: 5,
            enforce_grace_period: false,
            restrict_to_assigned_driver: true,
            event_channel_capacity: 256,
        }
    }
}

impl ConfigValidator for DispatchConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_count(
            self.grace_period_minutes,
            "dispatch.grace_period_minutes",
            120,
        )?;
        if self.event_channel_capacity == 0 {
            return Err(crate::ConfigError::Validation(
                "dispatch.event_channel_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
