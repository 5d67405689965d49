//! 运行时可热更新的策略配置
//!
//! 服务时段、暂停阈值与派车开关在每次调用时从 [`PolicyConfigHandle`] 读取快照，
//! 因此两次调用之间替换配置会立即生效。

use std::sync::{Arc, RwLock};

use chrono::Weekday;
use tracing::info;

use crate::models::AppConfig;
use crate::validation::ConfigValidator;
use crate::ConfigResult;

/// 解析后的服务时段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceWindow {
    pub days: Vec<Weekday>,
    pub start_minute: u32,
    pub end_minute: u32,
    pub utc_offset_minutes: i32,
}

impl ServiceWindow {
    pub fn contains(&self, weekday: Weekday, minute_of_day: u32) -> bool {
        self.days.contains(&weekday)
            && minute_of_day >= self.start_minute
            && minute_of_day <= self.end_minute
    }
}

impl Default for ServiceWindow {
    fn default() -> Self {
        Self {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_minute: 8 * 60,
            end_minute: 19 * 60,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub window: ServiceWindow,
    pub suspension_threshold: u32,
    pub grace_period_minutes: u32,
    pub enforce_grace_period: bool,
    pub restrict_to_assigned_driver: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            window: ServiceWindow::default(),
            suspension_threshold: 5,
            grace_period_minutes: 5,
            enforce_grace_period: false,
            restrict_to_assigned_driver: true,
        }
    }
}

impl PolicyConfig {
    pub fn from_app_config(config: &AppConfig) -> ConfigResult<Self> {
        config.validate()?;
        let hours = &config.service_hours;
        Ok(Self {
            window: ServiceWindow {
                days: hours.weekdays()?,
                start_minute: hours.start_minute()?,
                end_minute: hours.end_minute()?,
                utc_offset_minutes: hours.utc_offset_minutes,
            },
            suspension_threshold: config.no_show.suspension_threshold,
            grace_period_minutes: config.dispatch.grace_period_minutes,
            enforce_grace_period: config.dispatch.enforce_grace_period,
            restrict_to_assigned_driver: config.dispatch.restrict_to_assigned_driver,
        })
    }
}

/// 共享的策略配置句柄，克隆后指向同一份配置
#[derive(Debug, Clone, Default)]
pub struct PolicyConfigHandle {
    inner: Arc<RwLock<PolicyConfig>>,
}

impl PolicyConfigHandle {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> ConfigResult<Self> {
        Ok(Self::new(PolicyConfig::from_app_config(config)?))
    }

    pub fn snapshot(&self) -> PolicyConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace(&self, config: PolicyConfig) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
    }

    /// 用新的应用配置刷新策略，校验失败时保留旧配置
    pub fn reload(&self, config: &AppConfig) -> ConfigResult<()> {
        let policy = PolicyConfig::from_app_config(config)?;
        info!(
            "策略配置已更新: 服务时段 {:?} {}-{} 分钟, 暂停阈值 {}",
            policy.window.days,
            policy.window.start_minute,
            policy.window.end_minute,
            policy.suspension_threshold
        );
        self.replace(policy);
        Ok(())
    }
}
